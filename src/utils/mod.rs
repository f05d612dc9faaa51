pub mod expiration;
pub mod otp;
pub mod pagination;
pub mod time;
pub mod validation;

pub use expiration::*;
pub use otp::extract_code;
pub use pagination::*;
pub use time::*;
pub use validation::*;
