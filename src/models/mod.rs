pub mod catalog;
pub mod common;
pub mod referral;
pub mod rental;
pub mod shop;
pub mod user;
pub mod wallet;
pub mod watch;

pub use catalog::*;
pub use common::*;
pub use referral::*;
pub use rental::*;
pub use shop::*;
pub use user::*;
pub use wallet::*;
pub use watch::*;

pub use crate::utils::pagination::{PaginatedResponse, PaginationInfo, PaginationParams};
