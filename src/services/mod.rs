pub mod app_state;
pub mod auth_service;
pub mod catalog_service;
pub mod deposit_service;
pub mod referral_service;
pub mod rental_service;
pub mod shop_service;
pub mod user_service;

pub use app_state::*;
pub use auth_service::*;
pub use catalog_service::*;
pub use deposit_service::*;
pub use referral_service::*;
pub use rental_service::*;
pub use shop_service::*;
pub use user_service::*;
