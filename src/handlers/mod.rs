pub mod auth;
pub mod catalog;
pub mod deposit;
pub mod referral;
pub mod rental;
pub mod shop;
pub mod user;

pub use auth::auth_config;
pub use catalog::catalog_config;
pub use deposit::deposit_config;
pub use referral::referral_config;
pub use rental::rental_config;
pub use shop::shop_config;
pub use user::user_config;
