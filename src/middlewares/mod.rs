pub mod auth;
pub mod cors;

pub use auth::SessionGuard;
pub use cors::create_cors;
