//! Local persistence: the key/value store, the typed TTL cache on top of it, and the session.

pub mod cache;
pub mod session;
pub mod store;

pub use cache::{CacheLookup, TtlCache, keys};
pub use session::{SessionEvent, SessionStore};
pub use store::LocalStore;
