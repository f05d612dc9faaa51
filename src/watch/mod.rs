//! Per-rental live state: expiry countdown, background code polling and the open-view registry.

pub mod poller;
pub mod registry;
pub mod ticker;
pub mod view;

pub use poller::PollTask;
pub use registry::WatchRegistry;
pub use ticker::{Countdown, CountdownState};
pub use view::{CodeSource, NO_CODE_FOUND, RentalView, ViewEvent};
