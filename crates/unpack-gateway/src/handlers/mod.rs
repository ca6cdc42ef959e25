//! HTTP request handlers for the unpack gateway.

pub mod health;
pub mod metrics;
pub mod root;
pub mod sync;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use root::root;
pub use sync::{sync_image, SyncState};
