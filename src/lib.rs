pub mod attrs;
pub mod config;
pub mod env;
pub mod error;
pub mod fallback;
pub mod handler;
pub mod hostname;
pub mod record;
pub mod severity;
pub mod sink;
pub mod layer;

mod buffer;

#[cfg(feature = "datadog")]
pub mod datadog;

pub mod init;
pub mod noop_sink;

pub use attrs::{flatten, Attr, AttrValue};
pub use config::HandlerConfig;
pub use handler::{DatadogHandler, HandlerStats, WorkerState};
pub use record::LogEntry;
pub use severity::{Severity, Status};
