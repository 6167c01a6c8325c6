//! Shared process-level helpers: log setup and graceful shutdown.

pub mod logging;
pub mod shutdown;

pub use logging::{init_logging, LogFormat, LoggingError};
pub use shutdown::ShutdownController;
