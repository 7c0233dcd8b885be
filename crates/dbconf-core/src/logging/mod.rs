//! Logging abstractions for runtime-agnostic logging
//!
//! The provider never picks a logging backend itself; callers hand it a
//! `SharedLogger` and adapt it to whatever sink the host application uses.

mod traits;
mod noop;
mod console;
mod memory;

pub use traits::{Logger, LoggerExt, SharedLogger};
pub use noop::NoOpLogger;
pub use console::{ConsoleLogger, LogLevel};
pub use memory::{LogRecord, MemoryLogger};
