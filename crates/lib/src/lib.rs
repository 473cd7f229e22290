//! Skillshell core library: command router, dashboard, catalog engine, and stdio
//! transport used by the CLI.

pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod init;
pub mod persist;
pub mod router;
pub mod transport;

pub use error::{ErrorKind, ShellError};
