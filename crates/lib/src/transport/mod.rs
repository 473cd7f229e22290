//! Stdio transport: line-delimited JSON request/response frames in front of a `Shell`.

pub mod protocol;
mod stdio;

pub use protocol::{handle_line, RunParams, WireRequest, WireResponse, METHOD_DESCRIBE, METHOD_RUN};
pub use stdio::{serve, serve_stdio};
