//! Minimal blocking client for QEMU's machine protocol (QMP).
//!
//! Only what a boot smoketest needs: connect to the `-qmp unix:...` socket, negotiate
//! capabilities, run HMP command lines through `human-monitor-command`, and `quit`. Messages are
//! single JSON values terminated by `\r\n`.

#![forbid(unsafe_code)]

mod client;
mod command;
mod dump;
mod error;

pub use client::{QmpClient, MESSAGE_DELIMITER};
pub use command::{pmemsave_command_line, QmpCommand};
pub use dump::{dump_to_file, snapshot_session, DumpError, DumpRequest};
pub use error::{QmpError, Result};
