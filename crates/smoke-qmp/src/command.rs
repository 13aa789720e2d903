use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{QmpError, Result};

/// A single QMP request: `{"execute": ..., "arguments": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QmpCommand {
    execute: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<Map<String, Value>>,
}

impl QmpCommand {
    pub fn new(execute: impl Into<String>) -> Self {
        Self {
            execute: execute.into(),
            arguments: None,
        }
    }

    pub fn with_arguments(execute: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            execute: execute.into(),
            arguments: Some(arguments),
        }
    }

    /// Leaves capabilities negotiation mode; QEMU rejects everything else until this is sent.
    pub fn capabilities() -> Self {
        Self::new("qmp_capabilities")
    }

    pub fn quit() -> Self {
        Self::new("quit")
    }

    /// Run a human monitor (HMP) command line through QMP.
    pub fn human_monitor_command(command_line: impl Into<String>) -> Self {
        let mut arguments = Map::new();
        arguments.insert("command-line".to_string(), Value::String(command_line.into()));
        Self::with_arguments("human-monitor-command", arguments)
    }

    pub fn execute(&self) -> &str {
        &self.execute
    }

    pub fn arguments(&self) -> Option<&Map<String, Value>> {
        self.arguments.as_ref()
    }

    /// Compact JSON text for the wire (without the message delimiter).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| QmpError::Encode {
            execute: self.execute.clone(),
            source,
        })
    }
}

/// HMP line saving `length` bytes of guest-physical memory at `address` to `path`.
///
/// `path` is opened by the emulator process, not by us.
pub fn pmemsave_command_line(address: u64, length: u64, path: &Path) -> String {
    format!("pmemsave {address:#x} {length} {}", path.display())
}
