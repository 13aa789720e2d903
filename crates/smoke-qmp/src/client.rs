use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::command::{pmemsave_command_line, QmpCommand};
use crate::error::{QmpError, Result};

/// Terminator QEMU puts after every QMP message.
pub const MESSAGE_DELIMITER: &[u8] = b"\r\n";

const READ_CHUNK: usize = 4096;

/// Blocking QMP client.
///
/// Every request waits for its reply before returning; there is no request pipelining and no
/// matching of replies to ids. That is enough for the strictly sequential
/// greeting → `qmp_capabilities` → command → `quit` exchange used by the smoketest.
pub struct QmpClient<S = UnixStream> {
    stream: S,
}

impl QmpClient<UnixStream> {
    /// Connect to a QMP server listening on a Unix socket (`-qmp unix:<path>,server,nowait`).
    ///
    /// The greeting is left unread; call [`QmpClient::receive_message`] to consume it.
    pub fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).map_err(|source| QmpError::Connect {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "connected to QMP socket");
        Ok(Self::from_stream(stream))
    }

    /// Bound every subsequent socket read and write. `None` blocks indefinitely.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout).map_err(QmpError::Io)?;
        self.stream.set_write_timeout(timeout).map_err(QmpError::Io)?;
        Ok(())
    }

    /// Shut the socket down in both directions. Dropping the client also closes it.
    pub fn close(self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // QEMU closes its end after `quit`.
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(QmpError::Io(err)),
        }
    }
}

impl<S: Read + Write> QmpClient<S> {
    pub fn from_stream(stream: S) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Read until the buffer ends with [`MESSAGE_DELIMITER`] or the peer closes.
    ///
    /// A read may return part of a message or several messages; only a delimiter at the very end
    /// of what has been received so far finishes the message. On EOF whatever has accumulated
    /// (possibly nothing) is returned as-is.
    pub fn receive_message(&mut self) -> Result<Vec<u8>> {
        let mut message = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        while !message.ends_with(MESSAGE_DELIMITER) {
            let n = match self.stream.read(&mut chunk) {
                Ok(0) => {
                    debug!(buffered = message.len(), "QMP peer closed the connection");
                    break;
                }
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(QmpError::from_io(err)),
            };
            message.extend_from_slice(&chunk[..n]);
        }

        Ok(message)
    }

    /// Send one command and return the raw reply bytes.
    pub fn send_command(&mut self, command: &QmpCommand) -> Result<Vec<u8>> {
        let mut payload = command.to_json()?.into_bytes();
        payload.extend_from_slice(MESSAGE_DELIMITER);

        self.stream.write_all(&payload).map_err(QmpError::from_io)?;
        self.stream.flush().map_err(QmpError::from_io)?;
        debug!(execute = command.execute(), "sent QMP command");

        let reply = self.receive_message()?;
        log_messages(command.execute(), &reply);
        Ok(reply)
    }

    pub fn capabilities(&mut self) -> Result<Vec<u8>> {
        self.send_command(&QmpCommand::capabilities())
    }

    pub fn quit(&mut self) -> Result<Vec<u8>> {
        self.send_command(&QmpCommand::quit())
    }

    /// Ask the emulator to write `length` bytes of guest-physical memory at `address` to
    /// `destination`.
    ///
    /// The file is written by the emulator, so `destination` must be a path it can reach.
    pub fn request_memory_snapshot(
        &mut self,
        address: u64,
        length: u64,
        destination: &Path,
    ) -> Result<Vec<u8>> {
        let line = pmemsave_command_line(address, length, destination);
        self.send_command(&QmpCommand::human_monitor_command(line))
    }
}

/// Trace what came back for `context`. Replies are only inspected for logging; callers decide
/// success by other means.
pub(crate) fn log_messages(context: &str, raw: &[u8]) {
    for message in serde_json::Deserializer::from_slice(raw).into_iter::<Value>() {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                debug!(context, %err, raw = %String::from_utf8_lossy(raw), "unparseable QMP message");
                return;
            }
        };

        if let Some(greeting) = message.get("QMP") {
            let version = greeting.pointer("/version/qemu");
            debug!(context, version = ?version, "QMP greeting");
        } else if let Some(err) = message.get("error") {
            let class = err.get("class").and_then(Value::as_str).unwrap_or("unknown");
            let desc = err.get("desc").and_then(Value::as_str).unwrap_or("");
            warn!(context, class, desc, "QMP command failed");
        } else if let Some(event) = message.get("event").and_then(Value::as_str) {
            debug!(context, event, "QMP event");
        } else if let Some(output) = message
            .get("return")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|output| !output.is_empty())
        {
            // HMP commands report failures as text in an otherwise successful reply.
            warn!(context, output, "monitor command printed output");
        } else {
            debug!(context, "QMP command acknowledged");
        }
    }
}
