use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::client::{log_messages, QmpClient};
use crate::error::QmpError;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error(transparent)]
    Qmp(#[from] QmpError),

    /// The session completed but the emulator never wrote the file (bad path, rejected command).
    #[error("emulator did not produce dump file {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("remove previous dump file {}", .path.display())]
    StaleOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything needed to snapshot a region of guest memory into a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRequest {
    pub socket_path: PathBuf,
    pub destination: PathBuf,
    pub address: u64,
    pub length: u64,
    /// Per-read/write socket timeout. `None` blocks until the emulator answers or hangs up.
    pub timeout: Option<Duration>,
}

impl DumpRequest {
    pub fn new(
        socket_path: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        address: u64,
        length: u64,
    ) -> Self {
        Self {
            socket_path: socket_path.into(),
            destination: destination.into(),
            address,
            length,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Drive one snapshot session on an already connected client: greeting, capabilities,
/// `pmemsave`, `quit`.
pub fn snapshot_session<S: Read + Write>(
    client: &mut QmpClient<S>,
    address: u64,
    length: u64,
    destination: &Path,
) -> Result<(), QmpError> {
    let greeting = client.receive_message()?;
    log_messages("greeting", &greeting);

    client.capabilities()?;
    client.request_memory_snapshot(address, length, destination)?;
    client.quit()?;
    Ok(())
}

/// Connect to the QMP socket, have the emulator save the requested memory region and check the
/// file showed up.
///
/// A file already at the destination is removed first, so a rejected `pmemsave` cannot pass off
/// an earlier snapshot as this one. The connection is closed before the file check on every path;
/// nothing is retried.
pub fn dump_to_file(request: &DumpRequest) -> Result<(), DumpError> {
    remove_stale_output(&request.destination)?;
    {
        let mut client = QmpClient::connect(&request.socket_path)?;
        client.set_timeout(request.timeout)?;
        snapshot_session(
            &mut client,
            request.address,
            request.length,
            &request.destination,
        )?;
        client.close()?;
    }

    if !request.destination.exists() {
        return Err(DumpError::MissingOutput(request.destination.clone()));
    }

    info!(
        destination = %request.destination.display(),
        address = %format!("{:#x}", request.address),
        length = request.length,
        "memory snapshot written"
    );
    Ok(())
}

fn remove_stale_output(path: &Path) -> Result<(), DumpError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed previous dump file");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DumpError::StaleOutput {
            path: path.to_path_buf(),
            source,
        }),
    }
}
