#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const VGA_COLUMNS: usize = 80;
pub const VGA_PAGE_BYTES: usize = 4000;
const ATTR_LIGHT_GREY: u8 = 0x07;

/// Build an 80x25 text page with `lines` written from the top-left corner.
pub fn text_page(lines: &[&str]) -> Vec<u8> {
    let mut page = vec![0u8; VGA_PAGE_BYTES];
    for (row, line) in lines.iter().enumerate() {
        for (col, ch) in line.bytes().take(VGA_COLUMNS).enumerate() {
            let offset = (row * VGA_COLUMNS + col) * 2;
            page[offset] = ch;
            page[offset + 1] = ATTR_LIGHT_GREY;
        }
    }
    page
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Clone, Default)]
pub struct FakeQmpConfig {
    /// Guest memory served by `pmemsave`, starting at the requested address.
    pub memory: Vec<u8>,
    /// Answer `pmemsave` with an HMP error string and don't write the file.
    pub reject_pmemsave: bool,
    /// Split every reply into several writes so the client sees partial messages.
    pub fragment_replies: bool,
    /// Accept the connection but never send anything.
    pub silent: bool,
}

/// A single-connection QMP server on a Unix socket, standing in for QEMU.
///
/// It enforces capabilities negotiation like QEMU does and records every command it receives.
pub struct FakeQmpServer {
    dir: TempDir,
    socket_path: PathBuf,
    handle: Option<JoinHandle<Result<Vec<Value>>>>,
}

impl FakeQmpServer {
    pub fn spawn(cfg: FakeQmpConfig) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("smoke-qmp-")
            .tempdir()
            .context("create temp dir for fake QMP server")?;
        let socket_path = dir.path().join("qmp.sock");
        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("bind {}", socket_path.display()))?;

        let handle = thread::spawn(move || -> Result<Vec<Value>> {
            let (stream, _) = listener.accept().context("accept QMP client")?;
            serve(stream, &cfg)
        });

        Ok(Self {
            dir,
            socket_path,
            handle: Some(handle),
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// A path inside the server's scratch directory (where tests point `pmemsave`).
    pub fn scratch_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Wait for the session to end and return the commands the client sent.
    pub fn finish(mut self) -> Result<Vec<Value>> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| anyhow!("fake QMP server already joined"))?;
        handle
            .join()
            .map_err(|_| anyhow!("fake QMP server thread panicked"))?
    }
}

fn serve(stream: UnixStream, cfg: &FakeQmpConfig) -> Result<Vec<Value>> {
    let mut writer = stream.try_clone().context("clone QMP stream")?;
    let mut reader = BufReader::new(stream);
    let mut received = Vec::new();

    if cfg.silent {
        // Hold the connection open until the client gives up.
        let mut sink = Vec::new();
        let _ = reader.read_until(b'\0', &mut sink);
        return Ok(received);
    }

    send(
        &mut writer,
        &json!({
            "QMP": {
                "version": {"qemu": {"major": 8, "minor": 2, "micro": 2}, "package": ""},
                "capabilities": ["oob"],
            }
        }),
        cfg.fragment_replies,
    )?;

    let mut negotiated = false;
    loop {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line).context("read QMP command")?;
        if n == 0 {
            return Ok(received);
        }

        let cmd: Value = serde_json::from_slice(&line)
            .with_context(|| format!("parse QMP command {:?}", String::from_utf8_lossy(&line)))?;
        received.push(cmd.clone());
        let execute = cmd.get("execute").and_then(Value::as_str).unwrap_or_default();

        let reply = match execute {
            "qmp_capabilities" => {
                negotiated = true;
                json!({"return": {}})
            }
            _ if !negotiated => json!({
                "error": {
                    "class": "CommandNotFound",
                    "desc": "Expecting capabilities negotiation with 'qmp_capabilities'",
                }
            }),
            "human-monitor-command" => {
                let line = cmd
                    .pointer("/arguments/command-line")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let output = run_hmp(line, cfg)?;
                json!({ "return": output })
            }
            "quit" => {
                send(&mut writer, &json!({"return": {}}), cfg.fragment_replies)?;
                // The client may already have hung up after reading the ack.
                let _ = send(
                    &mut writer,
                    &json!({"event": "SHUTDOWN", "data": {"guest": false, "reason": "host-qmp-quit"}}),
                    false,
                );
                return Ok(received);
            }
            other => json!({
                "error": {"class": "CommandNotFound", "desc": format!("The command {other} has not been found")}
            }),
        };
        send(&mut writer, &reply, cfg.fragment_replies)?;
    }
}

fn run_hmp(line: &str, cfg: &FakeQmpConfig) -> Result<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let ["pmemsave", addr, len, path] = parts.as_slice() else {
        return Ok(format!("unknown command: '{line}'\r\n"));
    };
    let _addr = u64::from_str_radix(addr.trim_start_matches("0x"), 16)
        .with_context(|| format!("pmemsave address {addr}"))?;
    let len: usize = len.parse().with_context(|| format!("pmemsave length {len}"))?;

    if cfg.reject_pmemsave {
        return Ok(format!("Could not open '{path}': Permission denied\r\n"));
    }

    let mut region = cfg.memory.clone();
    region.resize(len, 0);
    std::fs::write(path, &region).with_context(|| format!("write pmemsave output {path}"))?;
    Ok(String::new())
}

fn send(writer: &mut UnixStream, msg: &Value, fragment: bool) -> Result<()> {
    let mut payload = serde_json::to_vec(msg)?;
    payload.extend_from_slice(b"\r\n");

    if !fragment {
        writer.write_all(&payload)?;
        return Ok(writer.flush()?);
    }

    // Break inside the JSON and between `\r` and `\n` so both partial-message paths are hit.
    let first = payload.len() / 2;
    let second = payload.len() - 1;
    for piece in [&payload[..first], &payload[first..second], &payload[second..]] {
        writer.write_all(piece)?;
        writer.flush()?;
        thread::sleep(Duration::from_millis(5));
    }
    Ok(())
}
