//! Positional parsing of raw QEMU monitor output.
//!
//! A transcript of `xp /4000bx 0xb8000` from the human monitor contains more than the dump: the
//! banner, `(qemu)` prompts and the echoed command (whose `0xb8` style operands look like bytes).
//! This parser keeps only the trailing block of `address: bytes` lines and reads the bytes after
//! each line's first colon, so addresses never leak into the cell pairing.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::decode::{decode_bytes, hex_byte_token, scan_hex_bytes};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("no VGA dump lines found")]
    NoDumpRegion,

    #[error("no hex bytes found in dump region")]
    NoHexBytes,
}

fn address_line_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]+:").expect("static regex must compile"))
}

/// Locate the last contiguous run of dump lines.
fn dump_region(text: &str) -> Option<Vec<&str>> {
    let lines: Vec<&str> = text.split('\n').collect();
    let end = lines
        .iter()
        .rposition(|line| hex_byte_token().is_match(line))?;

    let mut start = end;
    while start > 0 {
        let prev = lines[start - 1].trim();
        if !address_line_start().is_match(prev) && !hex_byte_token().is_match(prev) {
            break;
        }
        start -= 1;
    }

    Some(lines[start..=end].to_vec())
}

/// Extract the listed bytes from monitor output.
pub fn monitor_listing_bytes(text: &str) -> Result<Vec<u8>, ListingError> {
    let region = dump_region(text).ok_or(ListingError::NoDumpRegion)?;

    let mut bytes = Vec::new();
    for line in region {
        if let Some((_, data)) = line.split_once(':') {
            scan_hex_bytes(data, &mut bytes);
        }
    }

    if bytes.is_empty() {
        return Err(ListingError::NoHexBytes);
    }
    Ok(bytes)
}

/// Decode monitor output the same way as [`crate::decode_bytes`] once the bytes are extracted.
pub fn decode_monitor_listing(text: &str) -> Result<String, ListingError> {
    Ok(decode_bytes(&monitor_listing_bytes(text)?))
}
