use std::sync::OnceLock;

use regex::Regex;

use crate::CELL_BYTES;

/// One text-mode cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: u8,
    pub attr: u8,
}

impl Cell {
    /// The character shown by this cell, or `None` for a null cell.
    ///
    /// Character bytes map to the code point of the same value; no code page translation is done.
    pub fn character(self) -> Option<char> {
        (self.ch != 0).then(|| char::from(self.ch))
    }
}

/// Pair up `data` into cells. A trailing odd byte does not form a cell and is dropped.
pub fn cells(data: &[u8]) -> impl Iterator<Item = Cell> + '_ {
    data.chunks_exact(CELL_BYTES).map(|pair| Cell {
        ch: pair[0],
        attr: pair[1],
    })
}

/// Decode a raw text buffer snapshot into the characters it contains.
///
/// Attribute bytes are discarded and null cells are skipped, so the result never contains
/// `'\0'` and has at most `data.len() / 2` characters.
pub fn decode_bytes(data: &[u8]) -> String {
    cells(data).filter_map(Cell::character).collect()
}

pub(crate) fn hex_byte_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:0x)?([0-9a-fA-F]{2})\b").expect("static regex must compile")
    })
}

pub(crate) fn scan_hex_bytes(text: &str, out: &mut Vec<u8>) {
    out.extend(
        hex_byte_token()
            .captures_iter(text)
            .filter_map(|caps| u8::from_str_radix(&caps[1], 16).ok()),
    );
}

/// Flatten a hex listing into the bytes it lists.
///
/// Every whole token made of exactly two hex digits (optionally `0x`-prefixed) counts as a byte,
/// in reading order across all lines. Anything else (addresses, colons, prompts) is skipped.
///
/// This is a lossy scan: it does not know which column a token came from, so an address that
/// happens to be two hex digits long (e.g. `10:`) is read as data and shifts the cell pairing of
/// everything after it. [`crate::decode_monitor_listing`] parses the `addr: bytes` layout
/// positionally when that matters.
pub fn hex_listing_bytes(text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    scan_hex_bytes(text, &mut out);
    out
}

/// Decode a hex listing of the text buffer. See [`hex_listing_bytes`] for the token rules.
pub fn decode_hex_listing(text: &str) -> String {
    decode_bytes(&hex_listing_bytes(text))
}
