//! VGA text-mode buffer decoding for boot smoketests.
//!
//! The legacy text buffer at physical address `0xb8000` is an array of 2-byte cells: a character
//! byte followed by an attribute byte. QEMU can hand that memory back either as raw bytes
//! (`pmemsave`) or as a hex listing (`xp /Nbx`); this crate turns both into the text a guest
//! printed so CI can assert on boot messages without a display.

#![forbid(unsafe_code)]

pub mod check;
pub mod decode;
pub mod format;
pub mod listing;
pub mod screen;

pub use check::{check, first_line, CheckOutcome};
pub use decode::{cells, decode_bytes, decode_hex_listing, hex_listing_bytes, Cell};
pub use format::{decode_dump, dump_bytes, DumpFormat};
pub use listing::{decode_monitor_listing, monitor_listing_bytes, ListingError};
pub use screen::render_screen;

/// Guest-physical base address of the colour text-mode buffer.
pub const TEXT_BUFFER_BASE: u64 = 0xb8000;

pub const COLUMNS: usize = 80;
pub const ROWS: usize = 25;

/// Bytes per cell (character + attribute).
pub const CELL_BYTES: usize = 2;

/// Size of one 80x25 page, i.e. the region the smoketest snapshots (4000 bytes).
pub const TEXT_BUFFER_LEN: usize = COLUMNS * ROWS * CELL_BYTES;
