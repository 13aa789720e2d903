use crate::decode::cells;
use crate::COLUMNS;

/// Render a text buffer snapshot as screen rows.
///
/// Unlike [`crate::decode_bytes`], cell positions are kept: null cells become spaces and
/// anything outside printable ASCII becomes `?`. Rows are `COLUMNS` cells wide with trailing
/// spaces trimmed.
pub fn render_screen(data: &[u8]) -> String {
    let glyphs: Vec<char> = cells(data)
        .map(|cell| match cell.ch {
            0x00 => ' ',
            0x20..=0x7e => char::from(cell.ch),
            _ => '?',
        })
        .collect();

    glyphs
        .chunks(COLUMNS)
        .map(|row| row.iter().collect::<String>().trim_end_matches(' ').to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
