use std::borrow::Cow;

use crate::decode::{decode_bytes, hex_listing_bytes};
use crate::listing::{monitor_listing_bytes, ListingError};

/// How a dump file represents the text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpFormat {
    /// Exact memory contents, e.g. from QMP/HMP `pmemsave`.
    #[default]
    Raw,
    /// Free-form hex listing, scanned token by token.
    Hex,
    /// Human monitor transcript of `xp /Nbx`, parsed positionally.
    Monitor,
}

/// Flatten dump file contents into text buffer bytes.
///
/// Text formats are read as lossy UTF-8; stray invalid sequences can't form byte tokens anyway.
pub fn dump_bytes(contents: &[u8], format: DumpFormat) -> Result<Cow<'_, [u8]>, ListingError> {
    match format {
        DumpFormat::Raw => Ok(Cow::Borrowed(contents)),
        DumpFormat::Hex => Ok(Cow::Owned(hex_listing_bytes(&String::from_utf8_lossy(
            contents,
        )))),
        DumpFormat::Monitor => Ok(Cow::Owned(monitor_listing_bytes(
            &String::from_utf8_lossy(contents),
        )?)),
    }
}

pub fn decode_dump(contents: &[u8], format: DumpFormat) -> Result<String, ListingError> {
    Ok(decode_bytes(&dump_bytes(contents, format)?))
}
