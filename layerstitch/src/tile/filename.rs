//! Tile filename parsing.
//!
//! Tiles are named `<tag>_<x>_<y>_<suffix>.<ext>`, for example:
//! - `S_0_0_lco.png` (satellite layer, column 0, row 0)
//! - `M_12_31_lco.paa` (mask layer, column 12, row 31)
//!
//! The tag selects a layer among several sharing one directory, `x` and `y`
//! are unsigned base-10 cell indices, and the suffix is carried but not
//! interpreted.

use std::path::Path;

use super::GridCoord;

/// Parsed tile filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFilename {
    /// Layer tag (first token, e.g. "S")
    pub tag: String,
    /// Grid cell encoded in the name
    pub coord: GridCoord,
    /// Trailing token before the extension (e.g. "lco")
    pub suffix: String,
}

/// Error parsing a tile filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileNameError {
    /// Name does not split into exactly four underscore-separated tokens
    TokenCount(usize),
    /// Column token is not an unsigned integer
    InvalidX(String),
    /// Row token is not an unsigned integer
    InvalidY(String),
}

impl std::fmt::Display for TileNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileNameError::TokenCount(n) => write!(
                f,
                "expected <tag>_<x>_<y>_<suffix>, found {} underscore-separated tokens",
                n
            ),
            TileNameError::InvalidX(s) => write!(f, "invalid x coordinate: '{}'", s),
            TileNameError::InvalidY(s) => write!(f, "invalid y coordinate: '{}'", s),
        }
    }
}

impl std::error::Error for TileNameError {}

/// Parse a tile filename into its tag, coordinate and suffix.
///
/// Any leading directory components are ignored, and everything after the
/// last `.` is treated as the extension.
///
/// # Examples
///
/// ```
/// use layerstitch::tile::parse_tile_filename;
///
/// let name = parse_tile_filename("S_3_14_lco.png").unwrap();
/// assert_eq!(name.tag, "S");
/// assert_eq!((name.coord.x, name.coord.y), (3, 14));
/// assert_eq!(name.suffix, "lco");
///
/// assert!(parse_tile_filename("S_3_lco.png").is_err());
/// ```
pub fn parse_tile_filename(filename: &str) -> Result<TileFilename, TileNameError> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    let stem = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);

    let tokens: Vec<&str> = stem.split('_').collect();
    if tokens.len() != 4 {
        return Err(TileNameError::TokenCount(tokens.len()));
    }

    let x = parse_index(tokens[1]).ok_or_else(|| TileNameError::InvalidX(tokens[1].to_string()))?;
    let y = parse_index(tokens[2]).ok_or_else(|| TileNameError::InvalidY(tokens[2].to_string()))?;

    Ok(TileFilename {
        tag: tokens[0].to_string(),
        coord: GridCoord::new(x, y),
        suffix: tokens[3].to_string(),
    })
}

/// Build a tile filename from its parts.
///
/// This is the inverse of [`parse_tile_filename`].
pub fn format_tile_filename(tag: &str, coord: GridCoord, suffix: &str, extension: &str) -> String {
    format!("{}_{}_{}_{}.{}", tag, coord.x, coord.y, suffix, extension)
}

/// Digits only: `u32::from_str` would also accept a leading `+`.
fn parse_index(token: &str) -> Option<u32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}
