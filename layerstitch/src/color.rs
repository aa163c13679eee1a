//! Background color parsing.

use std::fmt;
use std::str::FromStr;

use image::Rgb;
use thiserror::Error;

/// Error parsing a color string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}': expected #rrggbb, #rgb, or a color name")]
pub struct ColorError(pub String);

/// Canvas background color.
///
/// Parses `#rrggbb`, `rrggbb`, `#rgb`, and a handful of names. Displays as
/// lowercase `#rrggbb`.
///
/// ```
/// use layerstitch::color::BackgroundColor;
///
/// let color: BackgroundColor = "#FF8000".parse().unwrap();
/// assert_eq!(color.to_string(), "#ff8000");
/// assert_eq!("black".parse::<BackgroundColor>().unwrap(), BackgroundColor::BLACK);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackgroundColor(pub [u8; 3]);

impl BackgroundColor {
    pub const BLACK: BackgroundColor = BackgroundColor([0, 0, 0]);
    pub const WHITE: BackgroundColor = BackgroundColor([255, 255, 255]);

    /// Pixel value for an RGB8 canvas.
    pub fn to_rgb(self) -> Rgb<u8> {
        Rgb(self.0)
    }
}

impl Default for BackgroundColor {
    fn default() -> Self {
        Self::BLACK
    }
}

impl FromStr for BackgroundColor {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let named = match trimmed.to_ascii_lowercase().as_str() {
            "black" => Some([0, 0, 0]),
            "white" => Some([255, 255, 255]),
            "gray" | "grey" => Some([128, 128, 128]),
            "red" => Some([255, 0, 0]),
            "green" => Some([0, 128, 0]),
            "blue" => Some([0, 0, 255]),
            _ => None,
        };
        if let Some(rgb) = named {
            return Ok(BackgroundColor(rgb));
        }

        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorError(s.to_string()));
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).ok();
        let rgb = match hex.len() {
            6 => [channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])],
            3 => {
                // #abc expands to #aabbcc
                let mut out = [None; 3];
                for (slot, c) in out.iter_mut().zip(hex.chars()) {
                    *slot = channel(&format!("{c}{c}"));
                }
                out
            }
            _ => return Err(ColorError(s.to_string())),
        };

        match rgb {
            [Some(r), Some(g), Some(b)] => Ok(BackgroundColor([r, g, b])),
            _ => Err(ColorError(s.to_string())),
        }
    }
}

impl fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_with_hash() {
        let color: BackgroundColor = "#000000".parse().unwrap();
        assert_eq!(color, BackgroundColor::BLACK);

        let color: BackgroundColor = "#1a2B3c".parse().unwrap();
        assert_eq!(color.0, [0x1a, 0x2b, 0x3c]);
    }

    #[test]
    fn test_parse_hex_without_hash() {
        let color: BackgroundColor = "ffffff".parse().unwrap();
        assert_eq!(color, BackgroundColor::WHITE);
    }

    #[test]
    fn test_parse_short_hex() {
        let color: BackgroundColor = "#f80".parse().unwrap();
        assert_eq!(color.0, [0xff, 0x88, 0x00]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "White".parse::<BackgroundColor>().unwrap(),
            BackgroundColor::WHITE
        );
        assert_eq!("grey".parse::<BackgroundColor>().unwrap().0, [128, 128, 128]);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("#12345".parse::<BackgroundColor>().is_err());
        assert!("#gg0000".parse::<BackgroundColor>().is_err());
        assert!("purple-ish".parse::<BackgroundColor>().is_err());
        assert!("".parse::<BackgroundColor>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let color = BackgroundColor([1, 2, 255]);
        assert_eq!(color.to_string(), "#0102ff");
        assert_eq!(color.to_string().parse::<BackgroundColor>().unwrap(), color);
    }

    #[test]
    fn test_error_message() {
        let err = "nope".parse::<BackgroundColor>().unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
