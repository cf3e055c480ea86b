//! Colour keys.
//!
//! The editor writes colours as `RRGGBB` (optionally `#`-prefixed), and
//! colours with alpha as `#AARRGGBB`. Colours stay strings in the document
//! graph; this type is for consumers such as image loaders that need the
//! components.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hex colour '{0}'")]
pub struct ParseColourError(pub String);

impl Colour {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xff)
    }

    /// Parse `RGB`, `RRGGBB` or alpha-first `AARRGGBB`, with or without `#`.
    pub fn from_hex(text: &str) -> Result<Self, ParseColourError> {
        let trimmed = text.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let invalid = || ParseColourError(trimmed.to_string());

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let packed = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
        let channel = |shift: u32| ((packed >> shift) & 0xff) as u8;

        match digits.len() {
            3 => {
                let nibble = |shift: u32| ((packed >> shift) & 0xf) as u8 * 0x11;
                Ok(Self::opaque(nibble(8), nibble(4), nibble(0)))
            }
            6 => Ok(Self::opaque(channel(16), channel(8), channel(0))),
            8 => Ok(Self::new(channel(16), channel(8), channel(0), channel(24))),
            _ => Err(invalid()),
        }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Whether the RGB components match, ignoring alpha.
    pub fn matches_rgb(self, rgba: [u8; 4]) -> bool {
        self.to_rgba()[..3] == rgba[..3]
    }
}

impl FromStr for Colour {
    type Err = ParseColourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Writes the editor's form: `#rrggbb`, or `#aarrggbb` when translucent.
impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Colour { r, g, b, a } = *self;
        match a {
            0xff => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            _ => write!(f, "#{a:02x}{r:02x}{g:02x}{b:02x}"),
        }
    }
}
