//! Global tile id codec.
//!
//! The top three bits of a packed gid are per-instance transform flags;
//! the remaining 29 bits identify the tile.

use serde::Serialize;

/// Bit 31: horizontal flip.
pub const FLIPPED_HORIZONTALLY: u32 = 1 << 31;
/// Bit 30: vertical flip.
pub const FLIPPED_VERTICALLY: u32 = 1 << 30;
/// Bit 29: diagonal flip (anti-diagonal transpose, used for rotation).
pub const FLIPPED_DIAGONALLY: u32 = 1 << 29;

const FLAG_MASK: u32 = FLIPPED_HORIZONTALLY | FLIPPED_VERTICALLY | FLIPPED_DIAGONALLY;

/// Transform flags stripped from a packed gid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TileFlags {
    pub flipped_horizontally: bool,
    pub flipped_vertically: bool,
    pub flipped_diagonally: bool,
}

impl TileFlags {
    /// Re-encode the flags into their reserved bit positions.
    pub fn to_bits(self) -> u32 {
        let mut bits = 0;
        if self.flipped_horizontally {
            bits |= FLIPPED_HORIZONTALLY;
        }
        if self.flipped_vertically {
            bits |= FLIPPED_VERTICALLY;
        }
        if self.flipped_diagonally {
            bits |= FLIPPED_DIAGONALLY;
        }
        bits
    }

    /// True when no transform is applied.
    pub fn is_empty(self) -> bool {
        self == Self::default()
    }
}

/// A decoded global tile reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Gid {
    /// Tile id with the flag bits cleared. Zero conventionally means "no tile".
    pub id: u32,
    pub flags: TileFlags,
}

impl Gid {
    /// Pack back into the raw on-disk representation.
    pub fn to_raw(self) -> u32 {
        self.id | self.flags.to_bits()
    }
}

/// Split a raw gid into its tile id and transform flags.
///
/// Never fails: zero and ids using all 29 low bits are valid here.
pub fn decode_gid(raw: u32) -> Gid {
    Gid {
        id: raw & !FLAG_MASK,
        flags: TileFlags {
            flipped_horizontally: raw & FLIPPED_HORIZONTALLY != 0,
            flipped_vertically: raw & FLIPPED_VERTICALLY != 0,
            flipped_diagonally: raw & FLIPPED_DIAGONALLY != 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [u32; 10] = [
        0,
        1,
        42,
        0x1FFF_FFFF,
        0x2000_0001,
        0x4000_0002,
        0x8000_0003,
        0xE000_0000,
        0xFFFF_FFFF,
        0xA5A5_A5A5,
    ];

    #[test]
    fn test_decode_plain_id() {
        let gid = decode_gid(17);
        assert_eq!(gid.id, 17);
        assert!(gid.flags.is_empty());
    }

    #[test]
    fn test_decode_each_flag() {
        let h = decode_gid(FLIPPED_HORIZONTALLY | 5);
        assert_eq!(h.id, 5);
        assert!(h.flags.flipped_horizontally);
        assert!(!h.flags.flipped_vertically);
        assert!(!h.flags.flipped_diagonally);

        let v = decode_gid(FLIPPED_VERTICALLY | 5);
        assert_eq!(v.id, 5);
        assert!(v.flags.flipped_vertically);

        let d = decode_gid(FLIPPED_DIAGONALLY | 5);
        assert_eq!(d.id, 5);
        assert!(d.flags.flipped_diagonally);
    }

    #[test]
    fn test_decode_clears_only_top_three_bits() {
        for raw in SAMPLES {
            let gid = decode_gid(raw);
            assert_eq!(gid.id, raw & 0x1FFF_FFFF);
            assert_eq!(gid.flags.flipped_horizontally, raw >> 31 & 1 == 1);
            assert_eq!(gid.flags.flipped_vertically, raw >> 30 & 1 == 1);
            assert_eq!(gid.flags.flipped_diagonally, raw >> 29 & 1 == 1);
        }
    }

    #[test]
    fn test_flag_round_trip_is_stable() {
        for raw in SAMPLES {
            let gid = decode_gid(raw);
            assert_eq!(decode_gid(gid.id | gid.flags.to_bits()), gid);
            assert_eq!(gid.to_raw(), raw);
        }
    }

    #[test]
    fn test_zero_is_accepted() {
        assert_eq!(decode_gid(0), Gid::default());
    }
}
