//! Tile-layer payload decoding.
//!
//! Layer data travels as text. Depending on the declared encoding and
//! compression the pipeline is:
//!
//! 1. text decode (`base64`, or `csv` which yields ids directly)
//! 2. decompress (`zlib`, `gzip`)
//! 3. unpack little-endian `u32`s
//! 4. strip transform flags from each gid
//! 5. reshape into `height` rows of `width` cells
//!
//! Text with no declared encoding is read as comma-separated integers, the
//! same way `csv` is. Compression is only meaningful for byte payloads, so
//! combining it with `csv` (or with no encoding at all) is rejected.

use std::io::Read;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::{GzDecoder, ZlibDecoder};

use crate::error::{GraphError, Result};
use crate::gid::{decode_gid, Gid, TileFlags};

/// Text encoding of a data payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Base64,
    Csv,
}

impl FromStr for Encoding {
    type Err = GraphError;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(Encoding::Base64),
            "csv" => Ok(Encoding::Csv),
            other => Err(GraphError::UnsupportedFeature {
                feature: format!("encoding '{}'", other),
                help: Some("Supported encodings are base64 and csv".to_string()),
            }),
        }
    }
}

/// Compression applied to a decoded byte payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Zlib,
    Gzip,
}

impl FromStr for Compression {
    type Err = GraphError;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "zlib" => Ok(Compression::Zlib),
            "gzip" => Ok(Compression::Gzip),
            other => Err(GraphError::UnsupportedFeature {
                feature: format!("compression '{}'", other),
                help: Some("Supported compressions are zlib and gzip".to_string()),
            }),
        }
    }
}

/// A decoded tile grid, row-major.
///
/// Cells hold tile ids with transform flags cleared; the flags are kept
/// in a parallel buffer for consumers that need them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileGrid {
    width: usize,
    height: usize,
    cells: Vec<u32>,
    flags: Vec<TileFlags>,
}

impl TileGrid {
    /// Build a grid from decoded gids. The count must be `width * height`.
    pub fn from_gids(gids: Vec<Gid>, width: usize, height: usize) -> Result<Self> {
        check_count(gids.len(), width, height)?;
        let (cells, flags) = gids.into_iter().map(|g| (g.id, g.flags)).unzip();
        Ok(Self {
            width,
            height,
            cells,
            flags,
        })
    }

    /// Build a grid from plain ids with no transform flags.
    pub fn from_ids(ids: Vec<u32>, width: usize, height: usize) -> Result<Self> {
        check_count(ids.len(), width, height)?;
        let flags = vec![TileFlags::default(); ids.len()];
        Ok(Self {
            width,
            height,
            cells: ids,
            flags,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Tile id at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Transform flags at `(x, y)`.
    pub fn flags(&self, x: usize, y: usize) -> Option<TileFlags> {
        self.index(x, y).map(|i| self.flags[i])
    }

    /// Id and flags at `(x, y)`.
    pub fn gid(&self, x: usize, y: usize) -> Option<Gid> {
        self.index(x, y).map(|i| Gid {
            id: self.cells[i],
            flags: self.flags[i],
        })
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        (0..self.height).map(move |y| &self.cells[y * self.width..(y + 1) * self.width])
    }

    /// Owned copy of the rows.
    pub fn to_rows(&self) -> Vec<Vec<u32>> {
        self.rows().map(|r| r.to_vec()).collect()
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Project as a JSON array of rows.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.rows().map(|r| serde_json::json!(r)).collect())
    }
}

fn check_count(count: usize, width: usize, height: usize) -> Result<()> {
    let expected = width.checked_mul(height).ok_or_else(|| {
        GraphError::payload(format!("layer size {}x{} overflows", width, height))
    })?;
    if count != expected {
        return Err(GraphError::MalformedPayload {
            message: format!(
                "expected {} tiles for a {}x{} layer, found {}",
                expected, width, height, count
            ),
            offset: Some(count.min(expected)),
        });
    }
    Ok(())
}

/// Split a flat id list into `height` rows of `width`.
pub fn rowify(ids: &[u32], width: usize, height: usize) -> Result<Vec<Vec<u32>>> {
    check_count(ids.len(), width, height)?;
    Ok((0..height)
        .map(|y| ids[y * width..(y + 1) * width].to_vec())
        .collect())
}

/// Run the full pipeline over a layer's text payload.
pub fn decode_layer(
    text: &str,
    encoding: Option<&str>,
    compression: Option<&str>,
    width: usize,
    height: usize,
) -> Result<TileGrid> {
    let gids = decode_gids(text, encoding, compression)?;
    TileGrid::from_gids(gids, width, height)
}

/// Steps 1-4: decode text into flat gids without reshaping.
pub fn decode_gids(
    text: &str,
    encoding: Option<&str>,
    compression: Option<&str>,
) -> Result<Vec<Gid>> {
    let encoding = encoding.map(str::parse::<Encoding>).transpose()?;
    let compression = compression.map(str::parse::<Compression>).transpose()?;

    let raw = match (encoding, compression) {
        (Some(Encoding::Base64), compression) => {
            let mut bytes = decode_base64(text)?;
            if let Some(compression) = compression {
                bytes = decompress(&bytes, compression)?;
            }
            unpack_u32_le(&bytes)?
        }
        (Some(Encoding::Csv) | None, None) => decode_csv(text)?,
        (encoding, Some(compression)) => {
            return Err(GraphError::UnsupportedFeature {
                feature: format!(
                    "{:?} compression of {} tile data",
                    compression,
                    encoding.map_or("unencoded", |_| "csv")
                ),
                help: Some("Compressed tile data must be base64 encoded".to_string()),
            });
        }
    };

    Ok(raw.into_iter().map(decode_gid).collect())
}

/// Trim surrounding whitespace and decode standard base64.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| GraphError::payload(format!("invalid base64: {}", e)))
}

/// Inflate a zlib or gzip stream.
pub fn decompress(bytes: &[u8], compression: Compression) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let result = match compression {
        Compression::Zlib => ZlibDecoder::new(bytes).read_to_end(&mut out),
        Compression::Gzip => GzDecoder::new(bytes).read_to_end(&mut out),
    };
    result.map_err(|e| {
        GraphError::payload(format!("{:?} decompression failed: {}", compression, e))
    })?;
    Ok(out)
}

/// Read consecutive little-endian `u32`s. The length must be a multiple of 4.
pub fn unpack_u32_le(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(GraphError::MalformedPayload {
            message: format!(
                "{} bytes is not a whole number of 32-bit tile ids",
                bytes.len()
            ),
            offset: Some(bytes.len() - bytes.len() % 4),
        });
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Parse comma-separated unsigned integers.
///
/// Whitespace (including newlines) around each number is ignored, but a
/// token with whitespace inside it, or an empty token, is malformed.
pub fn decode_csv(text: &str) -> Result<Vec<u32>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    text.split(',')
        .enumerate()
        .map(|(i, token)| {
            let token = token.trim();
            if token.is_empty() || token.contains(char::is_whitespace) {
                return Err(GraphError::MalformedPayload {
                    message: format!("invalid tile id '{}' in delimited data", token),
                    offset: Some(i),
                });
            }
            token.parse::<u32>().map_err(|e| GraphError::MalformedPayload {
                message: format!("invalid tile id '{}': {}", token, e),
                offset: Some(i),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gid::FLIPPED_HORIZONTALLY;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use std::io::Write;

    fn le_bytes(ids: &[u32]) -> Vec<u8> {
        ids.iter().flat_map(|id| id.to_le_bytes()).collect()
    }

    fn zlib(bytes: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_base64_uncompressed() {
        let text = format!("\n   {}\n  ", STANDARD.encode(le_bytes(&[1, 2, 3, 4])));
        let grid = decode_layer(&text, Some("base64"), None, 2, 2).unwrap();
        assert_eq!(grid.to_rows(), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_base64_zlib() {
        let ids = [5, 0, FLIPPED_HORIZONTALLY | 7, 1, 1, 1];
        let text = STANDARD.encode(zlib(&le_bytes(&ids)));
        let grid = decode_layer(&text, Some("base64"), Some("zlib"), 3, 2).unwrap();

        assert_eq!(grid.to_rows(), vec![vec![5, 0, 7], vec![1, 1, 1]]);
        assert!(grid.flags(2, 0).unwrap().flipped_horizontally);
        assert!(grid.flags(0, 0).unwrap().is_empty());
        assert_eq!(grid.gid(2, 0).unwrap().to_raw(), FLIPPED_HORIZONTALLY | 7);
    }

    #[test]
    fn test_base64_gzip() {
        let text = STANDARD.encode(gzip(&le_bytes(&[9, 8])));
        let grid = decode_layer(&text, Some("base64"), Some("gzip"), 2, 1).unwrap();
        assert_eq!(grid.to_rows(), vec![vec![9, 8]]);
    }

    #[test]
    fn test_compressed_partial_id_is_rejected() {
        let mut bytes = le_bytes(&[1, 2, 3]);
        bytes.pop();
        let text = STANDARD.encode(zlib(&bytes));
        let err = decode_layer(&text, Some("base64"), Some("zlib"), 3, 1).unwrap_err();
        assert!(matches!(err, GraphError::MalformedPayload { offset: Some(8), .. }));
    }

    #[test]
    fn test_count_mismatch() {
        let text = STANDARD.encode(le_bytes(&[1, 2, 3]));
        let err = decode_layer(&text, Some("base64"), None, 2, 2).unwrap_err();
        assert!(matches!(err, GraphError::MalformedPayload { .. }));
    }

    #[test]
    fn test_csv() {
        let grid = decode_layer("1,2,\n3,2147483652\n", Some("csv"), None, 2, 2).unwrap();
        assert_eq!(grid.to_rows(), vec![vec![1, 2], vec![3, 4]]);
        assert!(grid.flags(1, 1).unwrap().flipped_horizontally);
    }

    #[test]
    fn test_csv_with_compression_is_unsupported() {
        let err = decode_gids("1,2", Some("csv"), Some("zlib")).unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedFeature { .. }));
    }

    #[test]
    fn test_unencoded_text_reads_as_delimited_integers() {
        let grid = decode_layer(" 4 ,\n 5 ", None, None, 2, 1).unwrap();
        assert_eq!(grid.to_rows(), vec![vec![4, 5]]);
    }

    #[test]
    fn test_whitespace_inside_number_is_malformed() {
        let err = decode_gids("1 2,3", None, None).unwrap_err();
        assert!(matches!(err, GraphError::MalformedPayload { offset: Some(0), .. }));
    }

    #[test]
    fn test_empty_token_is_malformed() {
        assert!(matches!(
            decode_csv("1,,2"),
            Err(GraphError::MalformedPayload { offset: Some(1), .. })
        ));
    }

    #[test]
    fn test_unknown_encoding_and_compression() {
        assert!(matches!(
            decode_gids("", Some("hex"), None),
            Err(GraphError::UnsupportedFeature { .. })
        ));
        assert!(matches!(
            decode_gids("", Some("base64"), Some("zstd")),
            Err(GraphError::UnsupportedFeature { .. })
        ));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            decode_base64("***"),
            Err(GraphError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_rowify_then_flatten_round_trips() {
        for (w, h) in [(0, 0), (1, 1), (3, 2), (2, 3), (5, 1), (1, 5), (0, 4)] {
            let ids: Vec<u32> = (0..(w * h) as u32).collect();
            let rows = rowify(&ids, w, h).unwrap();
            assert_eq!(rows.len(), h);
            let flat: Vec<u32> = rows.into_iter().flatten().collect();
            assert_eq!(flat, ids);

            let grid = TileGrid::from_ids(ids.clone(), w, h).unwrap();
            let flat: Vec<u32> = grid.rows().flatten().copied().collect();
            assert_eq!(flat, ids);
        }
    }

    #[test]
    fn test_grid_bounds() {
        let grid = TileGrid::from_ids(vec![1, 2], 2, 1).unwrap();
        assert_eq!(grid.get(1, 0), Some(2));
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.get(0, 1), None);
    }
}
