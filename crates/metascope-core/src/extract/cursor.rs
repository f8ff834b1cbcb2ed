//! Bounds-checked reading over untrusted byte slices.
//!
//! Every read returns [`ParseError::Truncated`] instead of panicking when the
//! data runs out, so handlers can walk hostile input with `?`.

use crate::error::{ParseError, ParseResult};

/// Byte order of multi-byte integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// A forward-only reader over a byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ByteCursor<'a> {
    /// Big-endian cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_endian(data, Endian::Big)
    }

    /// Little-endian cursor positioned at the start of `data`.
    pub fn little_endian(data: &'a [u8]) -> Self {
        Self::with_endian(data, Endian::Little)
    }

    pub fn with_endian(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute offset. Seeking exactly to the end is allowed.
    pub fn seek(&mut self, offset: usize) -> ParseResult<()> {
        if offset > self.data.len() {
            return Err(ParseError::Truncated {
                offset: self.data.len(),
                needed: offset - self.data.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> ParseResult<()> {
        self.take(n).map(|_| ())
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(ParseError::Truncated {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Borrow everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos.min(self.data.len())..];
        self.pos = self.data.len();
        slice
    }

    pub fn array<const N: usize>(&mut self) -> ParseResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> ParseResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> ParseResult<u16> {
        let bytes = self.array::<2>()?;
        Ok(match self.endian {
            Endian::Big => u16::from_be_bytes(bytes),
            Endian::Little => u16::from_le_bytes(bytes),
        })
    }

    /// 24-bit integer, as used by FLAC block headers.
    pub fn u24(&mut self) -> ParseResult<u32> {
        let [a, b, c] = self.array::<3>()?;
        Ok(match self.endian {
            Endian::Big => u32::from_be_bytes([0, a, b, c]),
            Endian::Little => u32::from_le_bytes([a, b, c, 0]),
        })
    }

    pub fn u32(&mut self) -> ParseResult<u32> {
        let bytes = self.array::<4>()?;
        Ok(match self.endian {
            Endian::Big => u32::from_be_bytes(bytes),
            Endian::Little => u32::from_le_bytes(bytes),
        })
    }

    pub fn i32(&mut self) -> ParseResult<i32> {
        let bytes = self.array::<4>()?;
        Ok(match self.endian {
            Endian::Big => i32::from_be_bytes(bytes),
            Endian::Little => i32::from_le_bytes(bytes),
        })
    }

    pub fn u64(&mut self) -> ParseResult<u64> {
        let bytes = self.array::<8>()?;
        Ok(match self.endian {
            Endian::Big => u64::from_be_bytes(bytes),
            Endian::Little => u64::from_le_bytes(bytes),
        })
    }

    /// Four-character code such as a chunk or box type.
    pub fn fourcc(&mut self) -> ParseResult<[u8; 4]> {
        self.array::<4>()
    }
}

/// Lossy text decoding for metadata strings, trimmed of NUL padding.
pub fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

/// Latin-1 decoding (PNG tEXt, ID3 encoding 0).
pub fn latin1(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| b as char)
        .collect::<String>()
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

/// Render a four-character code for display, escaping non-printable bytes.
pub fn fourcc_str(code: &[u8]) -> String {
    code.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                (b as char).to_string()
            } else {
                format!("\\x{b:02x}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_and_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(ByteCursor::new(&data).u32().unwrap(), 0x0102_0304);
        assert_eq!(ByteCursor::little_endian(&data).u32().unwrap(), 0x0403_0201);
        assert_eq!(ByteCursor::new(&data).u24().unwrap(), 0x01_0203);
    }

    #[test]
    fn test_truncated_read_reports_offset() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut cursor = ByteCursor::new(&data);
        cursor.u16().unwrap();
        let err = cursor.u32().unwrap_err();
        assert_eq!(
            err,
            ParseError::Truncated {
                offset: 2,
                needed: 3
            }
        );
        // A failed read does not move the cursor
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_seek_past_end_fails() {
        let data = [0u8; 4];
        let mut cursor = ByteCursor::new(&data);
        assert!(cursor.seek(4).is_ok());
        assert!(cursor.is_empty());
        assert!(cursor.seek(5).is_err());
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(text(b"Canon\0\0"), "Canon");
        assert_eq!(latin1(&[0x43, 0x61, 0x66, 0xE9]), "Caf\u{e9}");
        assert_eq!(fourcc_str(b"ab\x01c"), "ab\\x01c");
    }
}
