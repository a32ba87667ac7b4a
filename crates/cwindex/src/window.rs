//! Compressed-window records.
//!
//! A window `(doc, v, a, b, c, d)` states that for every sub-range `[i, j]`
//! of document `doc` with `a <= i <= b` and `c <= j <= d`, the minimum hash
//! value over the range under one fixed hash function is `v`. Encoding the
//! per-sub-range sketch as these rectangles compresses the `O(n^2)` table
//! into far fewer records.

use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// A hash value that can live inside a window and on disk.
///
/// Implemented by `i32` (integer linear hash) and `f64` (consistent weighted
/// sampling). The wire encoding is little-endian, field-sized.
pub trait WeightValue:
    Copy + PartialOrd + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Sentinel greater than every reachable hash value; used to seed
    /// minimum scans.
    const MAX_SENTINEL: Self;

    /// Write the value in wire encoding.
    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;

    /// Read a value in wire encoding.
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self>;
}

impl WeightValue for i32 {
    const MAX_SENTINEL: i32 = i32::MAX;

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_i32::<LittleEndian>(*self)
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        reader.read_i32::<LittleEndian>()
    }
}

impl WeightValue for f64 {
    const MAX_SENTINEL: f64 = f64::MAX;

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_f64::<LittleEndian>(*self)
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        reader.read_f64::<LittleEndian>()
    }
}

/// One compressed window.
///
/// Positions are 0-indexed token offsets with `a <= b <= c <= d`; `b == c`
/// is allowed (degenerate windows covering `i == j` pairs). The argmin
/// position of every covered sub-range lies in `[b, c]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Window<V> {
    /// Document id.
    pub doc: u32,
    /// Min-hash value shared by every covered sub-range.
    pub value: V,
    /// Start-position range `[a, b]`.
    pub a: i32,
    pub b: i32,
    /// End-position range `[c, d]`.
    pub c: i32,
    pub d: i32,
}

impl<V: WeightValue> Window<V> {
    pub fn new(doc: u32, value: V, a: i32, b: i32, c: i32, d: i32) -> Self {
        Self {
            doc,
            value,
            a,
            b,
            c,
            d,
        }
    }

    /// Whether the window covers the sub-range `[i, j]`.
    pub fn covers(&self, i: i32, j: i32) -> bool {
        self.a <= i && i <= self.b && self.c <= j && j <= self.d
    }

    /// Wire encoding: `i32 doc, i32 a, i32 b, i32 c, i32 d`, then the value.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_i32::<LittleEndian>(self.doc as i32)?;
        writer.write_i32::<LittleEndian>(self.a)?;
        writer.write_i32::<LittleEndian>(self.b)?;
        writer.write_i32::<LittleEndian>(self.c)?;
        writer.write_i32::<LittleEndian>(self.d)?;
        self.value.write_to(writer)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let doc = reader.read_i32::<LittleEndian>()? as u32;
        let a = reader.read_i32::<LittleEndian>()?;
        let b = reader.read_i32::<LittleEndian>()?;
        let c = reader.read_i32::<LittleEndian>()?;
        let d = reader.read_i32::<LittleEndian>()?;
        let value = V::read_from(reader)?;
        Ok(Self {
            doc,
            value,
            a,
            b,
            c,
            d,
        })
    }
}

impl<V: fmt::Display> fmt::Display for Window<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(doc: {}, hash: {}, a: {}, b: {}, c: {}, d: {})",
            self.doc, self.value, self.a, self.b, self.c, self.d
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_roundtrip_int() {
        let w = Window::new(3u32, 12345i32, 0, 2, 2, 7);
        let mut buf = Vec::new();
        w.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 24);
        let back = Window::<i32>::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn wire_roundtrip_real() {
        let w = Window::new(0u32, 0.125f64, 1, 1, 4, 4);
        let mut buf = Vec::new();
        w.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 28);
        let back = Window::<f64>::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn covers_is_inclusive() {
        let w = Window::new(0u32, 1i32, 2, 4, 6, 9);
        assert!(w.covers(2, 6));
        assert!(w.covers(4, 9));
        assert!(w.covers(3, 7));
        assert!(!w.covers(1, 7));
        assert!(!w.covers(5, 7));
        assert!(!w.covers(3, 5));
        assert!(!w.covers(3, 10));
    }
}
