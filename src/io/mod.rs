//! # Primitive I/O
//!
//! Positioned reads and writes of the primitive values every container is built
//! from. All fixed-width integers are stored big-endian.
//!
//! | Primitive | Width       | Encoding                                           |
//! | --------- | ----------- | -------------------------------------------------- |
//! | byte      | 1           | raw                                                |
//! | int       | 4           | `i32`, big-endian                                  |
//! | long      | 8           | `i64`, big-endian                                  |
//! | double    | 8           | IEEE-754 `f64`, big-endian                         |
//! | cint      | 1-5         | `u32` in 7-bit groups, low group first, MSB = more |
//! | string    | cint + N    | byte count followed by UTF-8 bytes                 |
//!
//! [`DataOutput`] and [`DataInput`] are implemented for every seekable writer and
//! reader, so the same record code runs against files, in-memory cursors, and
//! [`FileView`] cursors alike.

mod stream;
mod view;

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{ReadError, Result, WriteError};

pub use stream::{OutputStream, DEFAULT_BUFFER_CAPACITY};
pub use view::{FileView, ViewCursor};

/// Maximum number of bytes in an encoded cint
pub const MAX_CINT_BYTES: usize = 5;

/// A byte stream with an absolute position that can be moved
pub trait Positioned {
    /// Returns the absolute position of the stream
    fn tell(&mut self) -> Result<u64>;

    /// Moves the stream to an absolute position
    fn seek_to(&mut self, pos: u64) -> Result<()>;

    /// Returns the length of the stream without moving its position
    fn end_position(&mut self) -> Result<u64>;
}

/// Writes primitive values to a positioned byte stream
pub trait DataOutput: Write + Positioned {
    fn put_byte(&mut self, value: u8) -> Result<()> {
        self.write_u8(value)?;
        Ok(())
    }

    fn put_int(&mut self, value: i32) -> Result<()> {
        self.write_i32::<BigEndian>(value)?;
        Ok(())
    }

    fn put_long(&mut self, value: i64) -> Result<()> {
        self.write_i64::<BigEndian>(value)?;
        Ok(())
    }

    fn put_double(&mut self, value: f64) -> Result<()> {
        self.write_f64::<BigEndian>(value)?;
        Ok(())
    }

    /// Writes a variable-length compressed unsigned integer
    fn put_cint(&mut self, mut value: u32) -> Result<()> {
        let mut buf = [0u8; MAX_CINT_BYTES];
        let mut n = 0;
        loop {
            let low = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                buf[n] = low;
                n += 1;
                break;
            }
            buf[n] = low | 0x80;
            n += 1;
        }
        self.write_all(&buf[..n])?;
        Ok(())
    }

    /// Writes a cint byte count followed by the UTF-8 bytes of `value`
    fn put_string(&mut self, value: &str) -> Result<()> {
        self.put_cint(cint_len(value.len())?)?;
        self.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Writes raw bytes without a length prefix
    fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)?;
        Ok(())
    }
}

/// Reads primitive values from a positioned byte stream
pub trait DataInput: Read + Positioned {
    fn get_byte(&mut self) -> Result<u8> {
        Ok(self.read_u8()?)
    }

    fn get_int(&mut self) -> Result<i32> {
        Ok(self.read_i32::<BigEndian>()?)
    }

    fn get_long(&mut self) -> Result<i64> {
        Ok(self.read_i64::<BigEndian>()?)
    }

    fn get_double(&mut self) -> Result<f64> {
        Ok(self.read_f64::<BigEndian>()?)
    }

    /// Reads a variable-length compressed unsigned integer
    fn get_cint(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for i in 0..MAX_CINT_BYTES {
            let byte = self.read_u8()?;
            let low = u32::from(byte & 0x7f);
            // the fifth group only has room for the top four bits
            if i == MAX_CINT_BYTES - 1 && low > 0x0f {
                return Err(ReadError::VarIntOverflow.into());
            }
            value |= low << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ReadError::VarIntOverflow.into())
    }

    fn get_string(&mut self) -> Result<String> {
        let len = self.get_cint()? as usize;
        let bytes = self.get_vec(len)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Fills `buf` completely from the stream
    fn get_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_exact(buf)?;
        Ok(())
    }

    /// Reads exactly `len` bytes into a new buffer
    ///
    /// The buffer grows with the bytes actually read, so a corrupt length
    /// fails on end of stream rather than on allocation.
    fn get_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        Read::take(&mut *self, len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        Ok(buf)
    }
}

impl<S: Seek + ?Sized> Positioned for S {
    fn tell(&mut self) -> Result<u64> {
        Ok(self.stream_position()?)
    }
    fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.seek(SeekFrom::Start(pos))?;
        Ok(())
    }
    fn end_position(&mut self) -> Result<u64> {
        let pos = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        if pos != end {
            self.seek(SeekFrom::Start(pos))?;
        }
        Ok(end)
    }
}

impl<W: Write + Seek + ?Sized> DataOutput for W {}

impl<R: Read + Seek + ?Sized> DataInput for R {}

/// Converts a byte length to the `u32` a cint can carry
pub(crate) fn cint_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| WriteError::LengthOverflow(len).into())
}

/// Number of bytes `value` occupies when written with [`DataOutput::put_cint`]
#[must_use]
pub fn cint_size(value: u32) -> usize {
    match value {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        0x4000..=0x1f_ffff => 3,
        0x20_0000..=0x0fff_ffff => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::io::Cursor;

    #[test]
    fn test_cint_widths() -> Result<()> {
        for value in [0, 0x7f, 0x80, 0x3fff, 0x4000, 0x0fff_ffff, u32::MAX] {
            let mut out = Cursor::new(Vec::new());
            out.put_cint(value)?;
            let bytes = out.into_inner();
            assert_eq!(bytes.len(), cint_size(value));

            let mut input = Cursor::new(bytes.as_slice());
            assert_eq!(input.get_cint()?, value);
            assert_eq!(input.tell()?, bytes.len() as u64);
        }
        Ok(())
    }

    #[test]
    fn test_cint_overflow() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0x7f];
        let mut input = Cursor::new(&bytes[..]);
        assert!(matches!(
            input.get_cint(),
            Err(Error::ReadError(ReadError::VarIntOverflow))
        ));
    }

    #[test]
    fn test_fixed_width_is_big_endian() -> Result<()> {
        let mut out = Cursor::new(Vec::new());
        out.put_int(1)?;
        out.put_long(258)?;
        assert_eq!(
            out.into_inner(),
            vec![0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 2]
        );
        Ok(())
    }

    #[test]
    fn test_string_and_positions() -> Result<()> {
        let mut out = Cursor::new(Vec::new());
        out.put_string("chr1")?;
        out.put_double(0.5)?;
        out.put_byte(7)?;
        assert_eq!(out.tell()?, 1 + 4 + 8 + 1);

        let bytes = out.into_inner();
        let mut input = Cursor::new(bytes.as_slice());
        input.seek_to(5)?;
        assert!((input.get_double()? - 0.5).abs() < f64::EPSILON);
        input.seek_to(0)?;
        assert_eq!(input.get_string()?, "chr1");
        Ok(())
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = [2, 0xc3, 0x28];
        let mut input = Cursor::new(&bytes[..]);
        assert!(matches!(input.get_string(), Err(Error::Utf8Error(_))));
    }
}
