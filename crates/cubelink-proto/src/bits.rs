//! Big-endian bit-field access over fixed byte buffers.
//!
//! Vendor layouts are specified as (bit offset, width) pairs counted from the
//! most significant bit of byte 0. [`BitReader`] and [`BitWriter`] are the
//! only places those offsets are turned into shifts and masks; codecs never
//! slice bits by hand.

use crate::errors::{ProtocolError, Result};

/// Widest field a single read or write can address.
const MAX_FIELD_WIDTH: usize = 32;

fn check_range(offset: usize, width: usize, len_bits: usize) -> Result<()> {
    let end = offset.checked_add(width);
    if width > MAX_FIELD_WIDTH || end.is_none_or(|end| end > len_bits) {
        return Err(ProtocolError::BitRangeOutOfBounds { offset, width, len: len_bits });
    }
    Ok(())
}

/// Read-only view over a byte buffer, addressed in bits.
#[derive(Debug, Clone, Copy)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
}

impl<'a> BitReader<'a> {
    /// Wrap a buffer.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Buffer length in bits.
    #[must_use]
    pub fn len_bits(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Read `width` bits starting at `offset`, most significant bit first.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::BitRangeOutOfBounds` if the field does not fit the
    ///   buffer or `width > 32`
    pub fn read(&self, offset: usize, width: usize) -> Result<u32> {
        check_range(offset, width, self.len_bits())?;

        let mut value = 0u32;
        for bit in offset..offset + width {
            let byte = self.bytes[bit / 8];
            let b = (byte >> (7 - bit % 8)) & 1;
            value = (value << 1) | u32::from(b);
        }
        Ok(value)
    }

    /// Read an 8-bit field.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::BitRangeOutOfBounds` if the field does not fit
    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.read(offset, 8)? as u8)
    }

    /// Read a 16-bit field whose two bytes are stored little-endian.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::BitRangeOutOfBounds` if the field does not fit
    pub fn read_le16(&self, offset: usize) -> Result<u16> {
        let low = self.read_u8(offset)?;
        let high = self.read_u8(offset + 8)?;
        Ok(u16::from_le_bytes([low, high]))
    }

    /// Read `count` consecutive 8-bit fields as ASCII, dropping NUL padding.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::BitRangeOutOfBounds` if the run does not fit
    pub fn read_ascii(&self, offset: usize, count: usize) -> Result<String> {
        let mut text = String::with_capacity(count);
        for i in 0..count {
            let byte = self.read_u8(offset + i * 8)?;
            if byte != 0 {
                text.push(char::from(byte));
            }
        }
        Ok(text)
    }
}

/// Zero-initialized byte buffer addressed in bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitWriter {
    bytes: Vec<u8>,
}

impl BitWriter {
    /// Create a zeroed buffer of `len` bytes.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { bytes: vec![0; len] }
    }

    /// Write the low `width` bits of `value` at `offset`, MSB first.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::BitRangeOutOfBounds` if the field does not fit
    pub fn write(&mut self, offset: usize, width: usize, value: u32) -> Result<()> {
        check_range(offset, width, self.bytes.len() * 8)?;

        for i in 0..width {
            let bit = offset + i;
            let b = ((value >> (width - 1 - i)) & 1) as u8;
            let mask = 1u8 << (7 - bit % 8);
            if b == 1 {
                self.bytes[bit / 8] |= mask;
            } else {
                self.bytes[bit / 8] &= !mask;
            }
        }
        Ok(())
    }

    /// Write a 16-bit value as two little-endian bytes at `offset`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::BitRangeOutOfBounds` if the field does not fit
    pub fn write_le16(&mut self, offset: usize, value: u16) -> Result<()> {
        let [low, high] = value.to_le_bytes();
        self.write(offset, 8, u32::from(low))?;
        self.write(offset + 8, 8, u32::from(high))
    }

    /// Finished buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
