//! Primitive readers and the bounded sub-stream reader.
//!
//! `Reader` is the single capability-set abstraction the rest of the
//! decoder is built on: sequential reads from an in-memory byte slice,
//! with a cursor and (for sub-streams opened with [`Reader::sub_reader`])
//! a hard length bound.

use bumpalo::Bump;

use crate::error::{Error, ErrorKind, Result};

/// A cursor over a byte slice, optionally bounded to fewer bytes than the
/// slice actually contains (used for section and function-body sub-streams).
#[derive(Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` within the original module, for errors.
    base_offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], base_offset: usize) -> Self {
        Self { data, pos: 0, base_offset }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Absolute offset of the next unread byte within the original module.
    pub fn absolute_offset(&self) -> usize {
        self.base_offset + self.pos
    }

    fn err(&self, kind: ErrorKind) -> Error {
        Error::new(kind, self.absolute_offset())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or_else(|| self.err(ErrorKind::EndOfStream))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Peek at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        self.data.get(self.pos).copied().ok_or_else(|| self.err(ErrorKind::EndOfStream))
    }

    /// Borrows the next `n` bytes from this reader's own slice (does not
    /// copy into an arena; callers that need an owned/arena slice copy it
    /// explicitly so that no slice in a decoded `Module` aliases the
    /// original input buffer).
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.err(ErrorKind::EndOfStream));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads an unsigned LEB128 integer of at most `max_bits` bits.
    pub fn read_uleb(&mut self, max_bits: u32) -> Result<u64> {
        let max_groups = (max_bits + 6) / 7;
        let mut result: u64 = 0;
        let mut group = 0u32;
        loop {
            if group >= max_groups {
                return Err(self.err(ErrorKind::Overflow));
            }
            let byte = self.read_u8()?;
            result |= u64::from(byte & 0x7F) << (7 * group);
            group += 1;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
    }

    /// Reads a signed LEB128 integer of at most `max_bits` bits, sign-extended.
    pub fn read_sleb(&mut self, max_bits: u32) -> Result<i64> {
        let max_groups = (max_bits + 6) / 7;
        let mut result: i64 = 0;
        let mut shift = 0u32;
        let mut group = 0u32;
        loop {
            if group >= max_groups {
                return Err(self.err(ErrorKind::Overflow));
            }
            let byte = self.read_u8()?;
            result |= i64::from(byte & 0x7F) << shift;
            shift += 7;
            group += 1;
            if byte & 0x80 == 0 {
                if shift < 64 && (byte & 0x40) != 0 {
                    result |= -(1i64 << shift);
                }
                return Ok(result);
            }
        }
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_uleb(32)? as u32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_uleb(64)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_sleb(32)? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_sleb(64)
    }

    /// Reads the `limits` flag byte, where only bit 0 (has-max) is
    /// meaningful; the remaining bits are ignored rather than rejected.
    pub fn read_limits_flag(&mut self) -> Result<bool> {
        Ok(self.read_u8()? & 0x01 != 0)
    }

    /// Reads a `global`/`import` mutability byte, which is `true` only for
    /// the exact encoding `0x01` (any other byte, including other nonzero
    /// values, is `false`).
    pub fn read_mutable_flag(&mut self) -> Result<bool> {
        Ok(self.read_u8()? == 0x01)
    }

    pub fn read_f32_bits(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    pub fn read_f64_bits(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array::<8>()?))
    }

    /// Reads a fixed-width little-endian `u32` (used for the module's
    /// version field, which is not LEB128-encoded).
    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    /// Reads a ULEB128 length prefix followed by that many raw bytes,
    /// copied into the arena so the result outlives the input buffer.
    pub fn read_byte_vec(&mut self, arena: &'a Bump) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(arena.alloc_slice_copy(bytes))
    }

    /// Reads a ULEB128 length prefix followed by that many raw bytes and
    /// validates them as UTF-8, producing an arena-owned `str`.
    pub fn read_name(&mut self, arena: &'a Bump) -> Result<&'a str> {
        let offset = self.absolute_offset();
        let bytes = self.read_byte_vec(arena)?;
        core::str::from_utf8(bytes)
            .map_err(|_| Error::new(ErrorKind::InvalidEncoding, offset).with_detail("invalid UTF-8 name"))
    }

    /// Reads a ULEB128 count followed by `count` elements decoded by `f`,
    /// collecting them into an arena-owned slice.
    pub fn read_vec<T>(
        &mut self,
        arena: &'a Bump,
        mut f: impl FnMut(&mut Reader<'a>, &'a Bump) -> Result<T>,
    ) -> Result<&'a [T]> {
        let count = self.read_u32()?;
        // `count` comes straight from an untrusted LEB128 and can claim up
        // to u32::MAX elements in a handful of bytes; every element needs
        // at least one byte of input, so `remaining()` is always a safe
        // upper bound on how many can actually be decoded.
        let mut out =
            bumpalo::collections::Vec::with_capacity_in((count as usize).min(self.remaining()), arena);
        for _ in 0..count {
            out.push(f(self, arena)?);
        }
        Ok(out.into_bump_slice())
    }

    /// Opens a bounded view of the next `len` bytes, advancing this reader
    /// past them. The returned reader refuses reads past `len` and can be
    /// checked for exact consumption with [`Reader::assert_end`].
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>> {
        let bytes = self.read_bytes(len)?;
        Ok(Reader::new(bytes, self.base_offset + self.pos - len))
    }

    /// Fails unless every byte of a bounded reader has been consumed.
    pub fn assert_end(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.err(ErrorKind::MalformedSection))
        }
    }

    /// Advances the cursor to the end of the reader, discarding the rest
    /// (used to skip unknown section payloads).
    pub fn skip_to_end(&mut self) {
        self.pos = self.data.len();
    }
}
