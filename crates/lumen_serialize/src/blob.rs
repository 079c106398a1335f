//! Little-endian byte buffer primitives.
//!
//! [`BlobWriter`] grows with fallible reservation and remembers an
//! out-of-memory condition instead of aborting. [`BlobReader`] never reads
//! past its slice: once a read would overrun, a sticky flag is set and every
//! further read yields zeros, so decoders can run to completion and check
//! the flag once.

use lumen_common::{InternalError, LumenResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Configuration for fixed-layout metadata blobs.
fn pod_config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

/// An append-only output buffer.
#[derive(Debug, Default)]
pub struct BlobWriter {
    data: Vec<u8>,
    failed_at: Option<usize>,
}

impl BlobWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn grow(&mut self, additional: usize) -> bool {
        if self.failed_at.is_some() {
            return false;
        }
        if self.data.try_reserve(additional).is_err() {
            self.failed_at = Some(self.data.len().saturating_add(additional));
            return false;
        }
        true
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.grow(bytes.len()) {
            self.data.extend_from_slice(bytes);
        }
    }

    /// Appends one byte.
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Appends a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Appends a little-endian `u64`.
    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Appends a little-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Appends a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> LumenResult<()> {
        self.write_len(value.len())?;
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    /// Appends a `u32` element count.
    pub fn write_len(&mut self, len: usize) -> LumenResult<()> {
        let len = u32::try_from(len)
            .map_err(|_| InternalError::new(format!("length {len} does not fit in 32 bits")))?;
        self.write_u32(len);
        Ok(())
    }

    /// Appends a zero `u32` placeholder and returns its offset.
    pub fn reserve_u32(&mut self) -> usize {
        let offset = self.data.len();
        self.write_u32(0);
        offset
    }

    /// Appends a zero `u64` placeholder and returns its offset.
    pub fn reserve_u64(&mut self) -> usize {
        let offset = self.data.len();
        self.write_u64(0);
        offset
    }

    /// Backfills a placeholder written by [`reserve_u32`](Self::reserve_u32).
    pub fn overwrite_u32(&mut self, offset: usize, value: u32) {
        if let Some(slot) = self.data.get_mut(offset..offset + 4) {
            slot.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Backfills a placeholder written by [`reserve_u64`](Self::reserve_u64).
    pub fn overwrite_u64(&mut self, offset: usize, value: u64) {
        if let Some(slot) = self.data.get_mut(offset..offset + 8) {
            slot.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Appends a fixed-layout value verbatim.
    pub fn write_pod<T: Serialize>(&mut self, value: &T) -> LumenResult<()> {
        let bytes = bincode::serde::encode_to_vec(value, pod_config())
            .map_err(|e| InternalError::new(format!("fixed-layout encode failed: {e}")))?;
        self.write_bytes(&bytes);
        Ok(())
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// If a reservation failed, the buffer size that could not be reached.
    pub fn out_of_memory(&self) -> Option<usize> {
        self.failed_at
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the writer and returns its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// A bounds-checked cursor over an input buffer.
#[derive(Debug)]
pub struct BlobReader<'a> {
    data: &'a [u8],
    pos: usize,
    overrun_at: Option<usize>,
}

impl<'a> BlobReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            overrun_at: None,
        }
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Offset of the first read that ran past the end, if any.
    pub fn overrun(&self) -> Option<usize> {
        self.overrun_at
    }

    fn mark_overrun(&mut self) {
        if self.overrun_at.is_none() {
            self.overrun_at = Some(self.pos);
        }
        self.pos = self.data.len();
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.overrun_at.is_some() || self.remaining() < n {
            self.mark_overrun();
            return None;
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Some(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        if let Some(bytes) = self.take(N) {
            out.copy_from_slice(bytes);
        }
        out
    }

    /// Reads raw bytes; empty after an overrun.
    pub fn read_bytes(&mut self, n: usize) -> &'a [u8] {
        self.take(n).unwrap_or(&[])
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> u8 {
        self.take_array::<1>()[0]
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take_array())
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take_array())
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take_array())
    }

    /// Reads an element count.
    ///
    /// `min_elem_size` is the smallest number of bytes one element can
    /// occupy. A count that could not possibly fit in the rest of the buffer
    /// marks an overrun and reads as zero.
    pub fn read_len(&mut self, min_elem_size: usize) -> usize {
        let len = self.read_u32() as usize;
        if len.saturating_mul(min_elem_size.max(1)) > self.remaining() {
            self.mark_overrun();
            return 0;
        }
        len
    }

    /// Reads a length-prefixed string, replacing invalid UTF-8.
    pub fn read_string(&mut self) -> String {
        let len = self.read_len(1);
        String::from_utf8_lossy(self.read_bytes(len)).into_owned()
    }

    /// Reads a fixed-layout value written by
    /// [`BlobWriter::write_pod`]. A truncated value marks an overrun and
    /// reads as the default; an invalid one is reported as `Err`.
    pub fn read_pod<T: DeserializeOwned + Default>(&mut self) -> Result<T, String> {
        if self.overrun_at.is_some() {
            return Ok(T::default());
        }
        match bincode::serde::decode_from_slice::<T, _>(&self.data[self.pos..], pod_config()) {
            Ok((value, used)) => {
                self.pos += used;
                Ok(value)
            }
            Err(bincode::error::DecodeError::UnexpectedEnd { .. }) => {
                self.mark_overrun();
                Ok(T::default())
            }
            Err(e) => Err(e.to_string()),
        }
    }
}
