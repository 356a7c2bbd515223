// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Chunked append-only tape holding the binary token stream.
//!
//! The tape exposes a contiguous virtual offset range `[0, total_size)`
//! even though the physical backing is a list of fixed-size chunks.
//! Appended bytes never move, so tape offsets handed out to callers stay
//! valid for the lifetime of the loader. A single `push` never straddles
//! a chunk boundary, which keeps every token payload contiguous in memory.

use crate::error::{Error, Result};

/// Default chunk size, 16 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 24;

/// Append-only chunked byte buffer with a read cursor.
pub struct Tape {
    chunks: Vec<Vec<u8>>,
    /// Virtual start offset of each chunk, parallel to `chunks`.
    starts: Vec<u64>,
    chunk_size: usize,
    total: u64,
    cursor: u64,
}

impl Tape {
    /// Create an empty tape with the default 16 MiB chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create an empty tape with a custom chunk size.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        assert!(chunk_size > 0);
        Self {
            chunks: Vec::new(),
            starts: Vec::new(),
            chunk_size,
            total: 0,
            cursor: 0,
        }
    }

    /// Append raw bytes. The write lands in one chunk; a fresh chunk is
    /// allocated lazily when the current one cannot hold it.
    pub fn push(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        match self.chunks.last_mut() {
            Some(chunk) if chunk.capacity() - chunk.len() >= bytes.len() => {
                chunk.extend_from_slice(bytes);
            }
            _ => {
                self.starts.push(self.total);
                let mut chunk = Vec::with_capacity(self.chunk_size.max(bytes.len()));
                chunk.extend_from_slice(bytes);
                self.chunks.push(chunk);
            }
        }
        self.total += bytes.len() as u64;
    }

    /// Set the read cursor. Seeking to `total_size` (end of stream) is
    /// allowed; seeking past it is an error.
    #[inline]
    pub fn move_to(&mut self, offset: u64) -> Result<()> {
        if offset > self.total {
            return Err(Error::OutOfRange {
                offset,
                size: self.total,
            });
        }
        self.cursor = offset;
        Ok(())
    }

    /// Skip `n` bytes forward.
    #[inline]
    pub fn advance_read(&mut self, n: u64) -> Result<()> {
        let offset = self.cursor + n;
        self.move_to(offset)
    }

    /// Current cursor position.
    #[inline]
    pub fn read_offset(&self) -> u64 {
        self.cursor
    }

    /// True iff the cursor sits at the end of the stream.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.cursor == self.total
    }

    /// Total bytes appended so far. Monotonic nondecreasing.
    #[inline]
    pub fn total_size(&self) -> u64 {
        self.total
    }

    /// Map a virtual offset to (chunk index, offset within chunk).
    /// Offsets that land exactly on a chunk's end resolve to the start of
    /// the next chunk, so slack from early-closed chunks is skipped.
    #[inline]
    fn locate(&self, offset: u64) -> (usize, usize) {
        let ci = self.starts.partition_point(|&s| s <= offset) - 1;
        let within = (offset - self.starts[ci]) as usize;
        if within >= self.chunks[ci].len() && ci + 1 < self.chunks.len() {
            (ci + 1, 0)
        } else {
            (ci, within)
        }
    }

    /// Read exactly `buf.len()` bytes at the cursor, handling chunk
    /// transitions, and advance the cursor.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let end = self.cursor + buf.len() as u64;
        if end > self.total {
            return Err(Error::OutOfRange {
                offset: end,
                size: self.total,
            });
        }
        let mut written = 0;
        while written < buf.len() {
            let (ci, wi) = self.locate(self.cursor);
            let chunk = &self.chunks[ci];
            let take = (chunk.len() - wi).min(buf.len() - written);
            buf[written..written + take].copy_from_slice(&chunk[wi..wi + take]);
            written += take;
            self.cursor += take as u64;
        }
        Ok(())
    }

    /// Consume one byte at the cursor.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Consume a little-endian `u32` at the cursor.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Consume a little-endian `f64` at the cursor.
    #[inline]
    pub fn read_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Read a 1-byte length then a borrowed view of that many bytes,
    /// advancing the cursor past both. Payloads are contiguous by the
    /// push policy.
    pub fn read_string_view(&mut self) -> Result<&[u8]> {
        let len = self.read_u8()? as usize;
        let offset = self.cursor;
        if offset + len as u64 > self.total {
            return Err(Error::OutOfRange {
                offset: offset + len as u64,
                size: self.total,
            });
        }
        let (ci, wi) = self.locate(offset);
        if wi + len > self.chunks[ci].len() {
            // A payload can only straddle chunks if the tape bytes were
            // produced by something other than this crate's writers.
            return Err(Error::OutOfRange {
                offset: offset + len as u64,
                size: self.starts[ci] + self.chunks[ci].len() as u64,
            });
        }
        self.cursor = offset + len as u64;
        Ok(&self.chunks[ci][wi..wi + len])
    }

    /// Copy `[start, end)` into `dest` without touching the cursor.
    /// Returns the number of bytes copied, clamped to the end of the tape
    /// and to `dest`'s length.
    pub fn copy(&self, start: u64, end: u64, dest: &mut [u8]) -> usize {
        let end = end.min(self.total);
        if start >= end {
            return 0;
        }
        let count = ((end - start) as usize).min(dest.len());
        let mut written = 0;
        let mut offset = start;
        while written < count {
            let (ci, wi) = self.locate(offset);
            let chunk = &self.chunks[ci];
            let take = (chunk.len() - wi).min(count - written);
            dest[written..written + take].copy_from_slice(&chunk[wi..wi + take]);
            written += take;
            offset += take as u64;
        }
        count
    }

    /// Iterate the filled chunks in order, for bulk dumping.
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
        self.chunks.iter().map(|c| c.as_slice())
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_read_round_trip() {
        let mut tape = Tape::new();
        tape.push(&[7]);
        tape.push(&42u32.to_le_bytes());
        tape.push(&[8]);
        tape.push(&1.5f64.to_le_bytes());

        assert_eq!(tape.total_size(), 14);
        tape.move_to(0).unwrap();
        assert_eq!(tape.read_u8().unwrap(), 7);
        assert_eq!(tape.read_u32().unwrap(), 42);
        assert_eq!(tape.read_u8().unwrap(), 8);
        assert_eq!(tape.read_f64().unwrap(), 1.5);
        assert!(tape.at_end());
    }

    #[test]
    fn test_string_view() {
        let mut tape = Tape::new();
        tape.push(&[5]);
        tape.push(b"METRE");
        tape.move_to(0).unwrap();
        assert_eq!(tape.read_string_view().unwrap(), b"METRE");
        assert!(tape.at_end());
    }

    #[test]
    fn test_move_past_end_fails() {
        let mut tape = Tape::new();
        tape.push(&[1, 2, 3]);
        assert!(tape.move_to(3).is_ok());
        assert!(matches!(tape.move_to(4), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn test_read_past_end_fails() {
        let mut tape = Tape::new();
        tape.push(&[1, 2]);
        tape.move_to(1).unwrap();
        assert!(tape.read_u32().is_err());
    }

    #[test]
    fn test_chunk_boundary_reads() {
        // Tiny chunks force every push into its own chunk.
        let mut tape = Tape::with_chunk_size(4);
        tape.push(&[7]);
        tape.push(&99u32.to_le_bytes());
        tape.push(&[4, 2]);
        tape.push(b"ab");

        tape.move_to(0).unwrap();
        assert_eq!(tape.read_u8().unwrap(), 7);
        assert_eq!(tape.read_u32().unwrap(), 99);
        assert_eq!(tape.read_string_view().unwrap(), b"ab");
        assert!(tape.at_end());
    }

    #[test]
    fn test_offsets_contiguous_across_chunks() {
        let mut tape = Tape::with_chunk_size(4);
        tape.push(&[1, 2, 3]);
        tape.push(&[4, 5, 6]); // does not fit the first chunk's slack
        assert_eq!(tape.total_size(), 6);

        tape.move_to(2).unwrap();
        assert_eq!(tape.read_u8().unwrap(), 3);
        assert_eq!(tape.read_u8().unwrap(), 4);
    }

    #[test]
    fn test_copy_range() {
        let mut tape = Tape::with_chunk_size(4);
        tape.push(&[1, 2, 3]);
        tape.push(&[4, 5, 6]);

        let mut dest = [0u8; 4];
        let copied = tape.copy(1, 5, &mut dest);
        assert_eq!(copied, 4);
        assert_eq!(dest, [2, 3, 4, 5]);

        // Clamped to tape end.
        let copied = tape.copy(4, 100, &mut dest);
        assert_eq!(copied, 2);
        assert_eq!(&dest[..2], &[5, 6]);
    }

    #[test]
    fn test_advance_read() {
        let mut tape = Tape::new();
        tape.push(&[1, 2, 3, 4]);
        tape.move_to(0).unwrap();
        tape.advance_read(3).unwrap();
        assert_eq!(tape.read_u8().unwrap(), 4);
        assert!(tape.advance_read(1).is_err());
    }
}
