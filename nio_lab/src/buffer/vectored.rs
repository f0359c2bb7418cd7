//! Reading into and writing out of byte buffers, including scatter/gather.

use std::io::{self, IoSlice, IoSliceMut, Read, Write};

use super::ByteBuffer;
use crate::error::Result;

impl ByteBuffer {
    /// Performs a single read into the space between position and limit.
    ///
    /// Returns `Ok(None)` at end of stream, and `Ok(Some(0))` without touching
    /// the reader when the buffer has no room left.
    pub fn read_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<Option<usize>> {
        self.check_writable()?;
        if !self.has_remaining() {
            return Ok(Some(0));
        }

        loop {
            match reader.read(self.unfilled_mut()) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    self.advance(n);
                    return Ok(Some(n));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Reads until the buffer is full or the stream ends. Returns the bytes read.
    pub fn fill_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<usize> {
        let mut total = 0;
        while self.has_remaining() {
            match self.read_from(reader)? {
                Some(n) => total += n,
                None => break,
            }
        }
        Ok(total)
    }

    /// Performs a single write of the remaining bytes.
    pub fn write_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<usize> {
        loop {
            match writer.write(self.remaining_slice()) {
                Ok(n) => {
                    self.advance(n);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Writes every remaining byte, retrying partial writes.
    pub fn write_all_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<usize> {
        let mut total = 0;
        while self.has_remaining() {
            let n = self.write_to(writer)?;
            if n == 0 {
                return Err(io::Error::from(io::ErrorKind::WriteZero).into());
            }
            total += n;
        }
        Ok(total)
    }
}

/// Reads once, spreading the bytes across `buffers` in order.
///
/// Each buffer receives data only between its position and limit, so filled
/// buffers are skipped and earlier content is never overwritten. Returns
/// `Ok(None)` at end of stream and `Ok(Some(0))` when every buffer is full.
pub fn scatter_read<R: Read + ?Sized>(
    reader: &mut R,
    buffers: &mut [ByteBuffer],
) -> Result<Option<usize>> {
    for buffer in buffers.iter() {
        buffer.check_writable()?;
    }
    if total_remaining(buffers) == 0 {
        return Ok(Some(0));
    }

    let n = {
        let mut slices: Vec<IoSliceMut<'_>> = buffers
            .iter_mut()
            .map(|b| IoSliceMut::new(b.unfilled_mut()))
            .collect();
        loop {
            match reader.read_vectored(&mut slices) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    };

    if n == 0 {
        return Ok(None);
    }
    advance_all(buffers, n);
    Ok(Some(n))
}

/// Writes once from the remaining regions of `buffers`, in order.
pub fn gather_write<W: Write + ?Sized>(writer: &mut W, buffers: &mut [ByteBuffer]) -> Result<usize> {
    let n = {
        let slices: Vec<IoSlice<'_>> = buffers
            .iter()
            .map(|b| IoSlice::new(b.remaining_slice()))
            .collect();
        loop {
            match writer.write_vectored(&slices) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    };

    advance_all(buffers, n);
    Ok(n)
}

/// Gathers until every buffer is drained.
pub fn gather_write_all<W: Write + ?Sized>(
    writer: &mut W,
    buffers: &mut [ByteBuffer],
) -> Result<usize> {
    let mut total = 0;
    while total_remaining(buffers) > 0 {
        let n = gather_write(writer, buffers)?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::WriteZero).into());
        }
        total += n;
    }
    Ok(total)
}

/// Sum of `remaining()` across `buffers`.
pub fn total_remaining(buffers: &[ByteBuffer]) -> usize {
    buffers.iter().map(ByteBuffer::remaining).sum()
}

fn advance_all(buffers: &mut [ByteBuffer], mut n: usize) {
    for buffer in buffers.iter_mut() {
        if n == 0 {
            break;
        }
        let step = n.min(buffer.remaining());
        buffer.advance(step);
        n -= step;
    }
}
