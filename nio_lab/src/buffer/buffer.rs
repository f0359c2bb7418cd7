use rand::Rng;

use crate::error::{Error, Result};

/// A fixed-capacity container with a position/limit cursor.
///
/// Writers `put` at `position` until `limit`; `flip` turns the written region
/// into the readable region, and `clear` makes the whole capacity writable
/// again. `position <= limit <= capacity` holds after every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer<T> {
    data: Vec<T>,
    position: usize,
    limit: usize,
    read_only: bool,
}

/// Byte-oriented buffer used for file and socket I/O.
pub type ByteBuffer = Buffer<u8>;

/// Integer buffer.
pub type IntBuffer = Buffer<i32>;

impl<T: Copy + Default> Buffer<T> {
    /// Allocates a zero-filled, writable buffer of `capacity` elements.
    pub fn allocate(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity],
            position: 0,
            limit: capacity,
            read_only: false,
        }
    }
}

impl<T: Copy> Buffer<T> {
    /// Wraps existing content. The whole vector is readable and writable.
    pub fn wrap(data: Vec<T>) -> Self {
        let limit = data.len();
        Self {
            data,
            position: 0,
            limit,
            read_only: false,
        }
    }

    /// Total number of elements the buffer holds. Never changes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Index of the next element to be written or read.
    pub fn position(&self) -> usize {
        self.position
    }

    /// First index that must not be written or read.
    ///
    /// Equals the capacity while filling; after [`Self::flip`] it marks the
    /// end of the written data.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of elements between position and limit.
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Writes one element at the current position.
    pub fn put(&mut self, value: T) -> Result<()> {
        self.check_writable()?;
        self.check_room(1)?;
        self.data[self.position] = value;
        self.position += 1;
        Ok(())
    }

    /// Writes `src` at the current position. Nothing is written on failure.
    pub fn put_slice(&mut self, src: &[T]) -> Result<()> {
        self.check_writable()?;
        self.check_room(src.len())?;
        self.data[self.position..self.position + src.len()].copy_from_slice(src);
        self.position += src.len();
        Ok(())
    }

    /// Reads the element at the current position.
    pub fn get(&mut self) -> Result<T> {
        if !self.has_remaining() {
            return Err(Error::Underflow);
        }
        let value = self.data[self.position];
        self.position += 1;
        Ok(value)
    }

    /// Switches from writing to reading: limit becomes position, position becomes 0.
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Makes the whole capacity writable again. Content is left in place.
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.data.len();
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Moves the unread elements to the front and prepares for more writes.
    pub fn compact(&mut self) -> Result<()> {
        self.check_writable()?;
        let remaining = self.remaining();
        self.data.copy_within(self.position..self.limit, 0);
        self.position = remaining;
        self.limit = self.data.len();
        Ok(())
    }

    /// Returns a read-only buffer with the same content and cursor.
    pub fn as_read_only(&self) -> Self {
        Self {
            read_only: true,
            ..self.clone()
        }
    }

    /// The elements between position and limit.
    pub fn remaining_slice(&self) -> &[T] {
        &self.data[self.position..self.limit]
    }

    /// Iterates over the remaining elements, consuming them.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { buffer: self }
    }

    pub(crate) fn unfilled_mut(&mut self) -> &mut [T] {
        &mut self.data[self.position..self.limit]
    }

    pub(crate) fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.remaining());
        self.position += n;
    }

    pub(crate) fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    fn check_room(&self, needed: usize) -> Result<()> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(Error::Overflow { needed, remaining });
        }
        Ok(())
    }
}

impl IntBuffer {
    /// Fills a new buffer with `capacity` values drawn from `0..bound`, then flips it.
    pub fn fill_random<R: Rng + ?Sized>(capacity: usize, bound: i32, rng: &mut R) -> Result<Self> {
        if bound <= 0 {
            return Err(Error::Config(format!("bound must be positive, got {bound}")));
        }

        let mut buffer = Self::allocate(capacity);
        for _ in 0..capacity {
            buffer.put(rng.random_range(0..bound))?;
        }
        buffer.flip();

        Ok(buffer)
    }
}

impl ByteBuffer {
    /// Consumes the remaining bytes, mapping each byte to one `char` (ISO-8859-1).
    pub fn drain_latin1(&mut self) -> String {
        self.drain().map(char::from).collect()
    }
}

/// Iterator returned by [`Buffer::drain`].
pub struct Drain<'a, T> {
    buffer: &'a mut Buffer<T>,
}

impl<T: Copy> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.buffer.get().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.remaining();
        (remaining, Some(remaining))
    }
}
