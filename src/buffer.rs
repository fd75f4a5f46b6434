//! ByteBuffer: growable binary cursor for writing and reading records.
//!
//! Values are encoded little-endian at the current position. Writing past
//! the end extends the buffer; reading stops at the last whole value and
//! reports how many values it produced.

use crate::error::BufferError;
use std::path::Path;

const INITIAL_CAPACITY: usize = 256;

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width value the buffer can encode.
pub trait Primitive: Copy + sealed::Sealed {
    const SIZE: usize;

    fn encode(self, out: &mut [u8]);

    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! primitive_le {
    ($($t:ty),*) => {$(
        impl sealed::Sealed for $t {}

        impl Primitive for $t {
            const SIZE: usize = core::mem::size_of::<$t>();

            #[inline]
            fn encode(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn decode(bytes: &[u8]) -> Self {
                let mut raw = [0u8; core::mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                <$t>::from_le_bytes(raw)
            }
        }
    )*};
}

primitive_le!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl sealed::Sealed for bool {}

impl Primitive for bool {
    const SIZE: usize = 1;

    fn encode(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    position: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(INITIAL_CAPACITY),
            position: 0,
        }
    }

    /// Wrap existing bytes with the cursor at the start.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: bytes.into(),
            position: 0,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BufferError> {
        let data = std::fs::read(path)?;
        Ok(Self::from_bytes(data))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BufferError> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor, clamped to `[0, len]`. Returns the new position.
    pub fn set_position(&mut self, position: usize) -> usize {
        self.position = position.min(self.data.len());
        self.position
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Make `[position, position + n)` writable, extending the data.
    fn window(&mut self, n: usize) -> &mut [u8] {
        let end = self.position + n;
        if end > self.data.len() {
            if end > self.data.capacity() {
                let mut capacity = self.data.capacity().max(1);
                while capacity < end {
                    capacity *= 2;
                }
                self.data.reserve_exact(capacity - self.data.len());
            }
            self.data.resize(end, 0);
        }
        let start = self.position;
        self.position = end;
        &mut self.data[start..end]
    }

    /// Encode every value at the cursor. Returns the number written.
    pub fn write<T: Primitive>(&mut self, values: &[T]) -> usize {
        for &v in values {
            v.encode(self.window(T::SIZE));
        }
        values.len()
    }

    /// Decode values from the cursor into `out` until it is full or the data
    /// runs out. Returns the number read.
    pub fn read<T: Primitive>(&mut self, out: &mut [T]) -> usize {
        let mut read = 0;
        for slot in out.iter_mut() {
            let end = self.position + T::SIZE;
            if end > self.data.len() {
                break;
            }
            *slot = T::decode(&self.data[self.position..end]);
            self.position = end;
            read += 1;
        }
        read
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        self.window(bytes.len()).copy_from_slice(bytes);
        bytes.len()
    }

    /// Copy up to `out.len()` bytes from the cursor. Returns the number copied.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.data.len() - self.position);
        out[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        n
    }
}
