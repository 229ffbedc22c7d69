/// Fixed-capacity circular byte buffer between the cpal callback and a
/// blocking reader.
///
/// Wrap in a `parking_lot::Mutex` for cross-thread use. Overflow drops the
/// oldest bytes; the writer reports how many so the caller can log the
/// overrun.
#[derive(Debug)]
pub struct ByteRing {
    buffer: Vec<u8>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
}

impl ByteRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
        }
    }

    /// Write bytes into the ring, dropping the oldest on overflow.
    ///
    /// Returns the number of bytes dropped. If `bytes` is larger than
    /// capacity, only the tail is kept.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        if bytes.is_empty() {
            return 0;
        }

        let mut dropped = 0;
        let bytes = if bytes.len() > self.capacity {
            dropped += bytes.len() - self.capacity;
            &bytes[bytes.len() - self.capacity..]
        } else {
            bytes
        };

        let overflow = (self.available + bytes.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
            dropped += overflow;
        }

        for &byte in bytes {
            self.buffer[self.write_index] = byte;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available += bytes.len();

        dropped
    }

    /// Read and remove up to `count` bytes.
    pub fn read(&mut self, count: usize) -> Vec<u8> {
        let to_read = count.min(self.available);
        if to_read == 0 {
            return Vec::new();
        }

        let mut result = Vec::with_capacity(to_read);
        for i in 0..to_read {
            result.push(self.buffer[(self.read_index + i) % self.capacity]);
        }
        self.read_index = (self.read_index + to_read) % self.capacity;
        self.available -= to_read;
        result
    }

    pub fn len(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }
}
