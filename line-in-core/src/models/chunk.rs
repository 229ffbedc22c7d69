/// One delivered unit of captured PCM audio.
///
/// A chunk owns its bytes outright: on the pool-and-notify path it is a copy
/// of a pool slot's contents, on the demand-and-signal path it takes over a
/// worker-allocated buffer. Either way it never aliases backend-owned memory,
/// so recycling the underlying buffer cannot corrupt a delivered chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    data: Box<[u8]>,
}

impl AudioChunk {
    /// Build a chunk by copying `bytes` (pool-and-notify path).
    pub fn copy_from(bytes: &[u8]) -> Self {
        Self { data: bytes.into() }
    }

    /// Build a chunk by taking ownership of `data` (demand-and-signal path).
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for AudioChunk {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
