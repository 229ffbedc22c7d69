/// One reusable buffer from the fixed capture pool.
///
/// A slot is owned by exactly one side at a time: the backend (submitted,
/// the producer may write into it) or the pending-delivery queue (filled,
/// the consumer may read it). The Submitted → Filled transition is a type
/// change into [`FilledSlot`]; recycling goes back through [`FilledSlot::into_slot`].
#[derive(Debug)]
pub struct BufferSlot {
    index: usize,
    data: Vec<u8>,
}

impl BufferSlot {
    pub fn new(index: usize, capacity: usize) -> Self {
        Self {
            index,
            data: vec![0; capacity],
        }
    }

    /// Position of this slot in the pool, stable across recycling.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Writable storage for the producer.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Mark the first `len` bytes as captured audio.
    ///
    /// `len` is clamped to the slot's capacity.
    pub fn filled(self, len: usize) -> FilledSlot {
        let len = len.min(self.data.len());
        FilledSlot { slot: self, len }
    }
}

/// A pool slot whose leading bytes hold captured audio, awaiting delivery.
#[derive(Debug)]
pub struct FilledSlot {
    slot: BufferSlot,
    len: usize,
}

impl FilledSlot {
    /// The captured bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.slot.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn index(&self) -> usize {
        self.slot.index
    }

    /// Recycle into a writable slot for re-submission to the backend.
    pub fn into_slot(self) -> BufferSlot {
        self.slot
    }
}
