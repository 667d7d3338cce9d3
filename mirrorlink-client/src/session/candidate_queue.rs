use mirrorlink_core::IceCandidate;

/// Holds remote candidates until the remote description is installed.
///
/// Nothing leaves the queue before [`release`](Self::release) is called, and
/// after that every candidate passes straight through.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    pending: Vec<IceCandidate>,
    released: bool,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the candidate back if it may be applied now, otherwise keeps it.
    pub fn admit(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.released {
            Some(candidate)
        } else {
            self.pending.push(candidate);
            None
        }
    }

    /// Marks the remote description as installed and hands back everything
    /// held so far, in arrival order.
    pub fn release(&mut self) -> Vec<IceCandidate> {
        self.released = true;
        std::mem::take(&mut self.pending)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
