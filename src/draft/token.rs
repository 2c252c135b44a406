//! Generation tokens.
//!
//! Every draw starts a new generation. Asynchronous work carries a
//! [`GenerationHandle`] and checks it after each await; once a newer generation has
//! started the handle is stale and the work must stop without side effects.

use crate::draft::types::DraftError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of generation tokens, owned by the session.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, invalidating every outstanding handle.
    pub fn advance(&self) -> GenerationHandle {
        let token = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationHandle {
            token,
            current: self.current.clone(),
        }
    }

    /// Token of the newest generation (0 before the first one).
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Generation-scoped handle passed into asynchronous steps.
#[derive(Debug, Clone)]
pub struct GenerationHandle {
    token: u64,
    current: Arc<AtomicU64>,
}

impl GenerationHandle {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.token
    }

    /// `Err(Cancelled)` once a newer generation has started.
    pub fn check(&self) -> Result<(), DraftError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(DraftError::Cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_invalidates_previous_handle() {
        let counter = GenerationCounter::new();
        assert_eq!(counter.current(), 0);

        let first = counter.advance();
        assert!(first.is_current());
        assert_eq!(first.token(), 1);

        let second = counter.advance();
        assert!(!first.is_current());
        assert_eq!(first.check(), Err(DraftError::Cancelled));
        assert!(second.check().is_ok());
        assert_eq!(counter.current(), 2);
    }
}
