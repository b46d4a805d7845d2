use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::StrataError;

/// Cooperative cancellation flag shared between a caller and running analyses.
///
/// Analyzers poll it between commits; clones observe the same flag.
///
/// # Examples
///
/// ```
/// use strata_core::CancelToken;
///
/// let token = CancelToken::new();
/// let worker = token.clone();
/// assert!(worker.check().is_ok());
/// token.cancel();
/// assert!(worker.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every analysis holding a clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Fail with [`StrataError::Cancelled`] once cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Cancelled`] if [`CancelToken::cancel`] was called.
    pub fn check(&self) -> Result<(), StrataError> {
        if self.is_cancelled() {
            Err(StrataError::Cancelled)
        } else {
            Ok(())
        }
    }
}
