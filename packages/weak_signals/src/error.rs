use std::error::Error as StdError;

use thiserror::Error;

/// Errors that interrupt a broadcast.
///
/// Listener methods return [`SignalResult`] and a broadcast stops at the first listener that
/// returns an error, handing that error back to whoever started the broadcast. Listeners that
/// were already notified keep whatever effects the signal had on them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SignalError {
    /// A listener failed to handle a signal.
    #[error("listener failed to handle signal: {source}")]
    Listener {
        /// The failure reported by the listener.
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl SignalError {
    /// Wraps a failure reported by a listener.
    ///
    /// # Example
    ///
    /// ```
    /// use weak_signals::SignalError;
    ///
    /// let error = SignalError::listener("disk is full");
    /// assert!(error.to_string().contains("disk is full"));
    /// ```
    #[must_use]
    pub fn listener(source: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self::Listener {
            source: source.into(),
        }
    }
}

/// The result of delivering a signal to one listener.
pub type SignalResult = Result<(), SignalError>;
