use thiserror::Error;

/// Failure of [`try_sequence`](crate::combinators::try_sequence).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TryError<E> {
    /// An alternative failed and the policy aborted, or the replacement
    /// task failed.
    #[error("alternative failed: {0}")]
    Failed(E),

    /// Every alternative was tried and none succeeded.
    #[error("every alternative in the sequence failed")]
    EndOfSequence,
}

impl<E> TryError<E> {
    /// The underlying error, if an alternative produced one.
    pub fn into_failed(self) -> Option<E> {
        match self {
            Self::Failed(error) => Some(error),
            Self::EndOfSequence => None,
        }
    }
}
