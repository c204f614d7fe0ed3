//! Errors for user-edited lists (to-do items and feed subscriptions).

use dashpanel_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListError {
    /// Input was rejected before anything changed.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Index {index} out of range for list of {len}")]
    OutOfRange { index: usize, len: usize },

    /// The change could not be persisted; in-memory state is unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ListError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ListError::Validation(_) => "Please check your input.",
            ListError::OutOfRange { .. } => "That item no longer exists.",
            ListError::Store(e) => e.user_message(),
        }
    }
}

pub type ListResult<T> = Result<T, ListError>;
