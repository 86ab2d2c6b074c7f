use thiserror::Error;

/// Rejection returned by `ProgressLedger::record_progress`.
///
/// The ledger is left unmodified whenever this is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgressError {
    #[error("invalid progress for {media_id:?}: {reason}")]
    InvalidProgress { media_id: String, reason: String },
}

impl ProgressError {
    pub(crate) fn invalid(media_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidProgress {
            media_id: media_id.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("ledger storage unavailable: {0}")]
    Unavailable(String),
    #[error("ledger payload is malformed: {0}")]
    Corrupt(String),
}
