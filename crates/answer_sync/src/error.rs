use shared::domain::FieldId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("save failed for field {field_id}: {source}")]
    SaveFailed {
        field_id: FieldId,
        source: anyhow::Error,
    },
    #[error("stale operation from generation {started}, controller is at {current}")]
    StaleOperation { started: u64, current: u64 },
    #[error("field {0} is already bound")]
    AlreadyBound(FieldId),
    #[error("field {0} is not bound")]
    UnknownField(FieldId),
    #[error("controller for field {0} has been shut down")]
    Closed(FieldId),
}
