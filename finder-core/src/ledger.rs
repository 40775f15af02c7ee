use crate::CoreError;

/// Durable set of request identifiers that have already been answered.
///
/// `mark_processed` is not required to tolerate duplicates; check `has_processed` first.
pub trait RequestLedger {
    async fn has_processed(&self, request_id: &str) -> Result<bool, CoreError>;

    async fn mark_processed(&self, request_id: &str) -> Result<(), CoreError>;
}
