use crate::core::diagnostic::DiagnosticRecord;
use crate::error::StorageResult;
use async_trait::async_trait;

/// Storage operations exercised by the diagnostic harness, one per stage.
///
/// Implementations own their connection. `cleanup` must be safe to call after
/// any stage failed, including `connect`.
#[async_trait]
pub trait DiagnosticProbe: Send {
    async fn connect(&mut self) -> StorageResult<()>;
    async fn create_scratch_table(&mut self) -> StorageResult<()>;
    async fn write_row(&mut self, test_data: &str) -> StorageResult<()>;
    async fn read_latest(&mut self) -> StorageResult<DiagnosticRecord>;
    /// Begin, insert, commit. Rolls back and returns the error on failure.
    async fn transacted_write(&mut self, test_data: &str) -> StorageResult<()>;
    async fn cleanup(&mut self);
}
