use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::StorageError;
use crate::interfaces::diagnostic_probe::DiagnosticProbe;

const WRITE_PROBE_DATA: &str = "test_entry";
const TRANSACTION_PROBE_DATA: &str = "transaction_test";

/// Row of the scratch table. Lives only for one diagnostic run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DiagnosticRecord {
    pub id: i32,
    pub test_data: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Connection,
    WritePermission,
    ReadOperation,
    Transaction,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticDetails {
    pub connection: bool,
    pub write_permission: bool,
    pub read_operation: bool,
    pub transaction: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_data: Option<DiagnosticRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosticError {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl DiagnosticError {
    fn new(stage: Stage, err: StorageError) -> Self {
        DiagnosticError {
            stage,
            code: err.code,
            message: err.message,
            detail: err.detail,
            hint: err.hint,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosticResult {
    pub success: bool,
    pub message: String,
    pub details: DiagnosticDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DiagnosticError>,
}

/// Runs connect → write → read → transaction against an isolated probe, then
/// cleans up whatever happened.
pub struct DiagnosticHarness<P: DiagnosticProbe> {
    probe: P,
}

impl<P: DiagnosticProbe> DiagnosticHarness<P> {
    pub fn new(probe: P) -> Self {
        DiagnosticHarness { probe }
    }

    pub async fn run(mut self) -> DiagnosticResult {
        let mut details = DiagnosticDetails::default();
        let outcome = self.run_stages(&mut details).await;
        self.probe.cleanup().await;

        match outcome {
            Ok(()) => DiagnosticResult {
                success: true,
                message: "All diagnostic tests passed successfully".to_string(),
                details,
                error: None,
            },
            Err(error) => {
                tracing::error!(
                    stage = ?error.stage,
                    code = ?error.code,
                    detail = ?error.detail,
                    hint = ?error.hint,
                    "Diagnostic failed: {}", error.message
                );
                DiagnosticResult {
                    success: false,
                    message: "Diagnostic failed".to_string(),
                    details,
                    error: Some(error),
                }
            }
        }
    }

    async fn run_stages(&mut self, details: &mut DiagnosticDetails) -> Result<(), DiagnosticError> {
        self.probe.connect().await
            .map_err(|e| DiagnosticError::new(Stage::Connection, e))?;
        details.connection = true;
        tracing::info!("Connected to database");

        self.probe.create_scratch_table().await
            .map_err(|e| DiagnosticError::new(Stage::WritePermission, e))?;
        self.probe.write_row(WRITE_PROBE_DATA).await
            .map_err(|e| DiagnosticError::new(Stage::WritePermission, e))?;
        details.write_permission = true;
        tracing::info!("Created table and inserted data");

        let record = self.probe.read_latest().await
            .map_err(|e| DiagnosticError::new(Stage::ReadOperation, e))?;
        details.read_operation = true;
        tracing::info!(id = record.id, test_data = %record.test_data, "Retrieved data");
        details.retrieved_data = Some(record);

        self.probe.transacted_write(TRANSACTION_PROBE_DATA).await
            .map_err(|e| DiagnosticError::new(Stage::Transaction, e))?;
        details.transaction = true;
        tracing::info!("Completed transaction test");

        Ok(())
    }
}
