use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Queue Errors
    #[error("Queue error: {0}")]
    Queue(String),

    // Storage Errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Task error: {0}")]
    Task(String),

    // IO Errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::Queue(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// A queue payload that could not be turned into a trade event.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{reason} (payload: {raw})")]
pub struct DecodeError {
    pub reason: String,
    pub raw: String,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>, raw: &[u8]) -> Self {
        DecodeError {
            reason: reason.into(),
            raw: String::from_utf8_lossy(raw).into_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageErrorKind {
    /// Transport, auth or pool failure. Fatal to the task holding the gateway.
    Connection,
    /// The store rejected well-formed input. Recoverable.
    Constraint,
    /// Lock or timeout. Eligible for a bounded retry.
    Transient,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind:?} error{}: {message}", .code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub code: Option<String>,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

// Synthetic SQLSTATEs for driver failures that never reached the server.
const SQLSTATE_CONNECTION_FAILURE: &str = "08006";
const SQLSTATE_UNABLE_TO_CONNECT: &str = "08001";
const SQLSTATE_CONNECTION_DOES_NOT_EXIST: &str = "08003";

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        StorageError {
            kind,
            code: None,
            message: message.into(),
            detail: None,
            hint: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_connection(&self) -> bool {
        self.kind == StorageErrorKind::Connection
    }

    pub fn is_transient(&self) -> bool {
        self.kind == StorageErrorKind::Transient
    }
}

/// Maps a Postgres SQLSTATE onto the three recovery classes.
pub fn classify_sqlstate(code: &str) -> StorageErrorKind {
    match code {
        "40001" | "40P01" | "55P03" | "57014" => StorageErrorKind::Transient,
        "57P01" | "57P02" | "57P03" => StorageErrorKind::Connection,
        _ if code.starts_with("08") || code.starts_with("28") || code.starts_with("3D") => {
            StorageErrorKind::Connection
        }
        _ if code.starts_with("53") => StorageErrorKind::Transient,
        _ => StorageErrorKind::Constraint,
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        let message = e.to_string();
        match e {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned());
                let kind = code
                    .as_deref()
                    .map(classify_sqlstate)
                    .unwrap_or(StorageErrorKind::Constraint);
                let (detail, hint) = match db_err.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
                    Some(pg) => (pg.detail().map(str::to_owned), pg.hint().map(str::to_owned)),
                    None => (None, None),
                };
                StorageError {
                    kind,
                    code,
                    message: db_err.message().to_string(),
                    detail,
                    hint,
                }
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => {
                StorageError::new(StorageErrorKind::Connection, message)
                    .with_code(SQLSTATE_CONNECTION_FAILURE)
            }
            sqlx::Error::Configuration(_) | sqlx::Error::PoolTimedOut => {
                StorageError::new(StorageErrorKind::Connection, message)
                    .with_code(SQLSTATE_UNABLE_TO_CONNECT)
            }
            sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                StorageError::new(StorageErrorKind::Connection, message)
                    .with_code(SQLSTATE_CONNECTION_DOES_NOT_EXIST)
            }
            _ => StorageError::new(StorageErrorKind::Constraint, message),
        }
    }
}
