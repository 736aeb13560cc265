//! Error types for Tabula.

use crate::schema::ValidationFailure;
use crate::value::Value;
use thiserror::Error;

/// Result type alias for Tabula operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for table store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Table not found.
    #[error("Table not found: {name}")]
    TableNotFound { name: String },
    /// Table name already in use.
    #[error("Table already exists: {name}")]
    TableExists { name: String },
    /// Trigger not registered on the table.
    #[error("Trigger {trigger} not found on table {table}")]
    TriggerNotFound { table: String, trigger: String },
    /// Trigger name already registered on the table.
    #[error("Trigger {trigger} already exists on table {table}")]
    TriggerExists { table: String, trigger: String },
    /// A schema rule rejected a record.
    #[error("Validation failed on field {field}: {failure}")]
    Validation {
        field: String,
        failure: ValidationFailure,
    },
    /// A record id collides with an existing record.
    #[error("Duplicate id in table {table}: {id}")]
    DuplicateId { table: String, id: Value },
    /// Malformed arguments or input documents.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
    /// The persistence adapter failed.
    #[error("Persistence error: {message}")]
    Persistence { message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates a table exists error.
    pub fn table_exists(name: impl Into<String>) -> Self {
        Error::TableExists { name: name.into() }
    }

    /// Creates a trigger not found error.
    pub fn trigger_not_found(table: impl Into<String>, trigger: impl Into<String>) -> Self {
        Error::TriggerNotFound {
            table: table.into(),
            trigger: trigger.into(),
        }
    }

    /// Creates a trigger exists error.
    pub fn trigger_exists(table: impl Into<String>, trigger: impl Into<String>) -> Self {
        Error::TriggerExists {
            table: table.into(),
            trigger: trigger.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, failure: ValidationFailure) -> Self {
        Error::Validation {
            field: field.into(),
            failure,
        }
    }

    /// Creates a duplicate id error.
    pub fn duplicate_id(table: impl Into<String>, id: Value) -> Self {
        Error::DuplicateId {
            table: table.into(),
            id,
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Error::Persistence {
            message: message.into(),
        }
    }

    /// Returns true for errors raised because a table or trigger is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::TableNotFound { .. } | Error::TriggerNotFound { .. })
    }

    /// Returns true for errors raised because a name is already taken.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::TableExists { .. } | Error::TriggerExists { .. })
    }

    /// Returns true for schema validation errors.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::invalid_input(err.to_string())
    }
}
