use crate::schema::EntityKind;
use thiserror::Error;

/// A rejected record. Raised before any table is written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Required field '{0}' is missing or empty")]
    MissingField(String),

    #[error("Value '{value}' already exists for '{field}'")]
    DuplicateKey { field: String, value: String },

    #[error("Field '{field}' value {value} is outside {min}..={max}")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Date of birth {dob} is younger than the minimum age of {min_years} years")]
    AgeTooLow { dob: String, min_years: u32 },

    #[error("Field '{field}' expected {expected}, got '{value}'")]
    InvalidValue {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("Unexpected field '{0}'")]
    UnknownField(String),
}

#[derive(Error, Debug)]
pub enum CampusDbError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Table {table} is unavailable: {location}")]
    StorageUnavailable { table: EntityKind, location: String },

    #[error("Malformed table {table}: {reason}")]
    MalformedTable { table: EntityKind, reason: String },

    #[error("Cascade from {parent} into {dependent} failed, {parent} left unchanged: {source}")]
    CascadeFailed {
        parent: EntityKind,
        dependent: EntityKind,
        #[source]
        source: Box<CampusDbError>,
    },

    #[error("{dependent} was already rewritten but writing {parent} failed, tables are inconsistent: {source}")]
    PrimaryWriteFailed {
        parent: EntityKind,
        dependent: EntityKind,
        #[source]
        source: Box<CampusDbError>,
    },

    #[error("Referential integrity violation: {field} '{value}' does not exist in {target}")]
    DanglingReference {
        field: String,
        value: String,
        target: EntityKind,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl CampusDbError {
    /// The validation failure behind this error, if it is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            CampusDbError::Validation(v) => Some(v),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CampusDbError>;
