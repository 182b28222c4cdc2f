pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod generator;
pub mod integrity;
pub mod query;
pub mod schema;
pub mod table;
pub mod validation;

pub use config::StoreConfig;
pub use engine::{DeleteOutcome, Engine, Store, UpdateOutcome};
pub use entity::{Course, Department, Enrollment, Entity, Instructor, Student};
pub use error::{CampusDbError, Result, ValidationError};
pub use query::Query;
pub use schema::EntityKind;
pub use table::{Record, RecordKey, Table, TableBackend};
