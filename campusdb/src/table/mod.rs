// Table store - records, keys, and the storage backend seam

mod csv_file;
mod memory;

pub use csv_file::{read_table, write_table, CsvBackend};
pub use memory::MemoryBackend;

use crate::error::{CampusDbError, Result};
use crate::schema::{canonicalize, EntityKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One row of a table: column name -> canonical text value.
/// Absent and empty are the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    pub fn new() -> Self {
        Record(BTreeMap::new())
    }

    pub fn get(&self, field: &str) -> &str {
        self.0.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    /// True when the field holds a non-empty value.
    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overwrite every field present in `patch`.
    pub fn merge(&mut self, patch: &Record) {
        for (k, v) in patch.fields() {
            self.set(k, v);
        }
    }

    /// Build a record from raw (column, value) pairs, canonicalizing each known column.
    pub fn from_raw<'a>(
        kind: EntityKind,
        values: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut record = Record::new();
        for (name, raw) in values {
            if let Some(column) = kind.column(name) {
                record.set(name, canonicalize(column.column_type, raw));
            }
        }
        record
    }

    /// Convert to a JSON object holding every declared column of `kind`.
    pub fn to_json(&self, kind: EntityKind) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        for name in kind.column_names() {
            obj.insert(
                name.to_string(),
                serde_json::Value::String(self.get(name).to_string()),
            );
        }
        serde_json::Value::Object(obj)
    }
}

/// A primary key value. Single-column for most tables; the
/// (StudentID, CourseID, Semester, Year) tuple for enrollments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey(Vec<String>);

impl RecordKey {
    pub fn id(value: impl ToString) -> Self {
        RecordKey(vec![value.to_string()])
    }

    pub fn enrollment(
        student_id: impl ToString,
        course_id: impl ToString,
        semester: impl ToString,
        year: impl ToString,
    ) -> Self {
        RecordKey(vec![
            student_id.to_string(),
            course_id.to_string(),
            semester.to_string(),
            year.to_string(),
        ])
    }

    pub fn from_values(values: Vec<String>) -> Self {
        RecordKey(values)
    }

    /// Extract the key of `record`. Record values are already canonical.
    pub fn of(kind: EntityKind, record: &Record) -> Self {
        RecordKey(
            kind.key_columns()
                .iter()
                .map(|c| record.get(c).to_string())
                .collect(),
        )
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    /// Check arity against `kind` and canonicalize every component.
    pub fn canonical(&self, kind: EntityKind) -> Result<RecordKey> {
        let columns = kind.key_columns();
        if columns.len() != self.0.len() {
            return Err(CampusDbError::Other(format!(
                "{kind} key has {} component(s) ({}), got {}",
                columns.len(),
                columns.join(", "),
                self.0.len()
            )));
        }
        let values = columns
            .iter()
            .zip(&self.0)
            .map(|(name, raw)| {
                let column_type = kind
                    .column(name)
                    .map(|c| c.column_type)
                    .unwrap_or(crate::schema::ColumnType::Text);
                canonicalize(column_type, raw)
            })
            .collect();
        Ok(RecordKey(values))
    }

    /// Composite equality against a record. Both sides must be canonical.
    pub fn matches(&self, kind: EntityKind, record: &Record) -> bool {
        kind.key_columns()
            .iter()
            .zip(&self.0)
            .all(|(name, value)| record.get(name) == value)
    }
}

macro_rules! single_key_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for RecordKey {
                fn from(value: $t) -> Self {
                    RecordKey::id(value)
                }
            }
        )*
    };
}

single_key_from!(&str, String, &String, i32, i64, u32, u64);

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// An ordered sequence of records of one kind, loaded from one backing file.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    kind: EntityKind,
    rows: Vec<Record>,
}

impl Table {
    pub fn new(kind: EntityKind) -> Self {
        Table { kind, rows: Vec::new() }
    }

    pub fn with_rows(kind: EntityKind, rows: Vec<Record>) -> Self {
        Table { kind, rows }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Record] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    /// Indices of rows whose key equals `key` (canonical).
    pub fn positions(&self, key: &RecordKey) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| key.matches(self.kind, r))
            .map(|(i, _)| i)
            .collect()
    }

    /// Rows whose `field` equals `value` exactly.
    pub fn where_eq<'a>(&'a self, field: &'a str, value: &'a str) -> impl Iterator<Item = &'a Record> {
        self.rows.iter().filter(move |r| r.get(field) == value)
    }

    /// Remove rows failing `keep`. Returns the number removed.
    pub fn retain(&mut self, keep: impl FnMut(&Record) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(keep);
        before - self.rows.len()
    }
}

/// Storage seam for tables. Each call is a whole-table read or write.
pub trait TableBackend {
    /// Load a table. `None` when it has never been written.
    fn load(&self, kind: EntityKind) -> Result<Option<Table>>;

    /// Replace the stored table. Readers never observe a partial write.
    fn save(&self, table: &Table) -> Result<()>;

    /// Human-readable location of a table, for error messages.
    fn location(&self, kind: EntityKind) -> String;
}

/// Load a table, treating a missing one as empty.
pub fn load_or_empty(backend: &dyn TableBackend, kind: EntityKind) -> Result<Table> {
    Ok(backend.load(kind)?.unwrap_or_else(|| Table::new(kind)))
}

/// Load a table that must already exist.
pub fn load_required(backend: &dyn TableBackend, kind: EntityKind) -> Result<Table> {
    backend
        .load(kind)?
        .ok_or_else(|| CampusDbError::StorageUnavailable {
            table: kind,
            location: backend.location(kind),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrollment(student: &str, course: &str, semester: &str, year: &str) -> Record {
        Record::from_raw(
            EntityKind::Enrollment,
            [
                ("StudentID", student),
                ("CourseID", course),
                ("Semester", semester),
                ("Year", year),
                ("Grade", "80"),
            ],
        )
    }

    #[test]
    fn test_record_from_raw_canonicalizes_and_drops_unknown() {
        let record = Record::from_raw(
            EntityKind::Enrollment,
            [("StudentID", "20250040.0"), ("Year", " 2023 "), ("Bogus", "x")],
        );
        assert_eq!(record.get("StudentID"), "20250040");
        assert_eq!(record.get("Year"), "2023");
        assert_eq!(record.get("Bogus"), "");
        assert!(!record.has("Grade"));
    }

    #[test]
    fn test_composite_key_matching() {
        let table = Table::with_rows(
            EntityKind::Enrollment,
            vec![
                enrollment("20250070", "C0181", "الفصل الأول", "2023"),
                enrollment("20250070", "C0181", "الفصل الثاني", "2023"),
            ],
        );
        let key = RecordKey::enrollment(20250070, "C0181", "الفصل الأول", "2023.0")
            .canonical(EntityKind::Enrollment)
            .unwrap();
        assert_eq!(table.positions(&key), vec![0]);
    }

    #[test]
    fn test_key_arity_checked() {
        let result = RecordKey::id("S1").canonical(EntityKind::Enrollment);
        assert!(result.is_err());
        assert!(RecordKey::id(33).canonical(EntityKind::Student).is_ok());
    }

    #[test]
    fn test_record_key_of() {
        let record = enrollment("1", "C1", "S", "2021");
        let key = RecordKey::of(EntityKind::Enrollment, &record);
        assert_eq!(key.to_string(), "1/C1/S/2021");
    }

    #[test]
    fn test_retain_counts_removed() {
        let mut table = Table::with_rows(
            EntityKind::Enrollment,
            vec![
                enrollment("1", "C1", "S", "2021"),
                enrollment("2", "C1", "S", "2021"),
                enrollment("1", "C2", "S", "2021"),
            ],
        );
        let removed = table.retain(|r| r.get("StudentID") != "1");
        assert_eq!(removed, 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_load_required_missing_table() {
        let backend = MemoryBackend::new();
        let err = load_required(&backend, EntityKind::Course).unwrap_err();
        assert!(matches!(
            err,
            CampusDbError::StorageUnavailable { table: EntityKind::Course, .. }
        ));
        assert!(load_or_empty(&backend, EntityKind::Course).unwrap().is_empty());
    }
}
