use crate::config::StoreConfig;
use crate::entity::{self, Course, Department, Enrollment, Entity, Instructor, Student};
use crate::error::{CampusDbError, Result};
use crate::generator::{self, Dataset, GeneratorOptions};
use crate::integrity;
use crate::query::Query;
use crate::schema::EntityKind;
use crate::table::{load_or_empty, load_required, CsvBackend, Record, RecordKey, Table, TableBackend};
use crate::validation::{self, Rules};
use rand::Rng;
use serde::Serialize;
use std::path::Path;

/// Result of an update. `NotFound` is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Updated { records: Vec<Record> },
    NotFound,
}

/// Result of a delete. `NotFound` is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// `removed` rows left the table; `cascaded` dependent rows went with them.
    Deleted { removed: usize, cascaded: usize },
    NotFound,
}

/// The record engine.
///
/// Every operation loads the tables it touches fresh from the backend, validates,
/// and writes whole tables back. Dependent tables are written before the primary
/// table, so an interrupted operation can only leave orphans removed or renamed
/// early, never dangling.
pub struct Engine<B: TableBackend> {
    backend: B,
    config: StoreConfig,
}

/// An engine over a directory of CSV files.
pub type Store = Engine<CsvBackend>;

impl Engine<CsvBackend> {
    /// Open a data directory. Reads campusdb.yaml when present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref();
        if !root.is_dir() {
            return Err(CampusDbError::Other(format!(
                "Data directory does not exist: {}",
                root.display()
            )));
        }
        let config = StoreConfig::load(root)?;
        Ok(Engine::new(CsvBackend::new(root, &config), config))
    }
}

impl<B: TableBackend> Engine<B> {
    pub fn new(backend: B, config: StoreConfig) -> Self {
        Engine { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn query(&self) -> Query<'_> {
        Query::new(&self.backend)
    }

    /// Validation rules as of now (or the configured reference date).
    pub fn rules(&self) -> Rules {
        let today = self
            .config
            .reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        Rules::new(self.config.min_student_age, today)
    }

    // ── Dynamic API ────────────────────────────────────────────────

    /// Validate and append a record. Nothing is written if any check fails.
    pub fn add(&self, kind: EntityKind, payload: &serde_json::Value) -> Result<Record> {
        let record = entity::to_record(kind, payload)?;
        validation::validate_record(kind, &record, &self.rules())?;

        let mut table = load_or_empty(&self.backend, kind)?;
        check_unique(&table, &record, &[])?;
        if self.config.strict_references {
            integrity::check_references(&self.backend, kind, &record)?;
        }

        table.push(record.clone());
        self.backend.save(&table)?;

        log::info!("Added {kind} {}", RecordKey::of(kind, &record));
        Ok(record)
    }

    /// Overwrite the fields named in `payload` on every row matching `key`.
    ///
    /// A changed primary key is renamed in dependent tables first.
    pub fn update(
        &self,
        kind: EntityKind,
        key: &RecordKey,
        payload: &serde_json::Value,
    ) -> Result<UpdateOutcome> {
        let key = key.canonical(kind)?;
        let patch = entity::to_patch(kind, payload)?;
        let mut table = load_required(&self.backend, kind)?;

        let positions = table.positions(&key);
        if positions.is_empty() {
            log::info!("Update of {kind} {key}: no matching record");
            return Ok(UpdateOutcome::NotFound);
        }

        let rules = self.rules();
        let mut updated = Vec::with_capacity(positions.len());
        for &i in &positions {
            let mut merged = table.rows()[i].clone();
            merged.merge(&patch);
            validation::validate_record(kind, &merged, &rules)?;
            check_unique(&table, &merged, &positions)?;
            if self.config.strict_references {
                integrity::check_references(&self.backend, kind, &merged)?;
            }
            updated.push(merged);
        }

        let original = &table.rows()[positions[0]];
        let renames: Vec<_> = kind
            .dependents()
            .iter()
            .filter_map(|dep| {
                let old = original.get(dep.parent_field);
                let new = updated[0].get(dep.parent_field);
                (old != new).then(|| (*dep, old.to_string(), new.to_string()))
            })
            .collect();
        for (dep, old, new) in &renames {
            integrity::check_rename(&self.backend, dep.dependent, dep.dependent_field, old, new)?;
        }

        let mut touched = None;
        for (dep, old, new) in &renames {
            let changed = integrity::cascade_rename(
                &self.backend,
                dep.dependent,
                dep.dependent_field,
                old,
                new,
            )
            .map_err(|e| CampusDbError::CascadeFailed {
                parent: kind,
                dependent: dep.dependent,
                source: Box::new(e),
            })?;
            if changed > 0 {
                touched = Some(dep.dependent);
            }
        }

        for (&i, merged) in positions.iter().zip(&updated) {
            table.rows_mut()[i] = merged.clone();
        }
        self.save_primary(&table, touched)?;

        log::info!("Updated {} {kind} row(s) matching {key}", updated.len());
        Ok(UpdateOutcome::Updated { records: updated })
    }

    /// Remove every row matching `key`, and the dependent rows referencing it.
    pub fn delete(&self, kind: EntityKind, key: &RecordKey) -> Result<DeleteOutcome> {
        let key = key.canonical(kind)?;
        let mut table = load_required(&self.backend, kind)?;

        let positions = table.positions(&key);
        if positions.is_empty() {
            log::info!("Delete of {kind} {key}: no matching record");
            return Ok(DeleteOutcome::NotFound);
        }

        let mut cascaded = 0;
        let mut touched = None;
        for dep in kind.dependents() {
            let value = table.rows()[positions[0]].get(dep.parent_field).to_string();
            let removed = integrity::cascade_delete(
                &self.backend,
                dep.dependent,
                dep.dependent_field,
                &value,
            )
            .map_err(|e| CampusDbError::CascadeFailed {
                parent: kind,
                dependent: dep.dependent,
                source: Box::new(e),
            })?;
            if removed > 0 {
                cascaded += removed;
                touched = Some(dep.dependent);
            }
        }

        let removed = table.retain(|r| !key.matches(kind, r));
        self.save_primary(&table, touched)?;

        log::info!("Deleted {removed} {kind} row(s) matching {key}, {cascaded} dependent row(s)");
        Ok(DeleteOutcome::Deleted { removed, cascaded })
    }

    /// Write the primary table. If a dependent was already rewritten, a failure here
    /// leaves the tables out of step and is reported as such.
    fn save_primary(&self, table: &Table, touched: Option<EntityKind>) -> Result<()> {
        match (self.backend.save(table), touched) {
            (Ok(()), _) => Ok(()),
            (Err(e), Some(dependent)) => {
                log::warn!("{dependent} already rewritten but saving {} failed: {e}", table.kind());
                Err(CampusDbError::PrimaryWriteFailed {
                    parent: table.kind(),
                    dependent,
                    source: Box::new(e),
                })
            }
            (Err(e), None) => Err(e),
        }
    }

    // ── Typed API ──────────────────────────────────────────────────

    pub fn insert<T: Entity>(&self, entity: &T) -> Result<T> {
        let record = self.add(T::KIND, &entity.to_payload()?)?;
        T::from_record(&record)
    }

    pub fn replace<T: Entity>(&self, key: impl Into<RecordKey>, entity: &T) -> Result<UpdateOutcome> {
        self.update(T::KIND, &key.into(), &entity.to_payload()?)
    }

    pub fn remove<T: Entity>(&self, key: impl Into<RecordKey>) -> Result<DeleteOutcome> {
        self.delete(T::KIND, &key.into())
    }

    /// Generate a synthetic data set and write all five tables, replacing their contents.
    pub fn populate<R: Rng>(&self, options: &GeneratorOptions, rng: &mut R) -> Result<Dataset> {
        let dataset = generator::generate(options, &self.rules(), rng);
        dataset.write(&self.backend)?;
        Ok(dataset)
    }
}

macro_rules! entity_operations {
    ($($entity:ident => $add:ident, $update:ident, $delete:ident;)*) => {
        impl<B: TableBackend> Engine<B> {
            $(
                #[doc = concat!("Add a ", stringify!($entity), ".")]
                pub fn $add(&self, entity: &$entity) -> Result<$entity> {
                    self.insert(entity)
                }

                #[doc = concat!("Update the ", stringify!($entity), " stored under `key`.")]
                pub fn $update(&self, key: impl Into<RecordKey>, entity: &$entity) -> Result<UpdateOutcome> {
                    self.replace(key, entity)
                }

                #[doc = concat!("Delete the ", stringify!($entity), " stored under `key`.")]
                pub fn $delete(&self, key: impl Into<RecordKey>) -> Result<DeleteOutcome> {
                    self.remove::<$entity>(key)
                }
            )*
        }
    };
}

entity_operations! {
    Department => add_department, update_department, delete_department;
    Student => add_student, update_student, delete_student;
    Course => add_course, update_course, delete_course;
    Instructor => add_instructor, update_instructor, delete_instructor;
    Enrollment => add_enrollment, update_enrollment, delete_enrollment;
}

/// Primary key and unique-column checks against every row not in `exclude`.
fn check_unique(table: &Table, record: &Record, exclude: &[usize]) -> Result<()> {
    let kind = table.kind();
    validation::unique_key(table, &RecordKey::of(kind, record), exclude)?;
    for column in kind.unique_columns() {
        validation::unique(table, column, record.get(column), exclude)?;
    }
    Ok(())
}
