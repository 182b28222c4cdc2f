// Referential integrity - cascading key renames and deletes into dependent tables

use crate::error::{CampusDbError, Result};
use crate::schema::EntityKind;
use crate::table::{load_or_empty, Record, RecordKey, TableBackend};
use crate::validation;

/// Rewrite `field` from `old` to `new` in every row of `dependent`.
/// Returns the number of rows changed. The table is only rewritten when something changed.
pub fn cascade_rename(
    backend: &dyn TableBackend,
    dependent: EntityKind,
    field: &str,
    old: &str,
    new: &str,
) -> Result<usize> {
    let Some(mut table) = backend.load(dependent)? else {
        return Ok(0);
    };

    let mut changed = 0;
    for row in table.rows_mut() {
        if row.get(field) == old {
            row.set(field, new);
            changed += 1;
        }
    }

    if changed > 0 {
        backend.save(&table)?;
        log::info!(
            "Renamed {field} {old} -> {new} in {changed} {dependent} row(s)"
        );
    }
    Ok(changed)
}

/// Fail if renaming `field` from `old` to `new` in `dependent` would give a row
/// the same primary key as another row. Nothing is written.
pub fn check_rename(
    backend: &dyn TableBackend,
    dependent: EntityKind,
    field: &str,
    old: &str,
    new: &str,
) -> Result<()> {
    let Some(mut table) = backend.load(dependent)? else {
        return Ok(());
    };

    let mut renamed = Vec::new();
    for (i, row) in table.rows_mut().iter_mut().enumerate() {
        if row.get(field) == old {
            row.set(field, new);
            renamed.push(i);
        }
    }

    for &i in &renamed {
        let key = RecordKey::of(dependent, &table.rows()[i]);
        validation::unique_key(&table, &key, &[i])?;
    }
    Ok(())
}

/// Remove every row of `dependent` whose `field` equals `value`.
/// Returns the number of rows removed.
pub fn cascade_delete(
    backend: &dyn TableBackend,
    dependent: EntityKind,
    field: &str,
    value: &str,
) -> Result<usize> {
    let Some(mut table) = backend.load(dependent)? else {
        return Ok(0);
    };

    let removed = table.retain(|r| r.get(field) != value);
    if removed > 0 {
        backend.save(&table)?;
        log::info!("Deleted {removed} {dependent} row(s) with {field} = {value}");
    }
    Ok(removed)
}

/// Check that every hard reference held by `record` points at an existing parent row.
pub fn check_references(
    backend: &dyn TableBackend,
    kind: EntityKind,
    record: &Record,
) -> Result<()> {
    for parent in EntityKind::ALL {
        for dep in parent.dependents().iter().filter(|d| d.dependent == kind) {
            let value = record.get(dep.dependent_field);
            let parents = load_or_empty(backend, parent)?;
            if parents.where_eq(dep.parent_field, value).next().is_none() {
                return Err(CampusDbError::DanglingReference {
                    field: dep.dependent_field.to_string(),
                    value: value.to_string(),
                    target: parent,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{MemoryBackend, Table};
    use pretty_assertions::assert_eq;

    fn enrollment(student: &str, course: &str) -> Record {
        Record::from_raw(
            EntityKind::Enrollment,
            [
                ("StudentID", student),
                ("CourseID", course),
                ("Semester", "الفصل الثاني"),
                ("Year", "2021"),
                ("Grade", "70"),
            ],
        )
    }

    fn backend() -> MemoryBackend {
        MemoryBackend::new().with_table(Table::with_rows(
            EntityKind::Enrollment,
            vec![
                enrollment("20259432", "C4996"),
                enrollment("20259432", "C0001"),
                enrollment("20250001", "C4996"),
            ],
        ))
    }

    fn column(backend: &MemoryBackend, field: &str) -> Vec<String> {
        backend
            .table(EntityKind::Enrollment)
            .unwrap()
            .rows()
            .iter()
            .map(|r| r.get(field).to_string())
            .collect()
    }

    #[test]
    fn test_cascade_rename() {
        let backend = backend();
        let n = cascade_rename(&backend, EntityKind::Enrollment, "StudentID", "20259432", "12345698")
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(column(&backend, "StudentID"), vec!["12345698", "12345698", "20250001"]);
    }

    #[test]
    fn test_cascade_delete() {
        let backend = backend();
        let n = cascade_delete(&backend, EntityKind::Enrollment, "CourseID", "C4996").unwrap();
        assert_eq!(n, 2);
        assert_eq!(column(&backend, "CourseID"), vec!["C0001"]);
    }

    #[test]
    fn test_cascade_missing_dependent_table() {
        let backend = MemoryBackend::new();
        assert_eq!(
            cascade_delete(&backend, EntityKind::Enrollment, "CourseID", "C1").unwrap(),
            0
        );
        assert_eq!(
            cascade_rename(&backend, EntityKind::Enrollment, "CourseID", "C1", "C2").unwrap(),
            0
        );
        assert!(backend.table(EntityKind::Enrollment).is_none());
    }

    #[test]
    fn test_check_rename_detects_key_collision() {
        let backend = backend();
        // 20250001 already has C4996 in the same term
        let err = check_rename(&backend, EntityKind::Enrollment, "StudentID", "20259432", "20250001")
            .unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(crate::error::ValidationError::DuplicateKey { .. })
        ));
        assert!(check_rename(&backend, EntityKind::Enrollment, "StudentID", "20259432", "20250002").is_ok());
        assert!(check_rename(&MemoryBackend::new(), EntityKind::Enrollment, "StudentID", "1", "2").is_ok());
        assert_eq!(column(&backend, "StudentID"), vec!["20259432", "20259432", "20250001"]);
    }

    #[test]
    fn test_check_references() {
        let backend = MemoryBackend::new()
            .with_table(Table::with_rows(
                EntityKind::Student,
                vec![Record::from_raw(EntityKind::Student, [("StudentID", "20259432")])],
            ))
            .with_table(Table::with_rows(
                EntityKind::Course,
                vec![Record::from_raw(EntityKind::Course, [("CourseID", "C4996")])],
            ));

        assert!(check_references(&backend, EntityKind::Enrollment, &enrollment("20259432", "C4996")).is_ok());

        let err = check_references(&backend, EntityKind::Enrollment, &enrollment("S4", "C4996"))
            .unwrap_err();
        assert!(matches!(
            err,
            CampusDbError::DanglingReference { target: EntityKind::Student, .. }
        ));

        // Kinds without hard references always pass
        assert!(check_references(&backend, EntityKind::Course, &Record::new()).is_ok());
    }
}
