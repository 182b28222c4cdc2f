// Read-only lookups, filters and aggregates over whole tables

use crate::error::{Result, ValidationError};
use crate::schema::{canonicalize, EntityKind};
use crate::table::{load_required, Record, RecordKey, TableBackend};
use serde::Serialize;

/// Row count and location of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStatus {
    pub table: EntityKind,
    pub location: String,
    /// `None` when the table has never been written.
    pub rows: Option<usize>,
}

/// Read-only access to the store. A missing table is an error; an empty result is not.
pub struct Query<'a> {
    backend: &'a dyn TableBackend,
}

impl<'a> Query<'a> {
    pub fn new(backend: &'a dyn TableBackend) -> Self {
        Query { backend }
    }

    pub fn all(&self, kind: EntityKind) -> Result<Vec<Record>> {
        Ok(load_required(self.backend, kind)?.rows().to_vec())
    }

    /// First row with the given primary key.
    pub fn find_by_key(&self, kind: EntityKind, key: &RecordKey) -> Result<Option<Record>> {
        let key = key.canonical(kind)?;
        let table = load_required(self.backend, kind)?;
        Ok(table.rows().iter().find(|r| key.matches(kind, r)).cloned())
    }

    pub fn filter_by_field(&self, kind: EntityKind, field: &str, value: &str) -> Result<Vec<Record>> {
        self.filter(kind, &[(field, value)])
    }

    /// Rows matching every `(field, value)` pair exactly.
    pub fn filter(&self, kind: EntityKind, filters: &[(&str, &str)]) -> Result<Vec<Record>> {
        let wanted = canonical_filters(kind, filters)?;
        let table = load_required(self.backend, kind)?;
        Ok(table
            .rows()
            .iter()
            .filter(|r| wanted.iter().all(|(f, v)| r.get(f) == v))
            .cloned()
            .collect())
    }

    /// The values of `field` over the rows matching `filters`.
    pub fn project_field(
        &self,
        kind: EntityKind,
        filters: &[(&str, &str)],
        field: &str,
    ) -> Result<Vec<String>> {
        if kind.column(field).is_none() {
            return Err(ValidationError::UnknownField(field.to_string()).into());
        }
        Ok(self
            .filter(kind, filters)?
            .iter()
            .map(|r| r.get(field).to_string())
            .collect())
    }

    /// Arithmetic mean of `field` over the rows matching `filters`.
    ///
    /// `None` means no row matched. Non-numeric cells are skipped, but if rows
    /// matched and none of them is numeric the result is `InvalidValue`.
    pub fn average_of(
        &self,
        kind: EntityKind,
        field: &str,
        filters: &[(&str, &str)],
    ) -> Result<Option<f64>> {
        let values = self.project_field(kind, filters, field)?;
        let mut sum = 0.0;
        let mut count = 0usize;
        for value in &values {
            match value.parse::<f64>() {
                Ok(n) => {
                    sum += n;
                    count += 1;
                }
                Err(_) => log::warn!("Skipping non-numeric {field} '{value}' in {kind}"),
            }
        }
        match values.first() {
            None => Ok(None),
            Some(value) if count == 0 => Err(ValidationError::InvalidValue {
                field: field.to_string(),
                value: value.clone(),
                expected: "number",
            }
            .into()),
            Some(_) => Ok(Some(sum / count as f64)),
        }
    }

    pub fn student(&self, student_id: impl ToString) -> Result<Option<Record>> {
        self.find_by_key(EntityKind::Student, &RecordKey::id(student_id))
    }

    pub fn instructor(&self, instructor_id: impl ToString) -> Result<Option<Record>> {
        self.find_by_key(EntityKind::Instructor, &RecordKey::id(instructor_id))
    }

    pub fn courses_by_department(&self, department: &str) -> Result<Vec<Record>> {
        self.filter_by_field(EntityKind::Course, "Department", department)
    }

    /// Student IDs enrolled in a course, one per enrollment row.
    pub fn students_in_course(&self, course_id: &str) -> Result<Vec<String>> {
        self.project_field(EntityKind::Enrollment, &[("CourseID", course_id)], "StudentID")
    }

    pub fn enrollments_for_student(&self, student_id: &str) -> Result<Vec<Record>> {
        self.filter_by_field(EntityKind::Enrollment, "StudentID", student_id)
    }

    pub fn average_grade(&self, course_id: &str, semester: &str) -> Result<Option<f64>> {
        self.average_of(
            EntityKind::Enrollment,
            "Grade",
            &[("CourseID", course_id), ("Semester", semester)],
        )
    }

    pub fn status(&self) -> Result<Vec<TableStatus>> {
        EntityKind::ALL
            .iter()
            .map(|&kind| {
                Ok(TableStatus {
                    table: kind,
                    location: self.backend.location(kind),
                    rows: self.backend.load(kind)?.map(|t| t.len()),
                })
            })
            .collect()
    }
}

fn canonical_filters(kind: EntityKind, filters: &[(&str, &str)]) -> Result<Vec<(String, String)>> {
    filters
        .iter()
        .map(|(field, value)| {
            let column = kind
                .column(field)
                .ok_or_else(|| ValidationError::UnknownField(field.to_string()))?;
            Ok((field.to_string(), canonicalize(column.column_type, value)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CampusDbError;
    use crate::table::{MemoryBackend, Table};
    use pretty_assertions::assert_eq;

    const FIRST: &str = "الفصل الأول";
    const SECOND: &str = "الفصل الثاني";

    fn enrollment(student: &str, course: &str, semester: &str, grade: &str) -> Record {
        Record::from_raw(
            EntityKind::Enrollment,
            [
                ("StudentID", student),
                ("CourseID", course),
                ("Semester", semester),
                ("Year", "2022"),
                ("Grade", grade),
            ],
        )
    }

    fn course(id: &str, department: &str) -> Record {
        Record::from_raw(
            EntityKind::Course,
            [
                ("CourseID", id),
                ("CourseName", "فيزياء"),
                ("Credits", "3"),
                ("Department", department),
            ],
        )
    }

    fn backend() -> MemoryBackend {
        MemoryBackend::new()
            .with_table(Table::with_rows(
                EntityKind::Enrollment,
                vec![
                    enrollment("20250001", "C0004", SECOND, "80"),
                    enrollment("20250002", "C0004", SECOND, "91"),
                    enrollment("20250003", "C0004", FIRST, "50"),
                    enrollment("20250001", "C0005", SECOND, "60"),
                ],
            ))
            .with_table(Table::with_rows(
                EntityKind::Course,
                vec![
                    course("C0004", "كلية الهندسة"),
                    course("C0005", "كلية العلوم"),
                    course("C0006", "كلية الهندسة"),
                ],
            ))
    }

    #[test]
    fn test_average_grade() {
        let backend = backend();
        let query = Query::new(&backend);
        assert_eq!(query.average_grade("C0004", SECOND).unwrap(), Some(85.5));
        assert_eq!(query.average_grade("C0004", FIRST).unwrap(), Some(50.0));
    }

    #[test]
    fn test_average_no_data_is_none() {
        let backend = backend();
        let query = Query::new(&backend);
        assert_eq!(query.average_grade("C9999", SECOND).unwrap(), None);
    }

    #[test]
    fn test_average_of_non_numeric_field_is_error() {
        let backend = backend();
        let query = Query::new(&backend);
        let err = query
            .average_of(EntityKind::Course, "CourseName", &[("Department", "كلية العلوم")])
            .unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::InvalidValue { expected: "number", .. })
        ));
        assert_eq!(
            query
                .average_of(EntityKind::Course, "CourseName", &[("Department", "كلية الطب")])
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_missing_table_is_error_not_empty() {
        let backend = MemoryBackend::new();
        let query = Query::new(&backend);
        let err = query.average_grade("C0004", SECOND).unwrap_err();
        assert!(matches!(err, CampusDbError::StorageUnavailable { .. }));
    }

    #[test]
    fn test_students_in_course() {
        let backend = backend();
        let query = Query::new(&backend);
        assert_eq!(
            query.students_in_course("C0004").unwrap(),
            vec!["20250001", "20250002", "20250003"]
        );
        assert!(query.students_in_course("C0404").unwrap().is_empty());
    }

    #[test]
    fn test_courses_by_department() {
        let backend = backend();
        let query = Query::new(&backend);
        let courses = query.courses_by_department("كلية الهندسة").unwrap();
        let ids: Vec<_> = courses.iter().map(|c| c.get("CourseID")).collect();
        assert_eq!(ids, vec!["C0004", "C0006"]);
    }

    #[test]
    fn test_filter_canonicalizes_numeric_values() {
        let backend = backend();
        let query = Query::new(&backend);
        let rows = query
            .filter(EntityKind::Enrollment, &[("StudentID", "20250001.0"), ("Year", "2022")])
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_filter_unknown_field() {
        let backend = backend();
        let query = Query::new(&backend);
        assert!(query.filter_by_field(EntityKind::Course, "Room", "B1").is_err());
    }

    #[test]
    fn test_find_by_key() {
        let backend = backend();
        let query = Query::new(&backend);
        let found = query
            .find_by_key(EntityKind::Course, &RecordKey::id("C0005"))
            .unwrap()
            .unwrap();
        assert_eq!(found.get("Department"), "كلية العلوم");
        assert!(query
            .find_by_key(EntityKind::Course, &RecordKey::id("C1"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_status() {
        let backend = backend();
        let status = Query::new(&backend).status().unwrap();
        assert_eq!(status.len(), 5);
        let course = status.iter().find(|s| s.table == EntityKind::Course).unwrap();
        assert_eq!(course.rows, Some(3));
        let student = status.iter().find(|s| s.table == EntityKind::Student).unwrap();
        assert_eq!(student.rows, None);
    }
}
