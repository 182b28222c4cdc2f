// Typed entities and payload conversion

use crate::error::{Result, ValidationError};
use crate::schema::{canonicalize, ColumnType, EntityKind};
use crate::table::{Record, RecordKey};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A typed row. Field names serialize to the on-disk column names.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn key(&self) -> RecordKey;

    fn to_payload(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(serde_json::from_value(typed_json(Self::KIND, record))?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    #[serde(rename = "DepartmentID")]
    pub department_id: String,
    #[serde(rename = "DepartmentName")]
    pub department_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Student {
    #[serde(rename = "StudentID")]
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// Department name. Not enforced.
    pub major: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Course {
    #[serde(rename = "CourseID")]
    pub course_id: String,
    pub course_name: String,
    pub credits: i64,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instructor {
    #[serde(rename = "InstructorID")]
    pub instructor_id: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    #[serde(default)]
    pub rank: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Enrollment {
    #[serde(rename = "StudentID")]
    pub student_id: String,
    #[serde(rename = "CourseID")]
    pub course_id: String,
    pub semester: String,
    pub year: i64,
    pub grade: i64,
}

impl Entity for Department {
    const KIND: EntityKind = EntityKind::Department;

    fn key(&self) -> RecordKey {
        RecordKey::id(&self.department_id)
    }
}

impl Entity for Student {
    const KIND: EntityKind = EntityKind::Student;

    fn key(&self) -> RecordKey {
        RecordKey::id(&self.student_id)
    }
}

impl Entity for Course {
    const KIND: EntityKind = EntityKind::Course;

    fn key(&self) -> RecordKey {
        RecordKey::id(&self.course_id)
    }
}

impl Entity for Instructor {
    const KIND: EntityKind = EntityKind::Instructor;

    fn key(&self) -> RecordKey {
        RecordKey::id(&self.instructor_id)
    }
}

impl Entity for Enrollment {
    const KIND: EntityKind = EntityKind::Enrollment;

    fn key(&self) -> RecordKey {
        RecordKey::enrollment(&self.student_id, &self.course_id, &self.semester, self.year)
    }
}

/// Convert a JSON payload into a record holding only the fields it names.
///
/// Scalars become canonical text; `null` becomes empty. Unknown fields and
/// nested values are rejected.
pub fn to_patch(kind: EntityKind, payload: &serde_json::Value) -> Result<Record> {
    let obj = payload.as_object().ok_or_else(|| ValidationError::InvalidValue {
        field: kind.name().to_string(),
        value: payload.to_string(),
        expected: "object",
    })?;

    let mut record = Record::new();
    for (field, value) in obj {
        let column = kind
            .column(field)
            .ok_or_else(|| ValidationError::UnknownField(field.clone()))?;
        let raw = match value {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            other => {
                return Err(ValidationError::InvalidValue {
                    field: field.clone(),
                    value: other.to_string(),
                    expected: "scalar",
                }
                .into())
            }
        };
        record.set(field.as_str(), canonicalize(column.column_type, &raw));
    }
    Ok(record)
}

/// A full row for `kind`: every column present, missing ones empty.
pub fn to_record(kind: EntityKind, payload: &serde_json::Value) -> Result<Record> {
    let mut record = blank(kind);
    record.merge(&to_patch(kind, payload)?);
    Ok(record)
}

pub fn blank(kind: EntityKind) -> Record {
    let mut record = Record::new();
    for name in kind.column_names() {
        record.set(name, "");
    }
    record
}

/// JSON view of a record with integer columns as numbers, for typed deserialization.
fn typed_json(kind: EntityKind, record: &Record) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    for column in kind.columns() {
        let value = record.get(column.name);
        let json = match column.column_type {
            ColumnType::Integer => match value.parse::<i64>() {
                Ok(n) => serde_json::Value::from(n),
                Err(_) if value.is_empty() => serde_json::Value::Null,
                Err(_) => serde_json::Value::String(value.to_string()),
            },
            _ => serde_json::Value::String(value.to_string()),
        };
        obj.insert(column.name.to_string(), json);
    }
    serde_json::Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CampusDbError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_patch_canonicalizes_numbers() {
        let patch = to_patch(
            EntityKind::Enrollment,
            &json!({ "StudentID": 20250070, "Year": 2023.0, "Semester": "الفصل الأول" }),
        )
        .unwrap();
        assert_eq!(patch.get("StudentID"), "20250070");
        assert_eq!(patch.get("Year"), "2023");
        assert_eq!(patch.get("Semester"), "الفصل الأول");
        assert_eq!(patch.fields().count(), 3);
    }

    #[test]
    fn test_patch_rejects_unknown_and_nested() {
        let err = to_patch(EntityKind::Course, &json!({ "Room": "B1" })).unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::UnknownField(f)) if f == "Room"
        ));

        let err = to_patch(EntityKind::Course, &json!({ "CourseName": ["a"] })).unwrap_err();
        assert!(matches!(err, CampusDbError::Validation(ValidationError::InvalidValue { .. })));

        assert!(to_patch(EntityKind::Course, &json!("C1")).is_err());
    }

    #[test]
    fn test_to_record_fills_every_column() {
        let record = to_record(EntityKind::Department, &json!({ "DepartmentID": "D0001" })).unwrap();
        assert_eq!(record.fields().count(), 2);
        assert_eq!(record.get("DepartmentName"), "");
    }

    #[test]
    fn test_typed_round_trip() {
        let student = Student {
            student_id: "33".into(),
            first_name: "محمد".into(),
            last_name: "علي".into(),
            date_of_birth: NaiveDate::from_ymd_opt(2003, 5, 15).unwrap(),
            major: "كلية الهندسة".into(),
            address: "طرابلس".into(),
            phone: "0912345678".into(),
        };
        let record = to_record(EntityKind::Student, &student.to_payload().unwrap()).unwrap();
        assert_eq!(record.get("DateOfBirth"), "2003-05-15");
        assert_eq!(Student::from_record(&record).unwrap(), student);
    }

    #[test]
    fn test_enrollment_key() {
        let enrollment = Enrollment {
            student_id: "S4".into(),
            course_id: "C4".into(),
            semester: "الفصل الأول".into(),
            year: 2023,
            grade: 85,
        };
        assert_eq!(enrollment.key().to_string(), "S4/C4/الفصل الأول/2023");
        let record = to_record(EntityKind::Enrollment, &enrollment.to_payload().unwrap()).unwrap();
        assert_eq!(record.get("Grade"), "85");
        assert_eq!(Enrollment::from_record(&record).unwrap(), enrollment);
    }
}
