use crate::error::ValidationError;
use crate::schema::{ColumnType, EntityKind};
use crate::table::{Record, RecordKey, Table};
use chrono::{Duration, NaiveDate};

pub const CREDITS_MIN: i64 = 1;
pub const CREDITS_MAX: i64 = 4;
pub const GRADE_MIN: i64 = 0;
pub const GRADE_MAX: i64 = 100;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inputs to the checks that depend on more than the record itself.
#[derive(Debug, Clone, Copy)]
pub struct Rules {
    pub min_student_age: u32,
    /// The date ages are measured against.
    pub today: NaiveDate,
}

impl Rules {
    pub fn new(min_student_age: u32, today: NaiveDate) -> Self {
        Rules {
            min_student_age,
            today,
        }
    }
}

/// Fail on the first named field that is absent or empty.
pub fn not_null(record: &Record, fields: &[&str]) -> Result<(), ValidationError> {
    match fields.iter().find(|f| !record.has(f)) {
        Some(field) => Err(ValidationError::MissingField(field.to_string())),
        None => Ok(()),
    }
}

/// Fail if any row other than those in `exclude` already holds `value` in `field`.
pub fn unique(
    table: &Table,
    field: &str,
    value: &str,
    exclude: &[usize],
) -> Result<(), ValidationError> {
    let taken = table
        .rows()
        .iter()
        .enumerate()
        .any(|(i, r)| !exclude.contains(&i) && r.get(field) == value);
    if taken {
        return Err(ValidationError::DuplicateKey {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Primary key uniqueness, composite keys included.
pub fn unique_key(table: &Table, key: &RecordKey, exclude: &[usize]) -> Result<(), ValidationError> {
    let kind = table.kind();
    let taken = table
        .rows()
        .iter()
        .enumerate()
        .any(|(i, r)| !exclude.contains(&i) && key.matches(kind, r));
    if taken {
        return Err(ValidationError::DuplicateKey {
            field: kind.key_columns().join("+"),
            value: key.to_string(),
        });
    }
    Ok(())
}

pub fn credits_range(credits: i64) -> Result<(), ValidationError> {
    in_range("Credits", credits, CREDITS_MIN, CREDITS_MAX)
}

pub fn grade_range(grade: i64) -> Result<(), ValidationError> {
    in_range("Grade", grade, GRADE_MIN, GRADE_MAX)
}

fn in_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        })
    }
}

/// The date of birth must be at least `min_years` before `today`.
///
/// A year is taken as 365 days, so the cutoff drifts by a few days across leap years.
pub fn minimum_age(dob: &str, min_years: u32, today: NaiveDate) -> Result<(), ValidationError> {
    let born = parse_date("DateOfBirth", dob)?;
    let cutoff = today
        .checked_sub_signed(Duration::days(365 * i64::from(min_years)))
        .unwrap_or(NaiveDate::MIN);
    if born > cutoff {
        return Err(ValidationError::AgeTooLow {
            dob: dob.to_string(),
            min_years,
        });
    }
    Ok(())
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: "date (YYYY-MM-DD)",
    })
}

pub fn parse_integer(field: &str, value: &str) -> Result<i64, ValidationError> {
    value.parse().map_err(|_| ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: "integer",
    })
}

/// Reject field names that are not columns of `kind`.
pub fn known_fields<'a>(
    kind: EntityKind,
    fields: impl IntoIterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    for field in fields {
        if kind.column(field).is_none() {
            return Err(ValidationError::UnknownField(field.to_string()));
        }
    }
    Ok(())
}

/// Run every record-local check for `kind`: required fields, column types, ranges, age.
/// Uniqueness needs the table and is checked separately.
pub fn validate_record(kind: EntityKind, record: &Record, rules: &Rules) -> Result<(), ValidationError> {
    known_fields(kind, record.fields().map(|(k, _)| k))?;
    not_null(record, kind.required_columns())?;

    for column in kind.columns() {
        let value = record.get(column.name);
        if value.is_empty() {
            continue;
        }
        match column.column_type {
            ColumnType::Integer => {
                parse_integer(column.name, value)?;
            }
            ColumnType::Date => {
                parse_date(column.name, value)?;
            }
            ColumnType::Text | ColumnType::Id => {}
        }
    }

    match kind {
        EntityKind::Course => {
            credits_range(parse_integer("Credits", record.get("Credits"))?)?;
        }
        EntityKind::Enrollment => {
            grade_range(parse_integer("Grade", record.get("Grade"))?)?;
        }
        EntityKind::Student => {
            minimum_age(record.get("DateOfBirth"), rules.min_student_age, rules.today)?;
        }
        EntityKind::Department | EntityKind::Instructor => {}
    }

    Ok(())
}
