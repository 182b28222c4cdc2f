mod types;

pub use types::{ColumnDef, ColumnType, Dependency, EntityKind};

/// Canonicalize a raw cell or payload value for a column.
///
/// This is the only place identifier and integer text is normalized, so a `Year`
/// written as `2023.0` by one tool and `2023` by another compare equal everywhere.
pub fn canonicalize(column_type: ColumnType, raw: &str) -> String {
    let trimmed = raw.trim();
    match column_type {
        ColumnType::Id | ColumnType::Integer => integral_literal(trimmed)
            .unwrap_or_else(|| trimmed.to_string()),
        ColumnType::Text | ColumnType::Date => trimmed.to_string(),
    }
}

/// `"2023.0"` -> `Some("2023")`. Plain integers and non-numeric text return `None`.
fn integral_literal(s: &str) -> Option<String> {
    if !s.contains('.') {
        return None;
    }
    let f: f64 = s.parse().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(format!("{}", f as i64))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_integer() {
        assert_eq!(canonicalize(ColumnType::Integer, "2023.0"), "2023");
        assert_eq!(canonicalize(ColumnType::Integer, " 85 "), "85");
        assert_eq!(canonicalize(ColumnType::Id, "20250040.0"), "20250040");
        assert_eq!(canonicalize(ColumnType::Id, "C0004"), "C0004");
    }

    #[test]
    fn test_canonical_keeps_non_integral() {
        assert_eq!(canonicalize(ColumnType::Integer, "85.5"), "85.5");
        assert_eq!(canonicalize(ColumnType::Id, "1.2.3"), "1.2.3");
    }

    #[test]
    fn test_text_not_rewritten() {
        assert_eq!(canonicalize(ColumnType::Text, "0912345678"), "0912345678");
        assert_eq!(canonicalize(ColumnType::Text, "3.0"), "3.0");
    }

    #[test]
    fn test_entity_kind_parse() {
        assert_eq!("students".parse::<EntityKind>().unwrap(), EntityKind::Student);
        assert_eq!("Enrollment".parse::<EntityKind>().unwrap(), EntityKind::Enrollment);
        assert!("grades".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_key_columns_are_declared() {
        for kind in EntityKind::ALL {
            for key in kind.key_columns() {
                assert!(kind.column(key).is_some(), "{kind}.{key}");
            }
            for req in kind.required_columns() {
                assert!(kind.column(req).is_some(), "{kind}.{req}");
            }
        }
    }

    #[test]
    fn test_dependents() {
        assert_eq!(EntityKind::Student.dependents()[0].dependent, EntityKind::Enrollment);
        assert_eq!(EntityKind::Course.dependents()[0].dependent_field, "CourseID");
        assert!(EntityKind::Instructor.dependents().is_empty());
    }
}
