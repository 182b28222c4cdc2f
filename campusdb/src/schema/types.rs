use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five tables of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Department,
    Student,
    Course,
    Instructor,
    Enrollment,
}

/// How a column's raw text is canonicalized and checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Free text, stored verbatim (after trimming).
    Text,
    /// Identifier. May be numeric or alphanumeric; `2025.0` and `2025` are the same key.
    Id,
    Integer,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
}

/// A hard reference from a parent key into a dependent table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub parent_field: &'static str,
    pub dependent: EntityKind,
    pub dependent_field: &'static str,
}

const fn col(name: &'static str, column_type: ColumnType) -> ColumnDef {
    ColumnDef { name, column_type }
}

const DEPARTMENT_COLUMNS: &[ColumnDef] = &[
    col("DepartmentID", ColumnType::Id),
    col("DepartmentName", ColumnType::Text),
];

const STUDENT_COLUMNS: &[ColumnDef] = &[
    col("StudentID", ColumnType::Id),
    col("FirstName", ColumnType::Text),
    col("LastName", ColumnType::Text),
    col("DateOfBirth", ColumnType::Date),
    col("Major", ColumnType::Text),
    col("Address", ColumnType::Text),
    col("Phone", ColumnType::Text),
];

const COURSE_COLUMNS: &[ColumnDef] = &[
    col("CourseID", ColumnType::Id),
    col("CourseName", ColumnType::Text),
    col("Credits", ColumnType::Integer),
    col("Department", ColumnType::Text),
];

const INSTRUCTOR_COLUMNS: &[ColumnDef] = &[
    col("InstructorID", ColumnType::Id),
    col("FirstName", ColumnType::Text),
    col("LastName", ColumnType::Text),
    col("Department", ColumnType::Text),
    col("Rank", ColumnType::Text),
    col("Email", ColumnType::Text),
];

const ENROLLMENT_COLUMNS: &[ColumnDef] = &[
    col("StudentID", ColumnType::Id),
    col("CourseID", ColumnType::Id),
    col("Semester", ColumnType::Text),
    col("Year", ColumnType::Integer),
    col("Grade", ColumnType::Integer),
];

const STUDENT_DEPENDENTS: &[Dependency] = &[Dependency {
    parent_field: "StudentID",
    dependent: EntityKind::Enrollment,
    dependent_field: "StudentID",
}];

const COURSE_DEPENDENTS: &[Dependency] = &[Dependency {
    parent_field: "CourseID",
    dependent: EntityKind::Enrollment,
    dependent_field: "CourseID",
}];

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Department,
        EntityKind::Student,
        EntityKind::Course,
        EntityKind::Instructor,
        EntityKind::Enrollment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Department => "Department",
            EntityKind::Student => "Student",
            EntityKind::Course => "Course",
            EntityKind::Instructor => "Instructor",
            EntityKind::Enrollment => "Enrollment",
        }
    }

    /// Columns in on-disk header order.
    pub fn columns(self) -> &'static [ColumnDef] {
        match self {
            EntityKind::Department => DEPARTMENT_COLUMNS,
            EntityKind::Student => STUDENT_COLUMNS,
            EntityKind::Course => COURSE_COLUMNS,
            EntityKind::Instructor => INSTRUCTOR_COLUMNS,
            EntityKind::Enrollment => ENROLLMENT_COLUMNS,
        }
    }

    pub fn column(self, name: &str) -> Option<&'static ColumnDef> {
        self.columns().iter().find(|c| c.name == name)
    }

    pub fn column_names(self) -> impl Iterator<Item = &'static str> {
        self.columns().iter().map(|c| c.name)
    }

    /// Primary key columns. Enrollment is keyed on a 4-tuple.
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            EntityKind::Department => &["DepartmentID"],
            EntityKind::Student => &["StudentID"],
            EntityKind::Course => &["CourseID"],
            EntityKind::Instructor => &["InstructorID"],
            EntityKind::Enrollment => &["StudentID", "CourseID", "Semester", "Year"],
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            EntityKind::Department => &["DepartmentID", "DepartmentName"],
            EntityKind::Student => &["StudentID", "FirstName", "LastName", "DateOfBirth", "Major"],
            EntityKind::Course => &["CourseID", "CourseName", "Credits", "Department"],
            EntityKind::Instructor => &[
                "InstructorID",
                "FirstName",
                "LastName",
                "Department",
                "Email",
            ],
            EntityKind::Enrollment => &["StudentID", "CourseID", "Semester", "Year", "Grade"],
        }
    }

    /// Non-key columns whose values must be unique across the table.
    pub fn unique_columns(self) -> &'static [&'static str] {
        match self {
            EntityKind::Instructor => &["Email"],
            _ => &[],
        }
    }

    /// Tables holding hard references to this one.
    pub fn dependents(self) -> &'static [Dependency] {
        match self {
            EntityKind::Student => STUDENT_DEPENDENTS,
            EntityKind::Course => COURSE_DEPENDENTS,
            _ => &[],
        }
    }

    pub fn default_file_name(self) -> &'static str {
        match self {
            EntityKind::Department => "Department.csv",
            EntityKind::Student => "Student.csv",
            EntityKind::Course => "Course.csv",
            EntityKind::Instructor => "Instructor.csv",
            EntityKind::Enrollment => "Enrollment.csv",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "department" | "departments" => Ok(EntityKind::Department),
            "student" | "students" => Ok(EntityKind::Student),
            "course" | "courses" => Ok(EntityKind::Course),
            "instructor" | "instructors" => Ok(EntityKind::Instructor),
            "enrollment" | "enrollments" => Ok(EntityKind::Enrollment),
            other => Err(format!("Unknown table '{other}'")),
        }
    }
}
