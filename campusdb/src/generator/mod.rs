// Synthetic data generator - realistic sample rows for all five tables

use crate::error::Result;
use crate::schema::EntityKind;
use crate::table::{Record, RecordKey, Table, TableBackend};
use crate::validation::{self, Rules};
use chrono::Duration;
use rand::Rng;

const DEPARTMENT_NAMES: &[&str] = &[
    "كلية الصيدلة",
    "كلية التربية",
    "كلية العلوم",
    "كلية الهندسة",
    "كلية الزراعة",
    "كلية الطب",
];

const FIRST_NAMES: &[&str] = &[
    "محمد", "أحمد", "علي", "عمر", "خالد", "يوسف", "إبراهيم", "مصطفى", "فاطمة", "عائشة",
    "مريم", "خديجة", "سارة", "نور", "هدى", "آمنة",
];

const LAST_NAMES: &[&str] = &[
    "المبروك", "الورفلي", "الترهوني", "المصراتي", "الزوي", "العبيدي", "الشريف", "القذافي",
    "بن علي", "الفيتوري", "المقريف", "السنوسي",
];

const ADDRESSES: &[&str] = &["القبة", "المرج", "البيضاء", "بنغازي", "طرابلس"];

const COURSE_NAMES: &[&str] = &[
    "كتابة تقارير",
    "مهارات تواصل",
    "عربي",
    "انجليزي",
    "رياضة",
    "فيزياء",
    "كيمياء",
];

const RANKS: &[&str] = &["أستاذ", "أستاذ مساعد", "محاضر"];

const EMAIL_USERS: &[&str] = &[
    "ahmed", "mohamed", "ali", "omar", "khaled", "yousef", "fatima", "maryam", "sara", "huda",
];

const EMAIL_DOMAINS: &[&str] = &["uot.edu.ly", "uob.edu.ly", "omu.edu.ly"];

pub const SEMESTERS: &[&str] = &["الفصل الأول", "الفصل الثاني"];

const MAX_STUDENT_AGE: i64 = 25;
const FIRST_YEAR: i64 = 2020;
const LAST_YEAR: i64 = 2023;
const MIN_GRADE: i64 = 50;

/// How many rows to generate per table.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub departments: usize,
    pub students: usize,
    pub courses: usize,
    pub instructors: usize,
    /// Enrollment attempts per student. Duplicate keys are dropped, so the
    /// final count can be lower.
    pub enrollments_per_student: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            departments: 6,
            students: 100,
            courses: 100,
            instructors: 100,
            enrollments_per_student: 2,
        }
    }
}

/// A complete generated data set.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub departments: Table,
    pub students: Table,
    pub courses: Table,
    pub instructors: Table,
    pub enrollments: Table,
}

impl Dataset {
    pub fn tables(&self) -> [&Table; 5] {
        [
            &self.departments,
            &self.students,
            &self.courses,
            &self.instructors,
            &self.enrollments,
        ]
    }

    /// Overwrite all five tables in `backend`.
    pub fn write(&self, backend: &dyn TableBackend) -> Result<()> {
        for table in self.tables() {
            backend.save(table)?;
            log::info!("Generated {} {} row(s)", table.len(), table.kind());
        }
        Ok(())
    }
}

/// Generate every table. Rows that fail validation are skipped with a warning.
pub fn generate<R: Rng>(options: &GeneratorOptions, rules: &Rules, rng: &mut R) -> Dataset {
    let departments = generate_departments(options.departments, rng);
    let names = department_names(&departments);
    let students = generate_students(options.students, &names, rules, rng);
    let courses = generate_courses(options.courses, &names, rules, rng);
    let instructors = generate_instructors(options.instructors, &names, rules, rng);
    let enrollments = generate_enrollments(
        &students,
        &courses,
        options.enrollments_per_student,
        rules,
        rng,
    );

    Dataset {
        departments,
        students,
        courses,
        instructors,
        enrollments,
    }
}

fn generate_departments<R: Rng>(count: usize, rng: &mut R) -> Table {
    let mut table = Table::new(EntityKind::Department);
    for i in 1..=count {
        let id = format!("D{i:04}");
        table.push(Record::from_raw(
            EntityKind::Department,
            [("DepartmentID", id.as_str()), ("DepartmentName", pick(rng, DEPARTMENT_NAMES))],
        ));
    }
    table
}

fn department_names(departments: &Table) -> Vec<String> {
    let names: Vec<String> = departments
        .rows()
        .iter()
        .map(|r| r.get("DepartmentName").to_string())
        .collect();
    if names.is_empty() {
        DEPARTMENT_NAMES.iter().map(|s| s.to_string()).collect()
    } else {
        names
    }
}

fn generate_students<R: Rng>(count: usize, majors: &[String], rules: &Rules, rng: &mut R) -> Table {
    let mut table = Table::new(EntityKind::Student);
    let min_days = 365 * i64::from(rules.min_student_age) + 1;
    let max_days = (365 * MAX_STUDENT_AGE).max(min_days);

    for i in 1..=count {
        let id = format!("2025{i:04}");
        let dob = rules
            .today
            .checked_sub_signed(Duration::days(rng.gen_range(min_days..=max_days)))
            .unwrap_or(rules.today)
            .format("%Y-%m-%d")
            .to_string();
        let phone = format!(
            "{}{}",
            pick(rng, &["091", "092"]),
            rng.gen_range(1_000_000..=9_999_999)
        );
        let record = Record::from_raw(
            EntityKind::Student,
            [
                ("StudentID", id.as_str()),
                ("FirstName", pick(rng, FIRST_NAMES)),
                ("LastName", pick(rng, LAST_NAMES)),
                ("DateOfBirth", dob.as_str()),
                ("Major", pick_owned(rng, majors)),
                ("Address", pick(rng, ADDRESSES)),
                ("Phone", phone.as_str()),
            ],
        );
        push_valid(&mut table, record, rules);
    }
    table
}

fn generate_courses<R: Rng>(count: usize, departments: &[String], rules: &Rules, rng: &mut R) -> Table {
    let mut table = Table::new(EntityKind::Course);
    for i in 1..=count {
        let id = format!("C{i:04}");
        let credits = rng
            .gen_range(validation::CREDITS_MIN..=validation::CREDITS_MAX)
            .to_string();
        let record = Record::from_raw(
            EntityKind::Course,
            [
                ("CourseID", id.as_str()),
                ("CourseName", pick(rng, COURSE_NAMES)),
                ("Credits", credits.as_str()),
                ("Department", pick_owned(rng, departments)),
            ],
        );
        push_valid(&mut table, record, rules);
    }
    table
}

fn generate_instructors<R: Rng>(
    count: usize,
    departments: &[String],
    rules: &Rules,
    rng: &mut R,
) -> Table {
    let mut table = Table::new(EntityKind::Instructor);
    for i in 1..=count {
        let id = format!("I{i:04}");
        let email = format!("{}{i}@{}", pick(rng, EMAIL_USERS), pick(rng, EMAIL_DOMAINS));
        let record = Record::from_raw(
            EntityKind::Instructor,
            [
                ("InstructorID", id.as_str()),
                ("FirstName", pick(rng, FIRST_NAMES)),
                ("LastName", pick(rng, LAST_NAMES)),
                ("Department", pick_owned(rng, departments)),
                ("Rank", pick(rng, RANKS)),
                ("Email", email.as_str()),
            ],
        );
        if let Err(e) = validation::unique(&table, "Email", &email, &[]) {
            log::warn!("Invalid data skipped: {e}");
            continue;
        }
        push_valid(&mut table, record, rules);
    }
    table
}

fn generate_enrollments<R: Rng>(
    students: &Table,
    courses: &Table,
    per_student: usize,
    rules: &Rules,
    rng: &mut R,
) -> Table {
    let mut table = Table::new(EntityKind::Enrollment);
    if students.is_empty() || courses.is_empty() {
        return table;
    }

    for _ in 0..students.len() * per_student {
        let student = &students.rows()[rng.gen_range(0..students.len())];
        let course = &courses.rows()[rng.gen_range(0..courses.len())];
        let year = rng.gen_range(FIRST_YEAR..=LAST_YEAR).to_string();
        let grade = rng
            .gen_range(MIN_GRADE..=validation::GRADE_MAX)
            .to_string();
        let record = Record::from_raw(
            EntityKind::Enrollment,
            [
                ("StudentID", student.get("StudentID")),
                ("CourseID", course.get("CourseID")),
                ("Semester", pick(rng, SEMESTERS)),
                ("Year", year.as_str()),
                ("Grade", grade.as_str()),
            ],
        );
        if validation::unique_key(&table, &RecordKey::of(EntityKind::Enrollment, &record), &[]).is_err() {
            log::debug!("Skipping duplicate enrollment");
            continue;
        }
        push_valid(&mut table, record, rules);
    }
    table
}

fn push_valid(table: &mut Table, record: Record, rules: &Rules) {
    match validation::validate_record(table.kind(), &record, rules) {
        Ok(()) => table.push(record),
        Err(e) => log::warn!("Invalid data skipped: {e}"),
    }
}

fn pick<'a, R: Rng>(rng: &mut R, pool: &[&'a str]) -> &'a str {
    pool[rng.gen_range(0..pool.len())]
}

fn pick_owned<'a, R: Rng>(rng: &mut R, pool: &'a [String]) -> &'a str {
    pool[rng.gen_range(0..pool.len())].as_str()
}
