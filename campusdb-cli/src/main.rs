use campusdb::generator::GeneratorOptions;
use campusdb::schema::ColumnType;
use campusdb::{EntityKind, Record, RecordKey, Store};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::process;

/// campusdb CLI - manage a directory of university record tables
#[derive(Parser)]
#[command(name = "campusdb", version, about)]
struct Cli {
    /// Path to the data directory (default: current directory)
    #[arg(long, default_value = ".")]
    data_dir: String,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Add a record
    Add {
        /// Table name (department, student, course, instructor, enrollment)
        table: EntityKind,
        /// Field values (e.g. --field FirstName=محمد)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Update the record(s) stored under a key
    Update {
        table: EntityKind,
        /// Key values. Enrollments take StudentID CourseID Semester Year
        #[arg(required = true, num_args = 1..=4)]
        key: Vec<String>,
        /// Field values to overwrite (e.g. --field Credits=3)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Delete the record(s) stored under a key, cascading to dependents
    Delete {
        table: EntityKind,
        #[arg(required = true, num_args = 1..=4)]
        key: Vec<String>,
    },

    /// Get a single record by key
    Get {
        table: EntityKind,
        #[arg(required = true, num_args = 1..=4)]
        key: Vec<String>,
    },

    /// List records matching every filter
    Filter {
        table: EntityKind,
        /// Field filters (e.g. --where Department=كلية العلوم)
        #[arg(long = "where", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
    },

    /// List one field of the records matching every filter
    Project {
        table: EntityKind,
        field: String,
        #[arg(long = "where", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
    },

    /// Average a numeric field over the records matching every filter
    Average {
        table: EntityKind,
        field: String,
        #[arg(long = "where", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
    },

    /// Show every table's location and row count
    Status,

    /// Replace all tables with generated sample data
    Generate {
        #[arg(long, default_value_t = 6)]
        departments: usize,
        #[arg(long, default_value_t = 100)]
        students: usize,
        #[arg(long, default_value_t = 100)]
        courses: usize,
        #[arg(long, default_value_t = 100)]
        instructors: usize,
        #[arg(long, default_value_t = 2)]
        enrollments_per_student: usize,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| {
        format!("Invalid key=value pair: no '=' found in '{s}'")
    })?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Command::Generate { .. } = cli.command {
        let dir = Path::new(&cli.data_dir);
        if !dir.is_dir() {
            log::info!("Creating data directory {}", dir.display());
            std::fs::create_dir_all(dir)?;
        }
    }

    let store = Store::open(&cli.data_dir)?;

    match cli.command {
        Command::Add { table, fields } => {
            let record = store.add(table, &fields_to_value(table, &fields))?;
            print_output(&record.to_json(table), &cli.format)?;
        }

        Command::Update { table, key, fields } => {
            let outcome = store.update(table, &RecordKey::from_values(key), &fields_to_value(table, &fields))?;
            print_output(&serde_json::to_value(&outcome)?, &cli.format)?;
        }

        Command::Delete { table, key } => {
            let outcome = store.delete(table, &RecordKey::from_values(key))?;
            print_output(&serde_json::to_value(&outcome)?, &cli.format)?;
        }

        Command::Get { table, key } => {
            let record = store.query().find_by_key(table, &RecordKey::from_values(key))?;
            let value = record
                .map(|r| r.to_json(table))
                .unwrap_or(serde_json::Value::Null);
            print_output(&value, &cli.format)?;
        }

        Command::Filter { table, filters } => {
            let records = store.query().filter(table, &borrow_pairs(&filters))?;
            print_output(&records_to_value(table, &records), &cli.format)?;
        }

        Command::Project {
            table,
            field,
            filters,
        } => {
            let values = store
                .query()
                .project_field(table, &borrow_pairs(&filters), &field)?;
            print_output(&serde_json::to_value(values)?, &cli.format)?;
        }

        Command::Average {
            table,
            field,
            filters,
        } => {
            let average = store
                .query()
                .average_of(table, &field, &borrow_pairs(&filters))?;
            print_output(&serde_json::json!({ "average": average }), &cli.format)?;
        }

        Command::Status => {
            let status = store.query().status()?;
            print_output(&serde_json::to_value(status)?, &cli.format)?;
        }

        Command::Generate {
            departments,
            students,
            courses,
            instructors,
            enrollments_per_student,
            seed,
        } => {
            let options = GeneratorOptions {
                departments,
                students,
                courses,
                instructors,
                enrollments_per_student,
            };
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let dataset = store.populate(&options, &mut rng)?;
            let counts: serde_json::Map<_, _> = dataset
                .tables()
                .iter()
                .map(|t| (t.kind().to_string(), serde_json::Value::from(t.len())))
                .collect();
            print_output(&serde_json::Value::Object(counts), &cli.format)?;
        }
    }

    Ok(())
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value)?);
        }
    }
    Ok(())
}

fn fields_to_value(kind: EntityKind, fields: &[(String, String)]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (key, val) in fields {
        // Only numeric columns take JSON numbers; text and dates pass through untouched
        let numeric = matches!(
            kind.column(key).map(|c| c.column_type),
            Some(ColumnType::Integer | ColumnType::Id)
        );
        let json_val = match serde_json::from_str::<serde_json::Value>(val) {
            Ok(n @ serde_json::Value::Number(_)) if numeric => n,
            _ => serde_json::Value::String(val.clone()),
        };
        map.insert(key.clone(), json_val);
    }
    serde_json::Value::Object(map)
}

fn records_to_value(kind: EntityKind, records: &[Record]) -> serde_json::Value {
    serde_json::Value::Array(records.iter().map(|r| r.to_json(kind)).collect())
}

fn borrow_pairs(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
    pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("Department=كلية العلوم").unwrap(),
            ("Department".to_string(), "كلية العلوم".to_string())
        );
        assert_eq!(
            parse_key_value("Email=a=b@x.ly").unwrap(),
            ("Email".to_string(), "a=b@x.ly".to_string())
        );
        assert!(parse_key_value("Credits").is_err());
    }

    #[test]
    fn test_fields_to_value_keeps_leading_zero() {
        let value = fields_to_value(
            EntityKind::Student,
            &[
                ("Phone".into(), "0912345678".into()),
                ("StudentID".into(), "20250001".into()),
            ],
        );
        assert_eq!(value["Phone"], "0912345678");
        assert_eq!(value["StudentID"], 20250001);
    }

    #[test]
    fn test_fields_to_value_text_not_coerced() {
        let value = fields_to_value(
            EntityKind::Course,
            &[
                ("CourseName".into(), "1.50".into()),
                ("Credits".into(), "3".into()),
            ],
        );
        assert_eq!(value["CourseName"], "1.50");
        assert_eq!(value["Credits"], 3);

        let value = fields_to_value(EntityKind::Instructor, &[("Rank".into(), "1e3".into())]);
        assert_eq!(value["Rank"], "1e3");
    }

    #[test]
    fn test_cli_parses_enrollment_key() {
        let cli = Cli::try_parse_from([
            "campusdb",
            "delete",
            "enrollment",
            "20250001",
            "C0001",
            "الفصل الأول",
            "2023",
        ])
        .unwrap();
        match cli.command {
            Command::Delete { table, key } => {
                assert_eq!(table, EntityKind::Enrollment);
                assert_eq!(key.len(), 4);
            }
            _ => panic!("expected delete"),
        }
    }
}
