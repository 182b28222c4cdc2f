use crate::error::{CampusDbError, Result};
use crate::schema::EntityKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Name of the optional config file inside a data directory.
pub const CONFIG_FILE: &str = "campusdb.yaml";

/// Store configuration parsed from campusdb.yaml. Every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// File name overrides per table, e.g. `student: students.csv`.
    pub tables: HashMap<EntityKind, String>,
    pub min_student_age: u32,
    /// Reject enrollments whose StudentID/CourseID do not exist.
    pub strict_references: bool,
    /// Prefix written files with a UTF-8 byte order mark.
    pub write_bom: bool,
    /// Fixed "today" for age checks. Uses the local date when unset.
    pub reference_date: Option<NaiveDate>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            tables: HashMap::new(),
            min_student_age: 17,
            strict_references: false,
            write_bom: true,
            reference_date: None,
        }
    }
}

impl StoreConfig {
    pub fn file_name(&self, kind: EntityKind) -> &str {
        self.tables
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_file_name())
    }

    /// Load `campusdb.yaml` from a data directory, falling back to defaults when absent.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            log::debug!("No {} in {}, using defaults", CONFIG_FILE, dir.display());
            return Ok(StoreConfig::default());
        }
        parse_config(&path)
    }
}

/// Parse a config file into a StoreConfig
pub fn parse_config(path: &Path) -> Result<StoreConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse a config YAML string into a StoreConfig
pub fn parse_config_str(content: &str) -> Result<StoreConfig> {
    if content.trim().is_empty() {
        return Ok(StoreConfig::default());
    }
    let config: StoreConfig = serde_yaml::from_str(content)?;
    if config.min_student_age == 0 {
        return Err(CampusDbError::Config(
            "min_student_age must be at least 1".to_string(),
        ));
    }
    if let Some((kind, _)) = config.tables.iter().find(|(_, name)| name.trim().is_empty()) {
        return Err(CampusDbError::Config(format!(
            "Empty file name for table '{kind}'"
        )));
    }
    Ok(config)
}
