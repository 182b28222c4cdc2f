// CSV table files: one file per table, header row first, UTF-8 throughout

use super::{Record, Table, TableBackend};
use crate::config::StoreConfig;
use crate::error::{CampusDbError, Result};
use crate::schema::{canonicalize, EntityKind};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse a table from CSV. A leading byte order mark is ignored.
///
/// Every declared column must appear in the header; unknown columns are dropped.
pub fn read_table<R: Read>(kind: EntityKind, mut reader: R) -> Result<Table> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Ok(Table::new(kind));
    }

    let mut index = Vec::new();
    for column in kind.columns() {
        let pos = headers
            .iter()
            .position(|h| h.trim() == column.name)
            .ok_or_else(|| CampusDbError::MalformedTable {
                table: kind,
                reason: format!("missing column '{}'", column.name),
            })?;
        index.push((column, pos));
    }

    for extra in headers.iter().filter(|h| kind.column(h.trim()).is_none()) {
        log::warn!("Ignoring unknown column '{}' in {} table", extra, kind);
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let mut record = Record::new();
        for (column, pos) in &index {
            let raw = row.get(*pos).unwrap_or("");
            record.set(column.name, canonicalize(column.column_type, raw));
        }
        rows.push(record);
    }

    Ok(Table::with_rows(kind, rows))
}

/// Write a table as CSV: header row in schema order, then one row per record.
pub fn write_table<W: Write>(table: &Table, mut writer: W, bom: bool) -> Result<()> {
    if bom {
        writer.write_all(UTF8_BOM)?;
    }
    let kind = table.kind();
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(kind.column_names())?;
    for row in table.rows() {
        wtr.write_record(kind.column_names().map(|c| row.get(c)))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Tables stored as CSV files in one directory.
#[derive(Debug, Clone)]
pub struct CsvBackend {
    root: PathBuf,
    files: HashMap<EntityKind, String>,
    write_bom: bool,
}

impl CsvBackend {
    pub fn new(root: impl Into<PathBuf>, config: &StoreConfig) -> Self {
        let files = EntityKind::ALL
            .iter()
            .map(|&k| (k, config.file_name(k).to_string()))
            .collect();
        CsvBackend {
            root: root.into(),
            files,
            write_bom: config.write_bom,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, kind: EntityKind) -> PathBuf {
        let name = self
            .files
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_file_name());
        self.root.join(name)
    }
}

impl TableBackend for CsvBackend {
    fn load(&self, kind: EntityKind) -> Result<Option<Table>> {
        let path = self.path(kind);
        if !path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(&path)?;
        let table = read_table(kind, file)?;
        log::debug!("Loaded {} rows from {}", table.len(), path.display());
        Ok(Some(table))
    }

    fn save(&self, table: &Table) -> Result<()> {
        let path = self.path(table.kind());
        std::fs::create_dir_all(&self.root)?;

        // Write beside the target, then rename over it.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        write_table(table, tmp.as_file_mut(), self.write_bom)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        log::debug!("Wrote {} rows to {}", table.len(), path.display());
        Ok(())
    }

    fn location(&self, kind: EntityKind) -> String {
        self.path(kind).display().to_string()
    }
}
