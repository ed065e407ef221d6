use log::debug;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("IO error. {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error. {0}")]
    Csv(#[from] csv::Error),
    #[error("Database error. {0}")]
    Db(#[from] rusqlite::Error),
    #[error("Row for unknown table: {0}")]
    UnknownTable(String),
}

/// On-disk layout of a table written by the filesystem sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    /// Header row plus quoted-where-needed data rows.
    Csv,
    /// Raw comma-joined lines, no header, no quoting.
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn integer(name: &str) -> Self {
        Column {
            name: name.to_string(),
            ty: ColumnType::Integer,
        }
    }

    pub fn real(name: &str) -> Self {
        Column {
            name: name.to_string(),
            ty: ColumnType::Real,
        }
    }

    pub fn text(name: &str) -> Self {
        Column {
            name: name.to_string(),
            ty: ColumnType::Text,
        }
    }
}

/// One output table: a logical name (usually the topic), the filesystem
/// target, the row format, and the typed column list.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub path: PathBuf,
    pub format: RowFormat,
    pub columns: Vec<Column>,
}

/// Row-oriented output target. The same extractor code drives either the
/// flat-file tree or a relational database, selected by configuration.
pub trait RowSink: Send {
    /// Declare a table before its first row. An empty column list still
    /// creates the output target (an empty file) without a header.
    fn begin_table(&mut self, spec: &TableSpec) -> Result<(), SinkError>;

    fn write_row(&mut self, table: &str, values: &[String]) -> Result<(), SinkError>;

    /// Flush (filesystem) or commit (database) everything written so far.
    fn finish(&mut self) -> Result<(), SinkError>;
}

enum TableWriter {
    Csv(csv::Writer<File>),
    Plain(BufWriter<File>),
}

/// Writes each table as one file: `.csv` with a header row for generic
/// topics, raw comma-joined `.txt` lines for the sensor formats.
#[derive(Default)]
pub struct FsSink {
    tables: HashMap<String, TableWriter>,
}

impl FsSink {
    pub fn new() -> Self {
        FsSink::default()
    }
}

impl RowSink for FsSink {
    fn begin_table(&mut self, spec: &TableSpec) -> Result<(), SinkError> {
        if let Some(parent) = spec.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&spec.path)?;
        let writer = match spec.format {
            RowFormat::Csv => {
                let mut w = csv::Writer::from_writer(file);
                if !spec.columns.is_empty() {
                    w.write_record(spec.columns.iter().map(|c| c.name.as_str()))?;
                }
                TableWriter::Csv(w)
            }
            RowFormat::Plain => TableWriter::Plain(BufWriter::new(file)),
        };
        debug!("Writing table {} to {}", spec.name, spec.path.display());
        self.tables.insert(spec.name.clone(), writer);
        Ok(())
    }

    fn write_row(&mut self, table: &str, values: &[String]) -> Result<(), SinkError> {
        let writer = self
            .tables
            .get_mut(table)
            .ok_or_else(|| SinkError::UnknownTable(table.to_string()))?;
        match writer {
            TableWriter::Csv(w) => w.write_record(values)?,
            TableWriter::Plain(w) => writeln!(w, "{}", values.join(","))?,
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        for writer in self.tables.values_mut() {
            match writer {
                TableWriter::Csv(w) => w.flush()?,
                TableWriter::Plain(w) => w.flush()?,
            }
        }
        Ok(())
    }
}

/// Mirrors each table into SQLite: one typed table per topic, parameterized
/// inserts, one transaction per log file. Dropped without `finish` the
/// transaction rolls back, so a failed file leaves no partial rows.
pub struct DbSink {
    conn: rusqlite::Connection,
    inserts: HashMap<String, String>,
    committed: bool,
}

impl DbSink {
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        Self::from_conn(rusqlite::Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, SinkError> {
        Self::from_conn(rusqlite::Connection::open_in_memory()?)
    }

    fn from_conn(conn: rusqlite::Connection) -> Result<Self, SinkError> {
        conn.busy_timeout(std::time::Duration::from_secs(30))?;
        conn.execute_batch("BEGIN")?;
        Ok(DbSink {
            conn,
            inserts: HashMap::new(),
            committed: false,
        })
    }

    pub fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl RowSink for DbSink {
    fn begin_table(&mut self, spec: &TableSpec) -> Result<(), SinkError> {
        if spec.columns.is_empty() {
            // Nothing to create; rows cannot follow an empty column list.
            return Ok(());
        }
        let table = sql_ident(&spec.name);
        let columns = spec
            .columns
            .iter()
            .map(|c| {
                let ty = match c.ty {
                    ColumnType::Integer => "INTEGER",
                    ColumnType::Real => "REAL",
                    ColumnType::Text => "TEXT",
                };
                format!("{} {}", sql_ident(&c.name), ty)
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table, columns
        ))?;

        let placeholders = (1..=spec.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.inserts.insert(
            spec.name.clone(),
            format!("INSERT INTO {} VALUES ({})", table, placeholders),
        );
        Ok(())
    }

    fn write_row(&mut self, table: &str, values: &[String]) -> Result<(), SinkError> {
        let insert = self
            .inserts
            .get(table)
            .ok_or_else(|| SinkError::UnknownTable(table.to_string()))?;
        self.conn
            .execute(insert, rusqlite::params_from_iter(values.iter()))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.conn.execute_batch("COMMIT")?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for DbSink {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

/// Reduce an arbitrary topic or field name to a safe SQL identifier.
fn sql_ident(name: &str) -> String {
    let ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let ident = ident.trim_matches('_').to_string();
    if ident.is_empty() || ident.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return format!("t_{ident}");
    }
    ident
}
