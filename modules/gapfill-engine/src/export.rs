use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use thiserror::Error;

use gapfill_common::{cypher_identifier, Connection, GapFillError};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid row {row} in {}: {source}", .path.display())]
    InvalidRow {
        path: PathBuf,
        row: usize,
        #[source]
        source: GapFillError,
    },
}

/// `adaptive-gap-filling-all-chains-YYYYMMDD_HHMMSS.csv`
pub fn export_filename<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "adaptive-gap-filling-all-chains-{}.csv",
        at.format("%Y%m%d_%H%M%S")
    )
}

/// Write connections with a header row. An empty slice writes an empty file.
pub fn write_connections(path: &Path, connections: &[Connection]) -> Result<(), ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for connection in connections {
        writer.serialize(connection).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Read a batch file back. Labels and rel types are checked here so a bad
/// file is rejected before any write happens.
pub fn read_connections(path: &Path) -> Result<Vec<Connection>, ExportError> {
    let file = File::open(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let mut connections = Vec::new();
    for (i, record) in reader.deserialize::<Connection>().enumerate() {
        let row = i + 2;
        let connection = record.map_err(|source| ExportError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        for value in [
            &connection.source_label,
            &connection.target_label,
            &connection.rel_type,
        ] {
            cypher_identifier(value).map_err(|source| ExportError::InvalidRow {
                path: path.to_path_buf(),
                row,
                source,
            })?;
        }
        connections.push(connection);
    }
    Ok(connections)
}
