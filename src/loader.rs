//! Loads a dataset from a CSV file or a directory of CSV parts.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::cleaning::types::{DatasetKind, RawDataset};
use crate::error::Result;
use crate::parser::parse_table;

fn is_csv_part(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.ends_with(".csv") || name.ends_with(".csv.gz")
}

fn open_part(path: &Path) -> Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Lists the CSV parts under `dir` in file-name order.
pub fn list_parts(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut parts = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_csv_part(&path) {
            parts.push(path);
        }
    }
    parts.sort();
    Ok(parts)
}

/// Reads `path` as one table of `kind`.
///
/// A directory is read part by part (`*.csv` and `*.csv.gz`, sorted by name)
/// and the parts are concatenated with their columns unioned.
#[tracing::instrument(skip_all, fields(dataset = %kind, path = %path.display()))]
pub fn load_dataset(kind: DatasetKind, path: &Path) -> Result<RawDataset> {
    let parts = if path.is_dir() {
        list_parts(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut tables = Vec::with_capacity(parts.len());
    for part in &parts {
        let table = parse_table(kind, open_part(part)?)?;
        debug!(part = %part.display(), rows = table.len(), "Part loaded");
        tables.push(table);
    }

    let raw = RawDataset::concat(kind, tables)?;
    info!(parts = parts.len(), rows = raw.len(), "Dataset loaded");
    Ok(raw)
}
