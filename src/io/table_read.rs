use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::model::{DesiredAsset, DesiredRelationship};

/// Column headers required in an element export.
const ASSET_COLUMNS: [&str; 4] = ["Name", "Type", "ID", "Documentation"];
/// Column headers required in a relationship export.
const RELATIONSHIP_COLUMNS: [&str; 3] = ["Source", "Target", "Type"];

/// Reads desired assets from a CSV or XLSX element export. The format is
/// chosen from the file extension; rows with an empty `ID` are skipped.
pub fn read_assets(path: &Path) -> Result<Vec<DesiredAsset>> {
    let rows = read_columns(path, &ASSET_COLUMNS)?;
    debug!(path = %path.display(), row_count = rows.len(), "element export read");
    Ok(rows
        .into_iter()
        .filter(|row| !row[2].is_empty())
        .map(|row| {
            let [name, type_tag, external_id, documentation] = row;
            DesiredAsset {
                name,
                type_tag,
                external_id,
                documentation,
            }
        })
        .collect())
}

/// Reads desired relationships from a CSV or XLSX relationship export.
/// Rows missing either endpoint are skipped.
pub fn read_relationships(path: &Path) -> Result<Vec<DesiredRelationship>> {
    let rows = read_columns(path, &RELATIONSHIP_COLUMNS)?;
    debug!(path = %path.display(), row_count = rows.len(), "relationship export read");
    Ok(rows
        .into_iter()
        .filter(|row| !row[0].is_empty() && !row[1].is_empty())
        .map(|row| {
            let [source_external_id, target_external_id, type_tag] = row;
            DesiredRelationship {
                source_external_id,
                target_external_id,
                type_tag,
            }
        })
        .collect())
}

fn read_columns<const N: usize>(path: &Path, columns: &[&str; N]) -> Result<Vec<[String; N]>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => read_csv_columns(path, columns),
        Some("xlsx") => read_xlsx_columns(path, columns),
        _ => Err(SyncError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn read_csv_columns<const N: usize>(path: &Path, columns: &[&str; N]) -> Result<Vec<[String; N]>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();
    let indices = column_indices(&headers, columns, path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(indices.map(|index| {
            record
                .get(index)
                .map(|cell| cell.trim().to_string())
                .unwrap_or_default()
        }));
    }
    Ok(rows)
}

fn read_xlsx_columns<const N: usize>(path: &Path, columns: &[&str; N]) -> Result<Vec<[String; N]>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SyncError::InvalidTable(format!("{} has no sheets", path.display())))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| SyncError::InvalidTable(format!("missing sheet '{sheet_name}'")))?
        .map_err(SyncError::from)?;

    let headers: Vec<String> = match range.rows().next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| cell_to_string(Some(cell)).trim().to_string())
            .collect(),
        None => Vec::new(),
    };
    let indices = column_indices(&headers, columns, path)?;

    let mut rows = Vec::new();
    for row in range.rows().skip(1) {
        rows.push(indices.map(|index| cell_to_string(row.get(index)).trim().to_string()));
    }
    Ok(rows)
}

fn column_indices<const N: usize>(
    headers: &[String],
    columns: &[&str; N],
    path: &Path,
) -> Result<[usize; N]> {
    let mut indices = [0usize; N];
    for (slot, column) in indices.iter_mut().zip(columns) {
        *slot = headers
            .iter()
            .position(|header| header == column)
            .ok_or_else(|| {
                SyncError::InvalidTable(format!(
                    "missing column '{column}' in {}",
                    path.display()
                ))
            })?;
    }
    Ok(indices)
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
