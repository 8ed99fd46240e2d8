// Primitives shared by the readers of manifest tables.

use crate::manifest::*;

use serde::Serialize;

/// The columns of a manifest, in the order they are written.
pub const COLUMN_NAMES: [&str; 7] = [
    "County",
    "Scanner",
    "ICC Batch",
    "Ballot Count",
    "Container Number",
    "Seal 1",
    "Seal 2",
];

/// One row of the manifest table, as written to the file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct ManifestRow {
    #[serde(rename = "County")]
    pub county: String,
    #[serde(rename = "Scanner")]
    pub scanner: u32,
    #[serde(rename = "ICC Batch")]
    pub icc_batch: u32,
    #[serde(rename = "Ballot Count")]
    pub ballot_count: String,
    #[serde(rename = "Container Number")]
    pub container_number: String,
    #[serde(rename = "Seal 1")]
    pub seal1: String,
    #[serde(rename = "Seal 2")]
    pub seal2: String,
}

impl From<&BatchRecord> for ManifestRow {
    fn from(r: &BatchRecord) -> Self {
        ManifestRow {
            county: r.county.clone(),
            scanner: r.scanner,
            icc_batch: r.batch_number,
            ballot_count: r.ballot_count.to_string(),
            container_number: r.container_number.clone(),
            seal1: r.seal1.clone(),
            seal2: r.seal2.clone(),
        }
    }
}

/// The position of each manifest column in a table, in the order of `COLUMN_NAMES`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnIndexes([usize; 7]);

/// Finds the manifest columns in the header of a table.
///
/// Columns are found by name, which also accepts the tables written with an unnamed
/// leading index column.
pub fn column_indexes(header: &[String], path: &str) -> ManifestIoResult<ColumnIndexes> {
    let mut indexes = [0usize; 7];
    for (i, name) in COLUMN_NAMES.iter().enumerate() {
        indexes[i] = header
            .iter()
            .position(|h| h.trim() == *name)
            .context(MissingColumnSnafu {
                column: *name,
                path,
            })?;
    }
    debug!("column_indexes: header: {:?} indexes: {:?}", header, indexes);
    Ok(ColumnIndexes(indexes))
}

/// Reads one row of a manifest table. `lineno` counts from 1, the header being line 1.
pub fn parse_row(
    cells: &[String],
    cols: &ColumnIndexes,
    lineno: usize,
) -> ManifestIoResult<BatchRecord> {
    let cell = |i: usize| cell_at(cells, cols, i);
    let county = cell(0).trim().to_string();
    if county.is_empty() {
        return Err(ManifestIoError::InvalidCell {
            lineno,
            column: COLUMN_NAMES[0].to_string(),
            content: cell(0).to_string(),
        });
    }
    let record = BatchRecord {
        county,
        scanner: parse_key_cell(cell(1), COLUMN_NAMES[1], lineno)?,
        batch_number: parse_key_cell(cell(2), COLUMN_NAMES[2], lineno)?,
        ballot_count: BallotCount::from_entry(cell(3)),
        container_number: cell(4).to_string(),
        seal1: cell(5).to_string(),
        seal2: cell(6).to_string(),
    };
    if record.batch_number == 0 {
        return Err(ManifestIoError::InvalidCell {
            lineno,
            column: COLUMN_NAMES[2].to_string(),
            content: cell(2).to_string(),
        });
    }
    Ok(record)
}

/// Builds the store of a manifest read from `path`.
pub fn build_store(
    rules: &ManifestRules,
    records: Vec<BatchRecord>,
    path: &str,
) -> BManifestResult<ManifestStore> {
    info!("build_store: {} rows read from {:?}", records.len(), path);
    ManifestStore::from_records(rules, records).map_err(|key| {
        Box::new(ManifestIoError::DuplicateRecord {
            path: path.to_string(),
            scanner: key.scanner,
            batch: key.batch_number,
        })
    })
}

// Short rows read as empty cells.
fn cell_at<'a>(cells: &'a [String], cols: &ColumnIndexes, i: usize) -> &'a str {
    cells.get(cols.0[i]).map(|s| s.as_str()).unwrap_or("")
}

// Key cells may have been written as floats ("16.0") by spreadsheet tools.
fn parse_key_cell(content: &str, column: &str, lineno: usize) -> ManifestIoResult<u32> {
    let s = content.trim();
    if let Ok(x) = s.parse::<u32>() {
        return Ok(x);
    }
    match s.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        _ => Err(ManifestIoError::InvalidCell {
            lineno,
            column: column.to_string(),
            content: content.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn finds_columns_by_name() {
        let header = strings(&[
            "",
            "Seal 2",
            "County",
            "Scanner",
            "ICC Batch",
            "Ballot Count",
            "Container Number",
            "Seal 1",
        ]);
        let cols = column_indexes(&header, "m.csv").unwrap();
        assert_eq!(cols, ColumnIndexes([2, 3, 4, 5, 6, 7, 1]));
    }

    #[test]
    fn missing_column() {
        let header = strings(&["County", "Scanner", "ICC Batch", "Ballot Count"]);
        let err = column_indexes(&header, "m.csv").unwrap_err();
        assert!(matches!(
            err,
            ManifestIoError::MissingColumn { ref column, .. } if column == "Container Number"
        ));
    }

    #[test]
    fn rows_written_by_spreadsheets() {
        let cols = ColumnIndexes([0, 1, 2, 3, 4, 5, 6]);
        let r = parse_row(
            &strings(&["Arapahoe", "1.0", "16", "48.0", "ICC 01-2", "", "B"]),
            &cols,
            2,
        )
        .unwrap();
        assert_eq!(r.key(), RecordKey::new("Arapahoe", 1, 16));
        assert_eq!(r.ballot_count, BallotCount::Count(48));
        assert_eq!(r.seal1, "");
        let r = parse_row(&strings(&["Arapahoe", "1", "17", "", "ICC 01-2"]), &cols, 3).unwrap();
        assert!(r.ballot_count.is_blank());
        assert_eq!(r.seal2, "");
    }

    #[test]
    fn bad_key_cells() {
        let cols = ColumnIndexes([0, 1, 2, 3, 4, 5, 6]);
        for row in [
            ["Arapahoe", "one", "1", "", "", "", ""],
            ["Arapahoe", "1", "1.5", "", "", "", ""],
            ["Arapahoe", "1", "0", "", "", "", ""],
            ["", "1", "1", "", "", "", ""],
        ] {
            let res = parse_row(&strings(&row), &cols, 4);
            assert!(matches!(res, Err(ManifestIoError::InvalidCell { lineno: 4, .. })));
        }
    }
}
