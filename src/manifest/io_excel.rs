// Reading manifests kept in an Excel workbook.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::manifest::{
    io_common::{build_store, column_indexes, parse_row},
    *,
};

/// Reads a manifest from a workbook. The first row of the worksheet is the header.
pub fn load_manifest(
    path: &str,
    rules: &ManifestRules,
    worksheet_name: Option<&str>,
) -> BManifestResult<ManifestStore> {
    info!("Attempting to read manifest workbook {:?}", path);
    let wrange = get_range(path, worksheet_name)?;

    let mut rows = wrange.rows();
    let header: Vec<String> = match rows.next() {
        Some(row) => row
            .iter()
            .enumerate()
            .map(|(idx, cell)| read_cell(cell, 1, idx))
            .collect::<ManifestIoResult<Vec<String>>>()?,
        None => {
            return Err(Box::new(ManifestIoError::EmptyExcel {
                path: path.to_string(),
            }))
        }
    };
    debug!("load_manifest: header: {:?}", header);
    let cols = column_indexes(&header, path)?;

    let mut records: Vec<BatchRecord> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let lineno = idx + 2;
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(col, cell)| read_cell(cell, lineno, col))
            .collect::<ManifestIoResult<Vec<String>>>()?;
        // Spreadsheets often carry formatted but empty rows at the end.
        if cells.iter().all(|c| c.trim().is_empty()) {
            debug!("load_manifest: skipping empty row {:?}", lineno);
            continue;
        }
        records.push(parse_row(&cells, &cols, lineno)?);
    }
    build_store(rules, records, path)
}

fn get_range(
    path: &str,
    worksheet_name_o: Option<&str>,
) -> BManifestResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    let wrange_o = match worksheet_name_o {
        // A worksheet name was provided, use it.
        Some(worksheet_name) => workbook.worksheet_range(worksheet_name),
        None => workbook.worksheet_range_at(0),
    };
    let wrange = wrange_o
        .context(EmptyExcelSnafu { path })?
        .context(OpeningExcelSnafu { path })?;
    Ok(wrange)
}

fn read_cell(cell: &DataType, lineno: usize, col: usize) -> ManifestIoResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Bool(b) => Ok(b.to_string()),
        DataType::Empty => Ok("".to_string()),
        _ => Err(ManifestIoError::InvalidCell {
            lineno,
            column: format!("column {}", col + 1),
            content: format!("{:?}", cell),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_as_text() {
        assert_eq!(read_cell(&DataType::Float(16.0), 2, 0).unwrap(), "16");
        assert_eq!(read_cell(&DataType::Float(2.5), 2, 0).unwrap(), "2.5");
        assert_eq!(read_cell(&DataType::Int(7), 2, 0).unwrap(), "7");
        assert_eq!(
            read_cell(&DataType::String("ICC 01-1".to_string()), 2, 0).unwrap(),
            "ICC 01-1"
        );
        assert_eq!(read_cell(&DataType::Empty, 2, 0).unwrap(), "");
        assert!(matches!(
            read_cell(&DataType::DateTime(44000.5), 9, 3),
            Err(ManifestIoError::InvalidCell { lineno: 9, .. })
        ));
    }

    #[test]
    fn missing_workbook() {
        let err = load_manifest("/nonexistent/manifest.xlsx", &ManifestRules::default(), None)
            .unwrap_err();
        assert!(err.is_unreadable_source());
        assert!(matches!(*err, ManifestIoError::OpeningExcel { .. }));
    }
}
