// Reading and writing manifests as CSV files.

use std::fs::{self, File};

use crate::manifest::{
    io_common::{build_store, column_indexes, parse_row, ManifestRow, COLUMN_NAMES},
    *,
};

pub fn load_manifest(path: &str, rules: &ManifestRules) -> BManifestResult<ManifestStore> {
    info!("Attempting to read manifest file {:?}", path);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;
    let header: Vec<String> = rdr
        .headers()
        .context(OpeningCsvSnafu { path })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    let cols = column_indexes(&header, path)?;

    let mut records: Vec<BatchRecord> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is on line 1.
        let lineno = idx + 2;
        let line = line_r.context(ReadingCsvLineSnafu { lineno })?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        debug!("load_manifest: lineno: {:?} row: {:?}", lineno, cells);
        records.push(parse_row(&cells, &cols, lineno)?);
    }
    build_store(rules, records, path)
}

/// Saves all the records, sorted by county, scanner and batch.
///
/// The table is written next to `path` and then moved over it, so that a failed save
/// leaves the previous file in place.
pub fn save_manifest(store: &ManifestStore, path: &str) -> BManifestResult<()> {
    let tmp_path = format!("{}.tmp", path);
    let res = write_table(store, &tmp_path, path)
        .and_then(|_| fs::rename(&tmp_path, path).context(WriteDeniedSnafu { path }));
    if let Err(e) = res {
        warn!("save_manifest: could not save {:?}: {}", path, e);
        let _ = fs::remove_file(&tmp_path);
        return Err(Box::new(e));
    }
    info!(
        "save_manifest: saved {} records to {:?}, digest {}",
        store.len(),
        path,
        store.digest()
    );
    Ok(())
}

/// Writes an empty manifest, with the header only, and opens it.
///
/// An existing file is never replaced.
pub fn create_template(path: &str, rules: &ManifestRules) -> BManifestResult<ManifestStore> {
    ensure!(!Path::new(path).exists(), ManifestExistsSnafu { path });
    let mut store = ManifestStore::new(rules);
    save_manifest(&store, path)?;
    store.bind(path);
    info!("create_template: new manifest {:?}", path);
    Ok(store)
}

/// The content of the manifest, as it would be saved.
pub fn to_csv_string(store: &ManifestStore) -> BManifestResult<String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    write_records(&mut wtr, store, "<memory>")?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| e.into_error())
        .context(WriteDeniedSnafu { path: "<memory>" })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_table(store: &ManifestStore, tmp_path: &str, path: &str) -> ManifestIoResult<()> {
    let file = File::create(tmp_path).context(WriteDeniedSnafu { path })?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    write_records(&mut wtr, store, path)?;
    wtr.flush().context(WriteDeniedSnafu { path })?;
    Ok(())
}

fn write_records<W: std::io::Write>(
    wtr: &mut csv::Writer<W>,
    store: &ManifestStore,
    path: &str,
) -> ManifestIoResult<()> {
    wtr.write_record(COLUMN_NAMES)
        .context(WritingCsvSnafu { path })?;
    for r in store.records() {
        wtr.serialize(ManifestRow::from(r))
            .context(WritingCsvSnafu { path })?;
    }
    Ok(())
}
