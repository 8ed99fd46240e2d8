use log::{debug, info, warn};

use manifest_core::*;
use snafu::{prelude::*, Snafu};

use std::path::Path;

use text_diff::print_diff;

pub mod config_reader;
mod io_common;
pub mod io_csv;
pub mod io_excel;

use crate::manifest::config_reader::*;

#[derive(Debug, Snafu)]
pub enum ManifestIoError {
    #[snafu(display("Error opening manifest {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of the manifest"))]
    ReadingCsvLine { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening workbook {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} has no usable worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("The manifest {path} has no column {column:?}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Line {lineno}: cannot read {column} from {content:?}"))]
    InvalidCell {
        lineno: usize,
        column: String,
        content: String,
    },
    #[snafu(display("The manifest {path} lists scanner {scanner:02} batch {batch} more than once"))]
    DuplicateRecord {
        path: String,
        scanner: u32,
        batch: u32,
    },
    #[snafu(display("Cannot read manifests of the type of {path} (only .csv and .xlsx)"))]
    UnsupportedSource { path: String },

    #[snafu(display("Cannot write the manifest to {path}, check that it is not open in another program"))]
    WriteDenied {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing the manifest to {path}"))]
    WritingCsv { source: csv::Error, path: String },

    #[snafu(display("Error opening configuration file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing configuration file"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Invalid configuration: {reason}"))]
    InvalidConfig { reason: String },

    #[snafu(display("No manifest is open (use --manifest or the configuration file)"))]
    NoOpenManifest {},
    #[snafu(display("The manifest {path} already exists"))]
    ManifestExists { path: String },
    #[snafu(display("{source}"))]
    Manifest { source: ManifestError },
    #[snafu(display("The manifest differs from the reference {path}"))]
    ReferenceMismatch { path: String },
}

impl ManifestIoError {
    /// The manifest could not be read: missing file, not a table, or not a manifest.
    pub fn is_unreadable_source(&self) -> bool {
        matches!(
            self,
            ManifestIoError::OpeningCsv { .. }
                | ManifestIoError::ReadingCsvLine { .. }
                | ManifestIoError::OpeningExcel { .. }
                | ManifestIoError::EmptyExcel { .. }
                | ManifestIoError::MissingColumn { .. }
                | ManifestIoError::InvalidCell { .. }
                | ManifestIoError::DuplicateRecord { .. }
                | ManifestIoError::UnsupportedSource { .. }
        )
    }

    /// The manifest could not be saved. The records in memory are intact and saving can
    /// be tried again.
    pub fn is_write_denied(&self) -> bool {
        matches!(
            self,
            ManifestIoError::WriteDenied { .. } | ManifestIoError::WritingCsv { .. }
        )
    }

    /// The error of the manifest records, if this is one.
    pub fn manifest_error(&self) -> Option<&ManifestError> {
        match self {
            ManifestIoError::Manifest { source } => Some(source),
            _ => None,
        }
    }
}

pub type ManifestIoResult<T> = Result<T, ManifestIoError>;
pub type BManifestResult<T> = Result<T, Box<ManifestIoError>>;

/// What happened to a submitted form.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SubmitOutcome {
    Inserted,
    Overwritten,
    /// The container was already in the manifest and the operator did not confirm.
    Declined,
}

/// Opens a manifest file, CSV or Excel.
///
/// A workbook cannot be written back, so a manifest read from `name.xlsx` is bound to
/// `name.csv` and saved there.
pub fn open_manifest(
    path: &str,
    rules: &ManifestRules,
    worksheet_name: Option<&str>,
) -> BManifestResult<ManifestStore> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    debug!("open_manifest: path: {:?} extension: {:?}", path, extension);
    let mut store = match extension.as_deref() {
        Some("xlsx") => {
            let csv_path = workbook_save_path(path)?;
            let mut store = io_excel::load_manifest(path, rules, worksheet_name)?;
            info!(
                "open_manifest: {:?} read from a workbook, it will be saved to {:?}",
                path, csv_path
            );
            store.bind(&csv_path);
            store
        }
        Some("xls") | Some("xlsb") | Some("ods") => {
            return Err(Box::new(ManifestIoError::UnsupportedSource {
                path: path.to_string(),
            }))
        }
        _ => io_csv::load_manifest(path, rules)?,
    };
    if store.backing_path().is_none() {
        store.bind(path);
    }
    info!(
        "open_manifest: {} records in {:?}, digest {}",
        store.len(),
        path,
        store.digest()
    );
    Ok(store)
}

// The CSV file a workbook is saved to. An existing one is never replaced.
fn workbook_save_path(path: &str) -> BManifestResult<String> {
    let csv_path = Path::new(path).with_extension("csv").display().to_string();
    ensure!(
        !Path::new(&csv_path).exists(),
        ManifestExistsSnafu { path: csv_path }
    );
    Ok(csv_path)
}

/// Saves the manifest to the file it is bound to.
pub fn save_open_manifest(store: &ManifestStore) -> BManifestResult<()> {
    let path = store.backing_path().context(NoOpenManifestSnafu {})?;
    io_csv::save_manifest(store, path)
}

/// Records the form filled in for a scanned container, then saves the manifest.
///
/// `confirm_overwrite` is only asked when the container is already in the manifest. When
/// saving fails the records stay in memory, and saving can be retried.
pub fn submit_scan<F>(
    store: &mut ManifestStore,
    raw_label: &str,
    ballot_counts: &[String],
    seal1: &str,
    seal2: &str,
    confirm_overwrite: F,
) -> BManifestResult<SubmitOutcome>
where
    F: FnOnce(&GroupDescriptor) -> bool,
{
    if !store.has_open_manifest() {
        return Err(Box::new(ManifestIoError::NoOpenManifest {}));
    }
    let desc = parse_label(raw_label).context(ManifestSnafu {})?;
    info!("submit_scan: label {:?}: {:?}", raw_label, desc);
    store
        .check_target(desc.scanner, desc.start_batch)
        .context(ManifestSnafu {})?;

    let county = store.county().to_string();
    let exists = store.lookup_group(&county, desc.scanner, desc.start_batch);
    if exists && !confirm_overwrite(&desc) {
        info!("submit_scan: overwrite of {:?} declined", desc);
        return Ok(SubmitOutcome::Declined);
    }

    let counts: Vec<BallotCount> = ballot_counts
        .iter()
        .map(|s| BallotCount::from_entry(s))
        .collect();
    let records = build_group(&desc, &counts, seal1, seal2, &county).context(ManifestSnafu {})?;

    let outcome = if exists {
        store
            .overwrite_group(&county, desc.scanner, desc.start_batch, records)
            .context(ManifestSnafu {})?;
        SubmitOutcome::Overwritten
    } else {
        store.insert_group(records).context(ManifestSnafu {})?;
        SubmitOutcome::Inserted
    };
    save_open_manifest(store)?;
    Ok(outcome)
}

/// The changes made to an existing container. Fields left empty keep their current value.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct GroupEdit {
    pub ballot_counts: Option<Vec<String>>,
    pub seal1: Option<String>,
    pub seal2: Option<String>,
    pub container: Option<String>,
}

/// Edits a container designated by its station code and first batch, then saves.
pub fn edit_entry(
    store: &mut ManifestStore,
    scanner_text: &str,
    start_text: &str,
    edit: &GroupEdit,
) -> BManifestResult<Vec<BatchRecord>> {
    if !store.has_open_manifest() {
        return Err(Box::new(ManifestIoError::NoOpenManifest {}));
    }
    let (scanner, start) = store
        .resolve_target(scanner_text, start_text)
        .context(ManifestSnafu {})?;
    let county = store.county().to_string();
    let first = match store.get(&RecordKey::new(&county, scanner, start)) {
        Some(r) => r.clone(),
        None => return Err(group_not_found(&county, scanner, start)),
    };
    // An edit behaves like a new scan of the container label.
    let desc = GroupDescriptor {
        scanner,
        start_batch: start,
        container_label: edit
            .container
            .clone()
            .unwrap_or_else(|| first.container_number.clone()),
    };
    debug!("edit_entry: synthesized label {:?}", encode_label(&desc));

    let seal1 = edit.seal1.clone().unwrap_or_else(|| first.seal1.clone());
    let seal2 = edit.seal2.clone().unwrap_or_else(|| first.seal2.clone());
    let builder = GroupBuilder::new(&desc, &county).seals(&seal1, &seal2);
    let builder = match &edit.ballot_counts {
        Some(entries) => {
            let entries: Vec<&str> = entries.iter().map(|s| s.as_str()).collect();
            builder.ballot_counts(&entries).context(ManifestSnafu {})?
        }
        None => {
            // Missing batches stay blank here, the overwrite reports the group as corrupt.
            let mut builder = builder;
            for r in store.group(&county, scanner, start) {
                let offset = (r.batch_number - start) as usize;
                builder
                    .set_count(offset, r.ballot_count.clone())
                    .context(ManifestSnafu {})?;
            }
            builder
        }
    };
    let records = builder.build().context(ManifestSnafu {})?;
    store
        .overwrite_group(&county, scanner, start, records.clone())
        .context(ManifestSnafu {})?;
    save_open_manifest(store)?;
    Ok(records)
}

/// Removes a container, once the operator confirmed it, then saves.
///
/// Returns `None` when the removal was not confirmed.
pub fn remove_entry<F>(
    store: &mut ManifestStore,
    scanner_text: &str,
    start_text: &str,
    confirm: F,
) -> BManifestResult<Option<Vec<BatchRecord>>>
where
    F: FnOnce(u32, u32) -> bool,
{
    if !store.has_open_manifest() {
        return Err(Box::new(ManifestIoError::NoOpenManifest {}));
    }
    let (scanner, start) = store
        .resolve_target(scanner_text, start_text)
        .context(ManifestSnafu {})?;
    let county = store.county().to_string();
    if !store.lookup_group(&county, scanner, start) {
        return Err(group_not_found(&county, scanner, start));
    }
    if !confirm(scanner, start) {
        info!("remove_entry: removal of {:02}/{} declined", scanner, start);
        return Ok(None);
    }
    let removed = store
        .remove_group(&county, scanner, start)
        .context(ManifestSnafu {})?;
    save_open_manifest(store)?;
    Ok(Some(removed))
}

fn group_not_found(county: &str, scanner: u32, start: u32) -> Box<ManifestIoError> {
    Box::new(ManifestIoError::Manifest {
        source: ManifestError::GroupNotFound {
            key: RecordKey::new(county, scanner, start),
        },
    })
}

/// Compares the manifest with a reference manifest and prints the differences.
pub fn check_reference(store: &ManifestStore, reference_path: &str) -> BManifestResult<()> {
    let reference = open_manifest(reference_path, store.rules(), None)?;
    let expected = io_csv::to_csv_string(&reference)?;
    let actual = io_csv::to_csv_string(store)?;
    if expected != actual {
        warn!("Found differences with the reference manifest");
        print_diff(expected.as_str(), actual.as_str(), "\n");
        return Err(Box::new(ManifestIoError::ReferenceMismatch {
            path: reference_path.to_string(),
        }));
    }
    info!("check_reference: manifest matches {:?}", reference_path);
    Ok(())
}

/// The rules and the manifest path of a deployment, with the command line taking
/// precedence over the configuration file.
pub fn resolve_deployment(
    config_path: Option<&str>,
    county: Option<&str>,
    manifest: Option<&str>,
) -> BManifestResult<(ManifestRules, Option<String>, Option<String>)> {
    let config = match config_path {
        Some(p) => read_config(p)?,
        None => DeploymentConfig::default(),
    };
    debug!("resolve_deployment: config: {:?}", config);
    let mut rules = config.rules()?;
    if let Some(c) = county {
        rules.county = c.to_string();
    }
    validate_rules(&rules)?;
    let manifest_path = match manifest {
        Some(m) => Some(m.to_string()),
        None => config.manifest_path_from(config_path),
    };
    Ok((rules, manifest_path, config.excel_worksheet_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn counts(n: usize, value: &str) -> Vec<String> {
        vec![value.to_string(); n]
    }

    fn new_manifest(dir: &TempDir) -> ManifestStore {
        let path = dir.path().join("Ballot Manifest.csv");
        io_csv::create_template(&path.display().to_string(), &ManifestRules::default()).unwrap()
    }

    #[test]
    fn workbooks_are_saved_next_to_them() {
        let dir = TempDir::new().unwrap();
        let xlsx = dir.path().join("Ballot Manifest.xlsx").display().to_string();
        let csv = dir.path().join("Ballot Manifest.csv").display().to_string();
        assert_eq!(workbook_save_path(&xlsx).unwrap(), csv);

        new_manifest(&dir);
        let before = std::fs::read_to_string(&csv).unwrap();
        let err = workbook_save_path(&xlsx).unwrap_err();
        assert!(matches!(*err, ManifestIoError::ManifestExists { .. }));
        // The sibling is checked before the workbook is read.
        let err = open_manifest(&xlsx, &ManifestRules::default(), None).unwrap_err();
        assert!(matches!(*err, ManifestIoError::ManifestExists { .. }));
        assert_eq!(std::fs::read_to_string(&csv).unwrap(), before);
    }

    #[test]
    fn labels_at_the_end_of_the_numbering() {
        let dir = TempDir::new().unwrap();
        let mut store = new_manifest(&dir);
        let outcome = submit_scan(
            &mut store,
            "01/L4294967281/LICC 01-X",
            &counts(15, "1"),
            "",
            "",
            |_| true,
        )
        .unwrap();
        assert_eq!(outcome, SubmitOutcome::Inserted);
        assert!(store.get(&RecordKey::new("Arapahoe", 1, u32::MAX)).is_some());

        let res = submit_scan(&mut store, "01/L4294967295/LX", &counts(15, "1"), "", "", |_| true);
        assert!(matches!(
            res.unwrap_err().manifest_error(),
            Some(ManifestError::InvalidBatchAlignment { .. })
        ));
        let removed = remove_entry(&mut store, "01", "4294967281", |_, _| true).unwrap();
        assert_eq!(removed.map(|r| r.len()), Some(15));
    }

    #[test]
    fn edit_replaces_the_counts() {
        let dir = TempDir::new().unwrap();
        let mut store = new_manifest(&dir);
        submit_scan(&mut store, "03/L16/LICC 03-2", &counts(15, "40"), "S1", "S2", |_| true)
            .unwrap();
        let edit = GroupEdit {
            ballot_counts: Some(counts(15, "41")),
            ..GroupEdit::default()
        };
        edit_entry(&mut store, "03", "16", &edit).unwrap();
        assert!(store
            .records()
            .all(|r| r.ballot_count == BallotCount::Count(41) && r.seal1 == "S1"));

        let edit = GroupEdit {
            ballot_counts: Some(counts(14, "41")),
            ..GroupEdit::default()
        };
        let res = edit_entry(&mut store, "03", "16", &edit);
        assert!(matches!(
            res.unwrap_err().manifest_error(),
            Some(ManifestError::ArityMismatch { actual: 14, .. })
        ));
    }

    #[test]
    fn scan_then_reload() {
        let dir = TempDir::new().unwrap();
        let mut store = new_manifest(&dir);
        let outcome = submit_scan(
            &mut store,
            "01/L1/LICC 01-1",
            &counts(15, "50"),
            "A1",
            "B1",
            |_| panic!("nothing to overwrite"),
        )
        .unwrap();
        assert_eq!(outcome, SubmitOutcome::Inserted);

        let path = store.backing_path().unwrap().to_string();
        let reloaded = open_manifest(&path, &ManifestRules::default(), None).unwrap();
        assert_eq!(reloaded.len(), 15);
        let batches: Vec<u32> = reloaded.records().map(|r| r.batch_number).collect();
        assert_eq!(batches, (1..=15).collect::<Vec<u32>>());
        assert!(reloaded.records().all(|r| r.seal1 == "A1"));
        assert_eq!(reloaded.digest(), store.digest());
    }

    #[test]
    fn rescan_needs_confirmation() {
        let dir = TempDir::new().unwrap();
        let mut store = new_manifest(&dir);
        let label = "02/L16/LICC 02-2";
        submit_scan(&mut store, label, &counts(15, "50"), "A", "B", |_| true).unwrap();

        let outcome =
            submit_scan(&mut store, label, &counts(15, "75"), "C", "D", |_| false).unwrap();
        assert_eq!(outcome, SubmitOutcome::Declined);
        assert!(store.records().all(|r| r.seal1 == "A"));

        let outcome = submit_scan(&mut store, label, &counts(15, "75"), "C", "D", |desc| {
            desc.start_batch == 16
        })
        .unwrap();
        assert_eq!(outcome, SubmitOutcome::Overwritten);
        assert_eq!(store.len(), 15);
        assert!(store
            .records()
            .all(|r| r.seal1 == "C" && r.ballot_count == BallotCount::Count(75)));
    }

    #[test]
    fn bad_scans_change_nothing() {
        let dir = TempDir::new().unwrap();
        let mut store = new_manifest(&dir);
        let res = submit_scan(&mut store, "01/LICC 01-1", &counts(15, "1"), "", "", |_| true);
        assert!(matches!(
            res.unwrap_err().manifest_error(),
            Some(ManifestError::MalformedLabel { .. })
        ));
        let res = submit_scan(&mut store, "01/L2/LICC 01-1", &counts(15, "1"), "", "", |_| true);
        assert!(matches!(
            res.unwrap_err().manifest_error(),
            Some(ManifestError::InvalidBatchAlignment { start_batch: 2 })
        ));
        let res = submit_scan(&mut store, "01/L1/LICC 01-1", &counts(3, "1"), "", "", |_| true);
        assert!(matches!(
            res.unwrap_err().manifest_error(),
            Some(ManifestError::ArityMismatch { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn edit_keeps_what_is_not_changed() {
        let dir = TempDir::new().unwrap();
        let mut store = new_manifest(&dir);
        submit_scan(&mut store, "05/L31/LICC 05-3", &counts(15, "40"), "S1", "S2", |_| true)
            .unwrap();
        let edit = GroupEdit {
            seal2: Some("S9".to_string()),
            ..GroupEdit::default()
        };
        let records = edit_entry(&mut store, "05", "31", &edit).unwrap();
        assert_eq!(records.len(), 15);
        assert!(store.records().all(|r| r.seal1 == "S1"
            && r.seal2 == "S9"
            && r.container_number == "ICC 05-3"
            && r.ballot_count == BallotCount::Count(40)));

        let res = edit_entry(&mut store, "05", "46", &edit);
        assert!(matches!(
            res.unwrap_err().manifest_error(),
            Some(ManifestError::GroupNotFound { .. })
        ));
        let res = edit_entry(&mut store, "5", "31", &edit);
        assert!(matches!(
            res.unwrap_err().manifest_error(),
            Some(ManifestError::UnknownScanner { .. })
        ));
    }

    #[test]
    fn remove_with_confirmation() {
        let dir = TempDir::new().unwrap();
        let mut store = new_manifest(&dir);
        submit_scan(&mut store, "01/L1/LICC 01-1", &counts(15, "50"), "", "", |_| true).unwrap();

        assert_eq!(
            remove_entry(&mut store, "01", "1", |_, _| false).unwrap(),
            None
        );
        assert_eq!(store.len(), 15);

        let res = remove_entry(&mut store, "01", "16", |_, _| true);
        assert!(matches!(
            res.unwrap_err().manifest_error(),
            Some(ManifestError::GroupNotFound { .. })
        ));
        let res = remove_entry(&mut store, "01", "3", |_, _| true);
        assert!(matches!(
            res.unwrap_err().manifest_error(),
            Some(ManifestError::InvalidBatchAlignment { .. })
        ));

        let removed = remove_entry(&mut store, "01", "1", |_, _| true)
            .unwrap()
            .unwrap();
        assert_eq!(removed.len(), 15);
        let path = store.backing_path().unwrap().to_string();
        let reloaded = open_manifest(&path, &ManifestRules::default(), None).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn operations_need_an_open_manifest() {
        let mut store = ManifestStore::new(&ManifestRules::default());
        let res = submit_scan(&mut store, "01/L1/LICC 01-1", &counts(15, "50"), "", "", |_| true);
        assert!(matches!(
            *res.unwrap_err(),
            ManifestIoError::NoOpenManifest {}
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn reference_comparison() {
        let dir = TempDir::new().unwrap();
        let mut store = new_manifest(&dir);
        submit_scan(&mut store, "01/L1/LICC 01-1", &counts(15, "50"), "A1", "B1", |_| true)
            .unwrap();
        let reference = dir.path().join("reference.csv").display().to_string();
        io_csv::save_manifest(&store, &reference).unwrap();
        check_reference(&store, &reference).unwrap();

        submit_scan(&mut store, "01/L16/LICC 01-2", &counts(15, "50"), "A2", "B2", |_| true)
            .unwrap();
        let res = check_reference(&store, &reference);
        assert!(matches!(
            *res.unwrap_err(),
            ManifestIoError::ReferenceMismatch { .. }
        ));
    }
}
