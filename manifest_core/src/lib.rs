pub mod builder;
mod config;
pub mod label;
pub mod manual;

use log::{debug, info, warn};

use std::collections::{BTreeMap, BTreeSet};

pub use crate::builder::{build_group, GroupBuilder};
pub use crate::config::*;
pub use crate::label::{encode_label, parse_label};

/// The records of one manifest, indexed by county, scanner and batch number.
///
/// Records only enter or leave the store as complete containers of 15 batches. Every
/// mutation checks the whole group before touching the index, so a failed call leaves the
/// store exactly as it was.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ManifestStore {
    rules: ManifestRules,
    records: BTreeMap<RecordKey, BatchRecord>,
    // The file this manifest was loaded from or created at.
    backing_path: Option<String>,
}

impl ManifestStore {
    pub fn new(rules: &ManifestRules) -> ManifestStore {
        ManifestStore {
            rules: rules.clone(),
            records: BTreeMap::new(),
            backing_path: None,
        }
    }

    /// Builds a store from records read from a file.
    ///
    /// Records are taken as they are: groups with missing batches are accepted, so that
    /// a manifest edited by hand can still be opened. Duplicate keys are rejected.
    pub fn from_records(
        rules: &ManifestRules,
        records: Vec<BatchRecord>,
    ) -> Result<ManifestStore, RecordKey> {
        let mut store = ManifestStore::new(rules);
        for r in records {
            let key = r.key();
            if store.records.insert(key.clone(), r).is_some() {
                return Err(key);
            }
        }
        for (county, scanner, start) in store.incomplete_groups() {
            warn!(
                "from_records: incomplete group: county {} scanner {:02} start {}",
                county, scanner, start
            );
        }
        Ok(store)
    }

    pub fn rules(&self) -> &ManifestRules {
        &self.rules
    }

    /// The county of this deployment.
    pub fn county(&self) -> &str {
        &self.rules.county
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All the records, sorted by key.
    pub fn records(&self) -> impl Iterator<Item = &BatchRecord> {
        self.records.values()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&BatchRecord> {
        self.records.get(key)
    }

    /// Attaches the store to the file it is persisted in.
    pub fn bind(&mut self, path: &str) {
        self.backing_path = Some(path.to_string());
    }

    pub fn backing_path(&self) -> Option<&str> {
        self.backing_path.as_deref()
    }

    /// True when a manifest file is open. Saving, scanning, editing and removing are only
    /// offered in that case.
    pub fn has_open_manifest(&self) -> bool {
        self.backing_path.is_some()
    }

    /// Checks that a scanner and a starting batch can designate a container.
    pub fn check_target(&self, scanner: u32, start_batch: u32) -> Result<(), ManifestError> {
        if start_batch % GROUP_SIZE != 1 || group_end(start_batch).is_none() {
            return Err(ManifestError::InvalidBatchAlignment { start_batch });
        }
        let code = label::station_code(scanner);
        if !self.rules.is_known_scanner(&code) {
            return Err(ManifestError::UnknownScanner { scanner: code });
        }
        Ok(())
    }

    /// Reads the scanner and starting batch typed in by an operator.
    ///
    /// The scanner must be one of the station codes of the deployment, written with two
    /// digits.
    pub fn resolve_target(
        &self,
        scanner_text: &str,
        start_text: &str,
    ) -> Result<(u32, u32), ManifestError> {
        let code = scanner_text.trim();
        if !self.rules.is_known_scanner(code) {
            return Err(ManifestError::UnknownScanner {
                scanner: code.to_string(),
            });
        }
        let scanner = label::parse_number("scanner", code)?;
        let start = label::parse_number("starting batch", start_text)?;
        self.check_target(scanner, start)?;
        Ok((scanner, start))
    }

    /// True if the container starting at `start_batch` has an entry in the manifest.
    pub fn lookup_group(&self, county: &str, scanner: u32, start_batch: u32) -> bool {
        self.records
            .contains_key(&RecordKey::new(county, scanner, start_batch))
    }

    /// The records present for a container, in batch order.
    pub fn group(&self, county: &str, scanner: u32, start_batch: u32) -> Vec<&BatchRecord> {
        self.records
            .range(group_range(county, scanner, start_batch))
            .map(|(_, r)| r)
            .collect()
    }

    /// Adds the records of a container.
    ///
    /// Fails without changing anything if the records are not one aligned group or if any
    /// of them is already present.
    pub fn insert_group(&mut self, records: Vec<BatchRecord>) -> Result<(), ManifestError> {
        let key = self.validate_group(&records)?;
        if let Some(existing) = records
            .iter()
            .map(|r| r.key())
            .find(|k| self.records.contains_key(k))
        {
            debug!("insert_group: {:?} conflicts with {:?}", key, existing);
            return Err(ManifestError::GroupConflict { key: existing });
        }
        self.insert_validated(records);
        info!(
            "insert_group: inserted scanner {:02} batches {}-{}",
            key.scanner,
            key.batch_number,
            key.batch_number + GROUP_SIZE - 1
        );
        Ok(())
    }

    /// Removes the records of a container and returns them.
    ///
    /// All 15 batches must be present. A partial group is reported as corrupt and left in
    /// place.
    pub fn remove_group(
        &mut self,
        county: &str,
        scanner: u32,
        start_batch: u32,
    ) -> Result<Vec<BatchRecord>, ManifestError> {
        let keys = self.existing_group_keys(county, scanner, start_batch)?;
        let removed: Vec<BatchRecord> = keys
            .iter()
            .filter_map(|k| self.records.remove(k))
            .collect();
        info!(
            "remove_group: removed {} records for scanner {:02} starting at {}",
            removed.len(),
            scanner,
            start_batch
        );
        Ok(removed)
    }

    /// Replaces a container that is already in the manifest.
    ///
    /// The caller is expected to have asked for confirmation. Both the current group and
    /// the replacement are checked before anything is changed.
    pub fn overwrite_group(
        &mut self,
        county: &str,
        scanner: u32,
        start_batch: u32,
        records: Vec<BatchRecord>,
    ) -> Result<Vec<BatchRecord>, ManifestError> {
        let keys = self.existing_group_keys(county, scanner, start_batch)?;
        let new_key = self.validate_group(&records)?;
        let target = RecordKey::new(county, scanner, start_batch);
        if new_key != target {
            return Err(ManifestError::TargetMismatch {
                target,
                actual: new_key,
            });
        }
        let previous: Vec<BatchRecord> = keys
            .iter()
            .filter_map(|k| self.records.remove(k))
            .collect();
        self.insert_validated(records);
        info!(
            "overwrite_group: replaced scanner {:02} batches {}-{}",
            scanner,
            start_batch,
            start_batch + GROUP_SIZE - 1
        );
        Ok(previous)
    }

    /// The containers that are only partially present, as (county, scanner, start batch).
    pub fn incomplete_groups(&self) -> Vec<(String, u32, u32)> {
        let starts: BTreeSet<(String, u32, u32)> = self
            .records
            .keys()
            .map(|k| (k.county.clone(), k.scanner, group_start(k.batch_number)))
            .collect();
        starts
            .into_iter()
            .filter(|(county, scanner, start)| {
                self.group(county, *scanner, *start).len() != GROUP_SIZE as usize
            })
            .collect()
    }

    /// A SHA-256 fingerprint of the content of the manifest.
    ///
    /// Two manifests with the same records have the same digest, whatever the order in
    /// which the groups were entered.
    pub fn digest(&self) -> String {
        let mut canonical = String::new();
        for r in self.records.values() {
            canonical.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                r.county,
                r.scanner,
                r.batch_number,
                r.ballot_count,
                r.container_number,
                r.seal1,
                r.seal2
            ));
        }
        sha256::digest(canonical.as_str())
    }

    // Checks the target of a removal or an overwrite and returns the 15 keys of the group.
    fn existing_group_keys(
        &self,
        county: &str,
        scanner: u32,
        start_batch: u32,
    ) -> Result<Vec<RecordKey>, ManifestError> {
        self.check_target(scanner, start_batch)?;
        let key = RecordKey::new(county, scanner, start_batch);
        if !self.records.contains_key(&key) {
            return Err(ManifestError::GroupNotFound { key });
        }
        let keys: Vec<RecordKey> = (start_batch..=start_batch + (GROUP_SIZE - 1))
            .map(|b| RecordKey::new(county, scanner, b))
            .collect();
        let missing: Vec<String> = keys
            .iter()
            .filter(|k| !self.records.contains_key(k))
            .map(|k| k.batch_number.to_string())
            .collect();
        if !missing.is_empty() {
            warn!(
                "existing_group_keys: group {:?} is missing batches {:?}",
                key, missing
            );
            return Err(ManifestError::CorruptGroup {
                key,
                reason: format!("missing batches {}", missing.join(", ")),
            });
        }
        Ok(keys)
    }

    // Checks that the records form one aligned, homogeneous group and returns its key.
    fn validate_group(&self, records: &[BatchRecord]) -> Result<RecordKey, ManifestError> {
        if records.len() != GROUP_SIZE as usize {
            return Err(ManifestError::ArityMismatch {
                expected: GROUP_SIZE as usize,
                actual: records.len(),
            });
        }
        let first = &records[0];
        let key = first.key();
        self.check_target(first.scanner, first.batch_number)?;
        let batches = first.batch_number..=first.batch_number + (GROUP_SIZE - 1);
        for (r, batch_number) in records.iter().zip(batches) {
            let reason = if r.batch_number != batch_number {
                Some(format!(
                    "expected batch {}, found batch {}",
                    batch_number, r.batch_number
                ))
            } else if r.county != first.county || r.scanner != first.scanner {
                Some(format!("batch {} belongs to another station", r.batch_number))
            } else if r.container_number != first.container_number {
                Some(format!(
                    "batch {} is in container {:?}, not {:?}",
                    r.batch_number, r.container_number, first.container_number
                ))
            } else if r.seal1 != first.seal1 || r.seal2 != first.seal2 {
                Some(format!("batch {} has different seals", r.batch_number))
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ManifestError::CorruptGroup { key, reason });
            }
        }
        Ok(key)
    }

    fn insert_validated(&mut self, records: Vec<BatchRecord>) {
        for r in records {
            self.records.insert(r.key(), r);
        }
    }
}

/// The first batch of the container holding `batch_number`.
pub fn group_start(batch_number: u32) -> u32 {
    if batch_number == 0 {
        return 1;
    }
    ((batch_number - 1) / GROUP_SIZE) * GROUP_SIZE + 1
}

/// The last batch of the container starting at `start_batch`, if batch numbers reach it.
pub fn group_end(start_batch: u32) -> Option<u32> {
    start_batch.checked_add(GROUP_SIZE - 1)
}

fn group_range(
    county: &str,
    scanner: u32,
    start_batch: u32,
) -> std::ops::RangeInclusive<RecordKey> {
    RecordKey::new(county, scanner, start_batch)
        ..=RecordKey::new(county, scanner, start_batch.saturating_add(GROUP_SIZE - 1))
}
