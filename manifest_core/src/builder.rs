pub use crate::config::*;

/// Builds the 15 records of the container described by a label.
///
/// All the records share the county, the scanner, the container and the seals of the
/// container. `ballot_counts` holds the count of each batch, in batch order.
pub fn build_group(
    desc: &GroupDescriptor,
    ballot_counts: &[BallotCount],
    seal1: &str,
    seal2: &str,
    county: &str,
) -> Result<Vec<BatchRecord>, ManifestError> {
    if ballot_counts.len() != GROUP_SIZE as usize {
        return Err(ManifestError::ArityMismatch {
            expected: GROUP_SIZE as usize,
            actual: ballot_counts.len(),
        });
    }
    if crate::group_end(desc.start_batch).is_none() {
        return Err(ManifestError::InvalidBatchAlignment {
            start_batch: desc.start_batch,
        });
    }
    let records = ballot_counts
        .iter()
        .zip(0..GROUP_SIZE)
        .map(|(count, offset)| BatchRecord {
            county: county.to_string(),
            scanner: desc.scanner,
            batch_number: desc.start_batch + offset,
            ballot_count: count.clone(),
            container_number: desc.container_label.clone(),
            seal1: seal1.to_string(),
            seal2: seal2.to_string(),
        })
        .collect();
    Ok(records)
}

/// A builder for the records of one container.
///
/// ```
/// use manifest_core::builder::GroupBuilder;
/// use manifest_core::label::parse_label;
/// # use manifest_core::ManifestError;
///
/// let desc = parse_label("01/L1/LICC 01-1")?;
/// let records = GroupBuilder::new(&desc, "Arapahoe")
///     .seals("A1", "B1")
///     .ballot_counts(&["50"; 15])?
///     .build()?;
/// assert_eq!(records.len(), 15);
/// assert_eq!(records[14].batch_number, 15);
/// # Ok::<(), ManifestError>(())
/// ```
pub struct GroupBuilder {
    pub(crate) _desc: GroupDescriptor,
    pub(crate) _county: String,
    pub(crate) _seals: (String, String),
    pub(crate) _counts: Vec<BallotCount>,
}

impl GroupBuilder {
    pub fn new(desc: &GroupDescriptor, county: &str) -> GroupBuilder {
        GroupBuilder {
            _desc: desc.clone(),
            _county: county.to_string(),
            _seals: (String::new(), String::new()),
            _counts: Vec::new(),
        }
    }

    pub fn seals(self, seal1: &str, seal2: &str) -> GroupBuilder {
        GroupBuilder {
            _seals: (seal1.to_string(), seal2.to_string()),
            ..self
        }
    }

    /// Sets the counts from the entries of the form.
    ///
    /// The arity is checked here already, so that a form with a missing field is reported
    /// before anything else.
    pub fn ballot_counts(self, entries: &[&str]) -> Result<GroupBuilder, ManifestError> {
        if entries.len() != GROUP_SIZE as usize {
            return Err(ManifestError::ArityMismatch {
                expected: GROUP_SIZE as usize,
                actual: entries.len(),
            });
        }
        Ok(GroupBuilder {
            _counts: entries.iter().map(|e| BallotCount::from_entry(e)).collect(),
            ..self
        })
    }

    /// Sets the count of a single batch, given by its offset in the container.
    pub fn set_count(&mut self, offset: usize, count: BallotCount) -> Result<(), ManifestError> {
        if offset >= GROUP_SIZE as usize {
            return Err(ManifestError::ArityMismatch {
                expected: GROUP_SIZE as usize,
                actual: offset + 1,
            });
        }
        if self._counts.is_empty() {
            self._counts = vec![BallotCount::Blank; GROUP_SIZE as usize];
        }
        self._counts[offset] = count;
        Ok(())
    }

    pub fn build(&self) -> Result<Vec<BatchRecord>, ManifestError> {
        build_group(
            &self._desc,
            &self._counts,
            &self._seals.0,
            &self._seals.1,
            &self._county,
        )
    }
}
