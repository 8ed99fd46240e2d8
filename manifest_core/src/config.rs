// ********* Record data structures ***********

use std::error::Error;
use std::fmt::Display;

/// Number of ballot batches stored in one physical container.
pub const GROUP_SIZE: u32 = 15;

/// The value entered for the number of ballots in a batch.
///
/// Operators fill in the counts as they go, so a batch may stay blank for a while.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum BallotCount {
    /// Nothing entered yet.
    Blank,
    /// A count that reads as a whole number.
    Count(u64),
    /// Any other entry. It is kept verbatim, counts are not checked against ground truth.
    Text(String),
}

impl BallotCount {
    /// Interprets an entry from the form or from a manifest cell.
    ///
    /// Spreadsheet tools write whole numbers as `50.0`, so a zero fraction is accepted.
    /// Any other notation is kept as text.
    pub fn from_entry(entry: &str) -> BallotCount {
        let s = entry.trim();
        if s.is_empty() {
            return BallotCount::Blank;
        }
        let digits = match s.split_once('.') {
            Some((whole, zeros)) if !zeros.is_empty() && zeros.bytes().all(|b| b == b'0') => whole,
            _ => s,
        };
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = digits.parse::<u64>() {
                return BallotCount::Count(n);
            }
        }
        BallotCount::Text(s.to_string())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, BallotCount::Blank)
    }
}

impl Display for BallotCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallotCount::Blank => Ok(()),
            BallotCount::Count(n) => write!(f, "{}", n),
            BallotCount::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for BallotCount {
    fn from(entry: &str) -> Self {
        BallotCount::from_entry(entry)
    }
}

impl From<u64> for BallotCount {
    fn from(n: u64) -> Self {
        BallotCount::Count(n)
    }
}

/// The composite identity of a batch record.
///
/// The derived ordering (county, then scanner, then batch number) is the order in which
/// the manifest is displayed and persisted.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct RecordKey {
    pub county: String,
    pub scanner: u32,
    pub batch_number: u32,
}

impl RecordKey {
    pub fn new(county: &str, scanner: u32, batch_number: u32) -> RecordKey {
        RecordKey {
            county: county.to_string(),
            scanner,
            batch_number,
        }
    }
}

/// One physical ballot batch, i.e. one row of the manifest.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct BatchRecord {
    pub county: String,
    pub scanner: u32,
    pub batch_number: u32,
    pub ballot_count: BallotCount,
    pub container_number: String,
    pub seal1: String,
    pub seal2: String,
}

impl BatchRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.county, self.scanner, self.batch_number)
    }
}

/// The content of a container label, as read from a scan.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct GroupDescriptor {
    pub scanner: u32,
    pub start_batch: u32,
    pub container_label: String,
}

// ******** Errors *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ManifestError {
    /// The scan does not have the three parts of a container label.
    MalformedLabel { label: String, num_fields: usize },
    /// A numeric part of a label or of a typed-in target is not a number.
    InvalidField { field: &'static str, value: String },
    /// The starting batch is not the first batch of a container.
    InvalidBatchAlignment { start_batch: u32 },
    UnknownScanner { scanner: String },
    /// At least one record of the group is already in the manifest.
    GroupConflict { key: RecordKey },
    GroupNotFound { key: RecordKey },
    /// A group is incomplete or its records do not describe the same container.
    CorruptGroup { key: RecordKey, reason: String },
    ArityMismatch { expected: usize, actual: usize },
    /// The replacement records of an overwrite belong to another group.
    TargetMismatch { target: RecordKey, actual: RecordKey },
}

impl Error for ManifestError {}

impl Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestError::MalformedLabel { label, num_fields } => write!(
                f,
                "The label {:?} is not a container label: expected 3 fields, found {}",
                label, num_fields
            ),
            ManifestError::InvalidField { field, value } => {
                write!(f, "The {} {:?} is not a number", field, value)
            }
            ManifestError::InvalidBatchAlignment { start_batch } => write!(
                f,
                "Batch {} is not the start of a container (the start of a group of {} is 1, 16, 31, ...)",
                start_batch, GROUP_SIZE
            ),
            ManifestError::UnknownScanner { scanner } => write!(
                f,
                "Unknown scanner {:?}: scanners are entered with two digits (ie. 05 or 10)",
                scanner
            ),
            ManifestError::GroupConflict { key } => write!(
                f,
                "Scanner {:02} batch {} is already in the manifest",
                key.scanner, key.batch_number
            ),
            ManifestError::GroupNotFound { key } => write!(
                f,
                "No entry in the manifest for scanner {:02} starting at batch {}",
                key.scanner, key.batch_number
            ),
            ManifestError::CorruptGroup { key, reason } => write!(
                f,
                "The group for scanner {:02} starting at batch {} is corrupt: {}",
                key.scanner, key.batch_number, reason
            ),
            ManifestError::ArityMismatch { expected, actual } => {
                write!(f, "Expected {} batches, got {}", expected, actual)
            }
            ManifestError::TargetMismatch { target, actual } => write!(
                f,
                "Cannot replace scanner {:02} batch {} with records for scanner {:02} batch {}",
                target.scanner, target.batch_number, actual.scanner, actual.batch_number
            ),
        }
    }
}

// ********* Configuration **********

/// The rules of one deployment of the manifest software.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ManifestRules {
    /// Written in every record created by this deployment.
    pub county: String,
    /// The recognized station codes, with two characters each.
    pub scanners: Vec<String>,
}

impl ManifestRules {
    pub const DEFAULT_COUNTY: &'static str = "Arapahoe";

    pub fn default_scanners() -> Vec<String> {
        (1..=10).map(|i| format!("{:02}", i)).collect()
    }

    pub fn new(county: &str) -> ManifestRules {
        ManifestRules {
            county: county.to_string(),
            scanners: ManifestRules::default_scanners(),
        }
    }

    pub fn is_known_scanner(&self, code: &str) -> bool {
        code.chars().count() == 2 && self.scanners.iter().any(|s| s == code)
    }
}

impl Default for ManifestRules {
    fn default() -> Self {
        ManifestRules::new(ManifestRules::DEFAULT_COUNTY)
    }
}
