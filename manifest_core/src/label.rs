//! Reading and writing container labels.
//!
//! A container label is printed as a 3 of 9 barcode. Once scanned, it reads as
//! `<scanner>/L<first batch>/L<container name>`, for example `01/L1/LICC 01-1`.

use log::debug;

pub use crate::config::*;

/// The separator between the parts of a scanned label.
pub const LABEL_DELIMITER: &str = "/L";

/// Parses a scanned label into the description of a group of batches.
///
/// Only the shape of the label is checked here. Whether the scanner is known and the batch
/// starts a container is decided by the store, which applies the same rules to the labels
/// synthesized by the edit path.
///
/// ```
/// use manifest_core::label::parse_label;
///
/// let desc = parse_label("01/L1/LICC 01-1")?;
/// assert_eq!(desc.scanner, 1);
/// assert_eq!(desc.start_batch, 1);
/// assert_eq!(desc.container_label, "ICC 01-1");
/// # Ok::<(), manifest_core::ManifestError>(())
/// ```
pub fn parse_label(raw: &str) -> Result<GroupDescriptor, ManifestError> {
    let fields: Vec<&str> = raw.split(LABEL_DELIMITER).collect();
    debug!("parse_label: raw: {:?} fields: {:?}", raw, fields);
    match fields.as_slice() {
        [scanner, start, container] => Ok(GroupDescriptor {
            scanner: parse_number("scanner", scanner)?,
            start_batch: parse_number("starting batch", start)?,
            container_label: container.to_string(),
        }),
        _ => Err(ManifestError::MalformedLabel {
            label: raw.to_string(),
            num_fields: fields.len(),
        }),
    }
}

/// Renders a descriptor the way it would be scanned.
pub fn encode_label(desc: &GroupDescriptor) -> String {
    format!(
        "{}{}{}{}{}",
        station_code(desc.scanner),
        LABEL_DELIMITER,
        desc.start_batch,
        LABEL_DELIMITER,
        desc.container_label
    )
}

/// The two-digit code of a scanner station.
pub fn station_code(scanner: u32) -> String {
    format!("{:02}", scanner)
}

/// The name printed on the containers: `ICC <station>-<container index>`.
///
/// Containers are numbered from 1 for each station, so the batches 16 to 30 of station 3
/// are in `ICC 03-2`.
pub fn default_container_label(scanner: u32, start_batch: u32) -> String {
    format!(
        "ICC {}-{}",
        station_code(scanner),
        start_batch.saturating_sub(1) / GROUP_SIZE + 1
    )
}

pub(crate) fn parse_number(field: &'static str, value: &str) -> Result<u32, ManifestError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ManifestError::InvalidField {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scanned_label() {
        let desc = parse_label("01/L1/LICC 01-1").unwrap();
        assert_eq!(
            desc,
            GroupDescriptor {
                scanner: 1,
                start_batch: 1,
                container_label: "ICC 01-1".to_string(),
            }
        );
    }

    #[test]
    fn container_label_is_kept_verbatim() {
        let desc = parse_label("10/L136/L ICC 10-10 ").unwrap();
        assert_eq!(desc.scanner, 10);
        assert_eq!(desc.start_batch, 136);
        assert_eq!(desc.container_label, " ICC 10-10 ");
    }

    #[test]
    fn two_fields_is_malformed() {
        assert_eq!(
            parse_label("01/LICC 01-1"),
            Err(ManifestError::MalformedLabel {
                label: "01/LICC 01-1".to_string(),
                num_fields: 2
            })
        );
    }

    #[test]
    fn four_fields_is_malformed() {
        assert!(matches!(
            parse_label("01/L1/LICC/L01-1"),
            Err(ManifestError::MalformedLabel { num_fields: 4, .. })
        ));
        assert!(matches!(
            parse_label(""),
            Err(ManifestError::MalformedLabel { num_fields: 1, .. })
        ));
    }

    #[test]
    fn numeric_fields_must_be_numbers() {
        assert!(matches!(
            parse_label("AB/L1/LICC 01-1"),
            Err(ManifestError::InvalidField {
                field: "scanner",
                ..
            })
        ));
        assert!(matches!(
            parse_label("01/Lone/LICC 01-1"),
            Err(ManifestError::InvalidField {
                field: "starting batch",
                ..
            })
        ));
    }

    #[test]
    fn no_range_check_when_parsing() {
        // Unaligned batches and unknown stations are rejected later, by the store.
        let desc = parse_label("42/L7/Lsomewhere").unwrap();
        assert_eq!(desc.scanner, 42);
        assert_eq!(desc.start_batch, 7);
    }

    #[test]
    fn synthesized_labels_parse_back() {
        let desc = GroupDescriptor {
            scanner: 5,
            start_batch: 31,
            container_label: default_container_label(5, 31),
        };
        assert_eq!(desc.container_label, "ICC 05-3");
        assert_eq!(encode_label(&desc), "05/L31/LICC 05-3");
        assert_eq!(parse_label(&encode_label(&desc)).unwrap(), desc);
    }
}
