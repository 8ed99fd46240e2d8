/*!

This is the long-form manual for `manifest_core` and `bmanifest`.

## The ballot manifest

A ballot manifest lists every batch of ballots scanned for an election, and where the
batch is physically stored. It is the starting point of a Risk Limiting Audit: auditors
draw batches at random from the manifest and retrieve them from their containers.

Batches are numbered per scanning station. Every container holds 15 consecutive batches
of one station, starting at batch 1, 16, 31, and so on. Each container carries a label with
a barcode, and two tamper seals.

## File format

The manifest is a CSV file with the following columns, in this order:

| County   | Scanner | ICC Batch | Ballot Count | Container Number | Seal 1 | Seal 2 |
|----------|---------|-----------|--------------|------------------|--------|--------|
| Arapahoe | 1       | 1         | 50           | ICC 01-1         | A1     | B1     |
| Arapahoe | 1       | 2         | 48           | ICC 01-1         | A1     | B1     |
| ...      |         |           |              |                  |        |        |

There is one row per batch, sorted by county, scanner and batch. The seals belong to the
container but are repeated on each of its 15 rows, as expected by the audit tools that
consume the manifest.

A manifest saved as an Excel workbook (`.xlsx`) with the same columns can be opened too.
It is always saved back as CSV.

## Labels

A scanned label reads `<scanner>/L<first batch>/L<container>`, for instance
`01/L1/LICC 01-1` for the first container of station 1. A label that does not have these
three parts is refused, which catches most scans of the wrong barcode.

## Editing and removing

An existing container is designated by its station code, with two digits (`05`), and its
first batch (`31`). The first batch must be the start of a container. A container can
only be removed when all its 15 batches are in the manifest; a file edited by hand that
lost some rows is reported as corrupt and left unchanged.

## Configuration

The county and the list of stations are set in a JSON file passed with `--config`:

```json
{
  "county": "Arapahoe",
  "scanners": ["01", "02", "03", "04", "05", "06", "07", "08", "09", "10"],
  "manifestPath": "Ballot Manifest.csv"
}
```

*/
