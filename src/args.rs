use clap::{Parser, Subcommand};

/// This is a data entry program for ballot container manifests.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the deployment: county, scanner stations and
    /// location of the manifest.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The manifest to work on (.csv, or .xlsx to read one kept in Excel). Setting this
    /// option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub manifest: Option<String>,

    /// (default Arapahoe) The county written in the new entries. Overrides the --config option.
    #[clap(long, value_parser)]
    pub county: Option<String>,

    /// (file path) A reference manifest. If provided, bmanifest will check that the manifest
    /// matches the reference after running the command.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// When reading an Excel file, the name of the worksheet to use (the first one by default).
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Creates a new, empty manifest.
    New,
    /// Enters the batches of a container from its scanned label.
    Scan {
        /// The scanned label, for example "01/L1/LICC 01-1".
        #[clap(short, long, value_parser)]
        label: String,
        /// The 15 ballot counts, comma separated. Leave an entry empty to fill it in later.
        #[clap(long, value_parser, use_value_delimiter = true)]
        counts: Vec<String>,
        #[clap(long, value_parser, default_value = "")]
        seal1: String,
        #[clap(long, value_parser, default_value = "")]
        seal2: String,
        /// Replaces the container if it is already in the manifest.
        #[clap(long, takes_value = false)]
        overwrite: bool,
    },
    /// Changes a container, designated by its scanner and starting batch.
    Edit {
        /// The scanner, with two digits (ie. 05 or 10).
        #[clap(short, long, value_parser)]
        scanner: String,
        /// The first batch of the container (1, 16, 31, ...).
        #[clap(short, long, value_parser)]
        batch: String,
        /// The 15 new ballot counts, comma separated. The current counts are kept if omitted.
        #[clap(long, value_parser, use_value_delimiter = true)]
        counts: Option<Vec<String>>,
        #[clap(long, value_parser)]
        seal1: Option<String>,
        #[clap(long, value_parser)]
        seal2: Option<String>,
        #[clap(long, value_parser)]
        container: Option<String>,
    },
    /// Removes a container, designated by its scanner and starting batch.
    Remove {
        /// The scanner, with two digits (ie. 05 or 10).
        #[clap(short, long, value_parser)]
        scanner: String,
        /// The first batch of the container (1, 16, 31, ...).
        #[clap(short, long, value_parser)]
        batch: String,
        /// Confirms the removal.
        #[clap(long, takes_value = false)]
        yes: bool,
    },
    /// Prints the manifest.
    Show,
}
