mod args;
mod manifest;

use clap::Parser;
use log::{info, warn, LevelFilter};
use manifest_core::*;
use snafu::ErrorCompat;

use crate::args::{Args, Command};
use crate::manifest::*;

fn run(args: &Args) -> BManifestResult<()> {
    let (rules, manifest_path, worksheet_name) = resolve_deployment(
        args.config.as_deref(),
        args.county.as_deref(),
        args.manifest.as_deref(),
    )?;
    info!("rules: {:?}", rules);
    let path = manifest_path.ok_or_else(|| Box::new(ManifestIoError::NoOpenManifest {}))?;
    let worksheet_name = args.excel_worksheet_name.clone().or(worksheet_name);

    let store = match &args.command {
        Command::New => io_csv::create_template(&path, &rules)?,
        cmd => {
            let mut store = open_manifest(&path, &rules, worksheet_name.as_deref())?;
            run_command(&mut store, cmd)?;
            store
        }
    };

    if let Some(reference) = &args.reference {
        check_reference(&store, reference)?;
    }
    Ok(())
}

fn run_command(store: &mut ManifestStore, cmd: &Command) -> BManifestResult<()> {
    match cmd {
        Command::New => {}
        Command::Scan {
            label,
            counts,
            seal1,
            seal2,
            overwrite,
        } => {
            let outcome = submit_scan(store, label, counts, seal1, seal2, |desc| {
                if !*overwrite {
                    warn!(
                        "Scanner {:02} batch {} is already in the manifest, \
                         pass --overwrite to replace it",
                        desc.scanner, desc.start_batch
                    );
                }
                *overwrite
            })?;
            println!("{:?}: {}", outcome, label);
        }
        Command::Edit {
            scanner,
            batch,
            counts,
            seal1,
            seal2,
            container,
        } => {
            let edit = GroupEdit {
                ballot_counts: counts.clone(),
                seal1: seal1.clone(),
                seal2: seal2.clone(),
                container: container.clone(),
            };
            let records = edit_entry(store, scanner, batch, &edit)?;
            println!("Edited {} batches", records.len());
        }
        Command::Remove {
            scanner,
            batch,
            yes,
        } => {
            let removed = remove_entry(store, scanner, batch, |_, _| *yes)?;
            match removed {
                Some(records) => println!("Removed {} batches", records.len()),
                None => println!("Entry found in manifest, pass --yes to remove it"),
            }
        }
        Command::Show => {
            print!("{}", io_csv::to_csv_string(store)?);
            for (county, scanner, start) in store.incomplete_groups() {
                warn!(
                    "Incomplete container: {} scanner {:02} starting at batch {}",
                    county, scanner, start
                );
            }
            println!("digest: {}", store.digest());
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if args.verbose {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }
    info!("args: {:?}", args);

    if let Err(e) = run(&args) {
        eprintln!("An error occured {}", e);
        if e.is_write_denied() {
            eprintln!("The changes were not saved.");
            eprintln!("Close the manifest in other programs and try again.");
        } else if e.is_unreadable_source() {
            eprintln!("Please select a CSV manifest with the columns County, Scanner, ICC Batch,");
            eprintln!("Ballot Count, Container Number, Seal 1 and Seal 2.");
        } else if let Some(ManifestError::InvalidBatchAlignment { .. })
        | Some(ManifestError::UnknownScanner { .. }) = e.manifest_error()
        {
            eprintln!("Make sure that the scanner is entered with two numbers (ie. 05 or 10)");
            eprintln!("and that the batch starts a group of 15 (ie. 1, 16 or 31).");
        }
        if let Some(bt) = ErrorCompat::backtrace(e.as_ref()) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
