//! Subcommand implementations.

use std::fs;

use anyhow::{Context, Result};
use tidy_ingest::{Loader, describe_accepted_formats};
use tidy_model::LoadOptions;
use tracing::info;

use crate::cli::LoadArgs;
use crate::progress::SpinnerProgress;
use crate::summary::print_output;

/// Builds load options from an optional JSON file and the command line.
///
/// Flags given on the command line replace the file's values.
pub fn build_options(args: &LoadArgs) -> Result<LoadOptions> {
    let mut options = match &args.options {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read options file {}", path.display()))?;
            serde_json::from_str::<LoadOptions>(&text)
                .with_context(|| format!("parse options file {}", path.display()))?
        }
        None => LoadOptions::default(),
    };

    if let Some(location) = &args.location {
        options = options.with_location(location.as_str());
    }
    if let Some(sep) = &args.sep {
        options = options.with_sep(sep.as_str());
    }
    if let Some(sheet) = &args.sheet {
        options = options.with_sheet(sheet.clone());
    }
    if let Some(n) = args.n_headers {
        options = options.with_n_headers(n);
    }
    if let Some(combine) = args.combine {
        options = options.with_combine_rule(combine.into());
    }
    if let Some(sep) = &args.paren_sep {
        options = options.with_parenthesis_sep(sep.as_str());
    }
    if let Some(sentinel) = &args.sentinel {
        options = options.with_sentinel(sentinel.as_str());
    }
    if let Some(cols) = &args.cols {
        options = options.with_cols(cols.iter().map(String::as_str));
    }
    if let Some(range) = args.rows {
        options = options.with_rows_range(range);
    }
    if let Some(object) = &args.object {
        options = options.with_object_name(object.as_str());
    }
    if args.url.is_some() {
        options.url.clone_from(&args.url);
    }
    if args.credentials.is_some() {
        options.credentials.clone_from(&args.credentials);
    }
    if args.silently {
        options = options.silently(true);
    }
    if args.big_data {
        options = options.big_data(true);
    }
    Ok(options)
}

/// Loads a table and prints it. Returns false when nothing was loaded.
pub fn run_load(args: &LoadArgs) -> Result<bool> {
    let options = build_options(args)?;
    let loader = Loader::new().with_progress(SpinnerProgress::new());
    let Some(output) = loader.load(&options).context("load data")? else {
        info!("no table loaded");
        return Ok(false);
    };
    print_output(output.frame(), output.labels(), args.head, args.labels);
    Ok(true)
}

pub fn run_formats() {
    print!("{}", describe_accepted_formats());
}
