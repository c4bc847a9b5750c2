//! `submit`: inspect locally, upload, then save what the server generated.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    cli::SubmitArgs,
    client::{ProcessResponse, ProcessingClient},
    config::Config,
    io_utils,
    mapping::ColumnRole,
    new_session, report,
    request::OutputFormat,
    save::{self, SaveSummary, SaveTarget},
    session::SubmitOutcome,
    workbook::{self, SheetInspection, WorkbookError},
};

const LOCAL_BUNDLE_NAME: &str = "files.zip";

pub fn execute(args: &SubmitArgs, config: Config) -> Result<()> {
    let config = config.with_endpoint(args.endpoint.as_deref());
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;

    let inspection = match workbook::inspect(&args.input, encoding) {
        Ok(inspection) => inspection,
        Err(err) if err.downcast_ref::<WorkbookError>().is_some() => return Err(err),
        Err(err) => {
            warn!("Could not read {:?} locally ({err:#}); prediction unavailable", args.input);
            SheetInspection::unread(&args.input)
        }
    };

    let mut session = new_session(args.action, args.batch_size.as_deref(), &config)?;
    session.select_file(inspection)?;
    session.set_company(&args.company)?;
    session.set_output_format(args.format)?;
    session.set_output_dir(args.output_dir.clone())?;
    session.override_column(ColumnRole::Number, args.numero_col.clone())?;
    session.override_column(ColumnRole::TaxId, args.cnpj_col.clone())?;
    session.override_column(ColumnRole::Action, args.acao_col.clone())?;

    if args.format == OutputFormat::List && args.output_dir.is_none() {
        warn!("No --output-dir chosen for list output; files will be saved to the downloads folder");
    }
    info!(
        "{}",
        session
            .prediction()
            .describe(session.action().wire_value(), session.company().trim())
    );

    let request = session.begin_submit()?;
    let client = ProcessingClient::new(&config)?;
    let response = match client.process(&request) {
        Ok(response) => response,
        Err(err) => {
            session.fail(format!("{err:#}"))?;
            return Err(err.context("Processing failed"));
        }
    };
    session.complete(SubmitOutcome {
        total_files: response.total_files.unwrap_or(0),
        output_folder: response.output_folder.clone(),
    })?;
    print_response(&response);

    let target = SaveTarget {
        chosen: session.output_dir().cloned(),
        downloads: args
            .downloads_dir
            .clone()
            .unwrap_or_else(|| config.downloads_dir.clone()),
    };
    let (files, skipped) = save::decode_payloads(&response.files_data)?;
    let mut summary = save::save_files(&files, &target).context("Saving generated files")?;
    summary.skipped = skipped;
    print_save_summary(&summary);

    if args.zip {
        let archive = save_archive(&client, session.last_output_folder(), &files, &target)?;
        println!("Zip: {}", archive.display());
    }
    Ok(())
}

fn print_response(response: &ProcessResponse) {
    let total = response.total_files.unwrap_or(0);
    match &response.output_folder {
        Some(folder) => println!("Processing finished: {total} file(s) in {folder}"),
        None => println!("Processing finished: {total} file(s)"),
    }
    if let Some(lines) = response.total_lines {
        println!("Rows processed: {lines}");
    }
    if let Some(mapping) = response.column_mapping.as_ref().filter(|m| !m.is_empty()) {
        print!("\nColumns used by the server:\n{}", report::mapping_table(mapping));
    }
    if !response.preview.is_empty() {
        print!("\nPreview (first rows):\n{}", report::preview_table(&response.preview));
    }
}

fn print_save_summary(summary: &SaveSummary) {
    for path in &summary.written {
        println!("Saved {}", path.display());
    }
    for name in &summary.skipped {
        println!("Skipped {name} (no content returned)");
    }
    if summary.fallbacks > 0 {
        println!(
            "{} file(s) could not be written to the output folder and went to the downloads folder",
            summary.fallbacks
        );
    }
}

/// Server zip of the output folder, or a local bundle of the returned files.
fn save_archive(
    client: &ProcessingClient,
    server_folder: Option<&str>,
    files: &[save::DecodedFile],
    target: &SaveTarget,
) -> Result<PathBuf> {
    let dir = target.primary().to_path_buf();
    if let Some(folder) = server_folder {
        match client.download_zip(folder) {
            Ok(download) => {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Creating folder {dir:?}"))?;
                let path = dir.join(save::safe_file_name(&download.file_name)?);
                std::fs::write(&path, &download.bytes)
                    .with_context(|| format!("Writing {path:?}"))?;
                return Ok(path);
            }
            Err(err) => warn!("Server zip unavailable ({err:#}); bundling locally"),
        }
    }
    let path = dir.join(LOCAL_BUNDLE_NAME);
    save::bundle_zip(files, &path)?;
    Ok(path)
}
