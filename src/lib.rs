pub mod cli;
pub mod client;
pub mod config;
pub mod io_utils;
pub mod link;
pub mod mapping;
pub mod predict;
pub mod report;
pub mod request;
pub mod save;
pub mod session;
pub mod submit;
pub mod workbook;

use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{ArchiveArgs, Cli, Commands, InspectArgs, LinkArgs},
    client::ProcessingClient,
    config::Config,
    predict::{BatchSize, coerce_total_rows, predict},
    request::Action,
    session::{SessionError, UploadSession},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_batcher", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;
    match cli.command {
        Commands::Inspect(args) => handle_inspect(&args, &config),
        Commands::Submit(args) => submit::execute(&args, config),
        Commands::Archive(args) => handle_archive(&args, config),
        Commands::Link(args) => handle_link(&args, config),
    }
}

/// Session seeded from the configuration, with command-line choices applied on top.
pub(crate) fn new_session(
    action: Option<Action>,
    batch_size: Option<&str>,
    config: &Config,
) -> Result<UploadSession, SessionError> {
    let mut session = UploadSession::new(config.action, config.default_batch_size());
    if let Some(action) = action {
        session.set_action(action)?;
    }
    if let Some(raw) = batch_size {
        session.set_batch_size(BatchSize::from_input(raw))?;
    }
    Ok(session)
}

fn handle_inspect(args: &InspectArgs, config: &Config) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!("Inspecting '{}'", args.input.display());
    let inspection = workbook::inspect(&args.input, encoding)
        .with_context(|| format!("Inspecting {:?}", args.input))?;

    let mut session = new_session(args.action, args.batch_size.as_deref(), config)?;
    session.select_file(inspection)?;
    if let Some(company) = &args.company {
        session.set_company(company)?;
    }

    let Some(file) = session.file() else {
        return Ok(());
    };
    print!("{}", report::inspection_summary(file));
    match &file.mapping {
        Some(mapping) => print!("\n{}", report::mapping_table(mapping)),
        None => println!("\nNo header row detected; columns will be mapped by the server."),
    }
    let prediction = match args.rows.as_deref() {
        Some(raw) => predict(coerce_total_rows(raw), i64::from(session.batch_size().get())),
        None => session.prediction(),
    };
    println!(
        "\nBatch size: {}\n{}",
        session.batch_size(),
        prediction.describe(session.action().wire_value(), session.company())
    );
    Ok(())
}

fn handle_archive(args: &ArchiveArgs, config: Config) -> Result<()> {
    let config = config.with_endpoint(args.endpoint.as_deref());
    let client = ProcessingClient::new(&config)?;
    let download = client
        .download_zip(&args.folder)
        .with_context(|| format!("Downloading zip of '{}'", args.folder))?;
    let dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.downloads_dir.clone());
    fs::create_dir_all(&dir).with_context(|| format!("Creating folder {dir:?}"))?;
    let name = save::safe_file_name(&download.file_name)?;
    let path = dir.join(name);
    fs::write(&path, &download.bytes).with_context(|| format!("Writing {path:?}"))?;
    info!("Saved {} byte(s) to {path:?}", download.bytes.len());
    println!("{}", path.display());
    Ok(())
}

fn handle_link(args: &LinkArgs, config: Config) -> Result<()> {
    let config = config.with_endpoint(args.endpoint.as_deref());
    let client = ProcessingClient::new(&config)?;
    let links = link::discover(&client);
    println!("{}", links.primary);
    if links.from_origin {
        println!("(no LAN address reported; replace localhost/127.0.0.1 with the server's IP)");
    }
    if !links.others.is_empty() {
        println!("Other addresses:");
        for url in &links.others {
            println!("  {url}");
        }
    }
    Ok(())
}
