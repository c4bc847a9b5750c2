use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::request::{Action, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Inspect number-registration spreadsheets and submit them for batch processing",
    long_about = None
)]
pub struct Cli {
    /// YAML configuration file (falls back to $SHEET_BATCHER_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Count rows, detect the column mapping and predict the number of output files
    Inspect(InspectArgs),
    /// Upload a spreadsheet to the processing server and save the generated files
    Submit(SubmitArgs),
    /// Download a zip of a server output folder
    Archive(ArchiveArgs),
    /// Print the network addresses other machines can use to reach the server
    Link(LinkArgs),
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Spreadsheet to inspect (.xlsx, .xls, .ods, .csv, .tsv)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Rows per output file, clamped to 1..=100 (non-numeric values count as 1)
    #[arg(short = 'b', long = "batch-size", allow_hyphen_values = true)]
    pub batch_size: Option<String>,
    /// Predict from this row count instead of the rows counted in the file
    #[arg(long = "rows", allow_hyphen_values = true)]
    pub rows: Option<String>,
    /// Action shown alongside the prediction (defaults to the configured action)
    #[arg(short = 'a', long = "action", value_enum)]
    pub action: Option<Action>,
    /// Company name shown alongside the prediction
    #[arg(short = 'c', long = "company")]
    pub company: Option<String>,
    /// Character encoding of .csv/.tsv input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Spreadsheet to upload
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Company name used to label the generated files
    #[arg(short = 'c', long = "company")]
    pub company: String,
    /// Output format requested from the server
    #[arg(short = 'f', long = "format", value_enum)]
    pub format: OutputFormat,
    /// Action applied to every number (defaults to the configured action)
    #[arg(short = 'a', long = "action", value_enum)]
    pub action: Option<Action>,
    /// Rows per output file, clamped to 1..=100 (non-numeric values count as 1)
    #[arg(short = 'b', long = "batch-size", allow_hyphen_values = true)]
    pub batch_size: Option<String>,
    /// Header of the number/phone column, overriding detection
    #[arg(long = "numero-col")]
    pub numero_col: Option<String>,
    /// Header of the CPF/CNPJ column, overriding detection
    #[arg(long = "cnpj-col")]
    pub cnpj_col: Option<String>,
    /// Header of the action column, overriding detection
    #[arg(long = "acao-col")]
    pub acao_col: Option<String>,
    /// Folder to save the generated files into
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Fallback folder for files that cannot be saved to the output folder
    #[arg(long = "downloads-dir")]
    pub downloads_dir: Option<PathBuf>,
    /// Also save a zip with every generated file
    #[arg(long = "zip")]
    pub zip: bool,
    /// Base URL of the processing server
    #[arg(long = "endpoint")]
    pub endpoint: Option<String>,
    /// Character encoding of .csv/.tsv input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ArchiveArgs {
    /// Output folder reported by the server after processing
    #[arg(long = "folder")]
    pub folder: String,
    /// Folder to save the zip into (defaults to the downloads folder)
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Base URL of the processing server
    #[arg(long = "endpoint")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    /// Base URL of the processing server
    #[arg(long = "endpoint")]
    pub endpoint: Option<String>,
}
