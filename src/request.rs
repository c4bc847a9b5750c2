use std::{fmt, path::PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{mapping::ColumnMapping, predict::BatchSize};

/// What the server should do with each number in the sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    #[default]
    #[value(alias = "criar")]
    #[serde(alias = "criar")]
    Create,
    #[value(alias = "alterar")]
    #[serde(alias = "alterar")]
    Update,
    #[value(alias = "deletar")]
    #[serde(alias = "deletar")]
    Delete,
}

impl Action {
    pub fn wire_value(self) -> &'static str {
        match self {
            Action::Create => "criar",
            Action::Update => "alterar",
            Action::Delete => "deletar",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_value())
    }
}

/// Layout of the generated files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// One CSV per batch
    #[value(alias = "planilha")]
    Spreadsheet,
    /// One XLSX per batch with list-style numbers
    #[value(alias = "lista")]
    List,
}

impl OutputFormat {
    pub fn wire_value(self) -> &'static str {
        match self {
            OutputFormat::Spreadsheet => "planilha",
            OutputFormat::List => "lista",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_value())
    }
}

/// Everything needed for one upload, frozen when the session starts submitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub file: PathBuf,
    pub action: Action,
    pub company: String,
    pub batch_size: BatchSize,
    pub output_format: OutputFormat,
    pub columns: ColumnMapping,
}

impl SubmitRequest {
    /// Text form fields in the order the server reads them.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("action", self.action.wire_value().to_string()),
            ("company", self.company.clone()),
            ("batchSize", self.batch_size.to_string()),
            ("output_format", self.output_format.wire_value().to_string()),
        ];
        if let Some(column) = &self.columns.numero {
            fields.push(("numero_col", column.clone()));
        }
        if let Some(column) = &self.columns.cnpj {
            fields.push(("cnpj_col", column.clone()));
        }
        if let Some(column) = &self.columns.acao {
            fields.push(("acao_col", column.clone()));
        }
        fields
    }
}
