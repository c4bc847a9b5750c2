//! Blocking HTTP client for the batch processing server.
//!
//! Three endpoints are used:
//!
//! - `POST /api/processar` (multipart): uploads the sheet and options, returns
//!   the generated files inline as base64.
//! - `POST /api/download_zip` (JSON): returns a zip of a server output folder.
//! - `GET /api/hostinfo`: lists the server's LAN addresses.

use std::{sync::OnceLock, time::Duration};

use anyhow::{Context, Result};
use log::{debug, info};
use regex::Regex;
use reqwest::{
    Url,
    blocking::{Client, multipart::Form},
    header::CONTENT_DISPOSITION,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{config::Config, mapping::ColumnMapping, request::SubmitRequest};

const PROCESS_PATH: &str = "/api/processar";
const DOWNLOAD_ZIP_PATH: &str = "/api/download_zip";
const HOST_INFO_PATH: &str = "/api/hostinfo";
const DEFAULT_ZIP_NAME: &str = "files.zip";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Server rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FilePayload {
    pub name: String,
    #[serde(default)]
    pub content_b64: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PreviewRow {
    #[serde(default)]
    pub numero: Value,
    #[serde(default)]
    pub acao: Value,
    #[serde(default)]
    pub cnpj: Value,
}

impl PreviewRow {
    pub fn cells(&self) -> Vec<String> {
        [&self.numero, &self.acao, &self.cnpj]
            .into_iter()
            .map(display_json)
            .collect()
    }
}

fn display_json(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProcessResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub total_files: Option<u64>,
    #[serde(default)]
    pub total_lines: Option<u64>,
    #[serde(default)]
    pub output_folder: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub files_data: Vec<FilePayload>,
    #[serde(default)]
    pub column_mapping: Option<ColumnMapping>,
    #[serde(default)]
    pub preview: Vec<PreviewRow>,
    #[serde(default)]
    pub requested_format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct HostInfo {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub ips: Vec<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

pub struct ProcessingClient {
    client: Client,
    base_url: Url,
}

impl ProcessingClient {
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid endpoint URL '{}'", config.endpoint))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("sheet-batcher/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Building HTTP client")?;
        debug!(
            "HTTP client for {base_url} (timeout {}s)",
            config.timeout_secs
        );
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Building URL for {path}"))
    }

    pub fn process(&self, request: &SubmitRequest) -> Result<ProcessResponse> {
        let url = self.endpoint(PROCESS_PATH)?;
        let mut form = Form::new()
            .file("file", &request.file)
            .with_context(|| format!("Attaching {:?} to the upload", request.file))?;
        for (name, value) in request.form_fields() {
            form = form.text(name, value);
        }
        info!("Uploading {:?} to {url}", request.file);
        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .with_context(|| format!("Sending upload to {url}"))?;
        let status = response.status();
        let body: ProcessResponse = response
            .json()
            .with_context(|| format!("Parsing processing response (HTTP {status})"))?;
        if !status.is_success() || !body.success {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: body
                    .error
                    .unwrap_or_else(|| "unknown server error".to_string()),
            }
            .into());
        }
        Ok(body)
    }

    pub fn download_zip(&self, folder: &str) -> Result<ZipDownload> {
        let url = self.endpoint(DOWNLOAD_ZIP_PATH)?;
        let response = self
            .client
            .post(url.clone())
            .json(&serde_json::json!({ "folder": folder }))
            .send()
            .with_context(|| format!("Requesting zip from {url}"))?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| "failed to build zip".to_string());
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            }
            .into());
        }
        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_file_name)
            .unwrap_or_else(|| DEFAULT_ZIP_NAME.to_string());
        let bytes = response.bytes().context("Reading zip body")?.to_vec();
        Ok(ZipDownload { file_name, bytes })
    }

    pub fn host_info(&self) -> Result<HostInfo> {
        let url = self.endpoint(HOST_INFO_PATH)?;
        let info = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("Requesting {url}"))?
            .error_for_status()?
            .json::<HostInfo>()
            .context("Parsing host info")?;
        Ok(info)
    }
}

pub fn attachment_file_name(header: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r#"filename="?([^";]+)"?"#).expect("filename pattern is valid"));
    pattern
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}
