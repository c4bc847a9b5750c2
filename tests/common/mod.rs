#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use axum::extract::{Json, Multipart};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tokio::net::TcpListener;

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Sheet with a `Telefone,CNPJ,Ação` header followed by `rows` data rows.
    pub fn write_numbers_csv(&self, name: &str, rows: usize) -> PathBuf {
        let mut contents = String::from("Telefone,CNPJ,Ação\n");
        for idx in 0..rows {
            contents.push_str(&format!("1199999{idx:04},12345678000199,criar\n"));
        }
        self.write(name, &contents)
    }
}

pub const BATCH_ONE: &str = "numero,acao\n11999990000,criar\n";
pub const BATCH_TWO: &str = "numero,acao\n11999990001,criar\n";
pub const REPORTED_IPS: [&str; 2] = ["192.168.0.10", "10.0.0.5"];
pub const REPORTED_PORT: u16 = 5000;
pub const MOCK_ZIP_BODY: &[u8] = b"PK mock archive";

/// Processing server stand-in listening on an ephemeral localhost port.
///
/// `/api/processar` answers with two batch files, a `request.json` echoing the
/// multipart fields it received and one entry without content. A company named
/// `fail` is rejected; output folders containing `missing` cannot be zipped.
pub struct MockServer {
    pub base_url: String,
}

impl MockServer {
    pub fn start() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .expect("mock runtime");
            runtime.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind mock server");
                let addr = listener.local_addr().expect("mock address");
                tx.send(addr).expect("report mock address");
                axum::serve(listener, router())
                    .await
                    .expect("serve mock server");
            });
        });
        let addr = rx.recv().expect("mock server started");
        Self {
            base_url: format!("http://{addr}"),
        }
    }
}

fn router() -> Router {
    Router::new()
        .route("/api/processar", post(process))
        .route("/api/download_zip", post(download_zip))
        .route("/api/hostinfo", get(host_info))
}

async fn process(mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    let mut fields = BTreeMap::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.expect("file bytes");
            fields.insert("file".to_string(), file_name);
            fields.insert("file_size".to_string(), bytes.len().to_string());
        } else {
            let value = field.text().await.expect("text field");
            fields.insert(name, value);
        }
    }

    let company = fields.get("company").cloned().unwrap_or_default();
    if company == "fail" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "company not found" })),
        );
    }
    let action = fields.get("action").cloned().unwrap_or_default();
    let echo = serde_json::to_string_pretty(&fields).expect("echo fields");
    let body = json!({
        "success": true,
        "total_files": 4,
        "total_lines": 2,
        "output_folder": format!("output/{company}_{action}"),
        "requested_format": fields.get("output_format"),
        "files_data": [
            { "name": "lote_1.csv", "content_b64": STANDARD.encode(BATCH_ONE) },
            { "name": "lote_2.csv", "content_b64": STANDARD.encode(BATCH_TWO) },
            { "name": "request.json", "content_b64": STANDARD.encode(echo) },
            { "name": "sem_conteudo.csv" }
        ],
        "column_mapping": {
            "numero": fields.get("numero_col").cloned().unwrap_or_else(|| "Telefone".to_string()),
            "cnpj": "CNPJ",
            "acao": null
        },
        "preview": [
            { "numero": 11999990000u64, "acao": "criar", "cnpj": "12345678000199" }
        ]
    });
    (StatusCode::OK, Json(body))
}

async fn download_zip(Json(body): Json<Value>) -> Response {
    let folder = body["folder"].as_str().unwrap_or_default().to_string();
    if folder.is_empty() || folder.contains("missing") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "folder not found" })),
        )
            .into_response();
    }
    let name = folder.rsplit('/').next().unwrap_or("files").to_string();
    (
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}.zip\""),
            ),
        ],
        MOCK_ZIP_BODY.to_vec(),
    )
        .into_response()
}

async fn host_info() -> Json<Value> {
    Json(json!({ "success": true, "ips": REPORTED_IPS, "port": REPORTED_PORT }))
}
