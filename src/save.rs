//! Writes the files returned by the server to disk.
//!
//! The chosen output directory is tried first; a file that cannot be written
//! there goes to the downloads directory instead. Entries the server sent
//! without content are skipped.

use std::{
    collections::HashSet,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::{debug, info, warn};
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::client::FilePayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<String>,
    pub fallbacks: usize,
}

/// Where decoded files go: an explicitly chosen folder, or only the downloads folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTarget {
    pub chosen: Option<PathBuf>,
    pub downloads: PathBuf,
}

impl SaveTarget {
    pub fn primary(&self) -> &Path {
        self.chosen.as_deref().unwrap_or(&self.downloads)
    }
}

/// Decodes every payload that carries content; returns the decoded files and
/// the names that were skipped. Names that collide once reduced to their last
/// component get a numeric suffix.
pub fn decode_payloads(payloads: &[FilePayload]) -> Result<(Vec<DecodedFile>, Vec<String>)> {
    let mut decoded = Vec::with_capacity(payloads.len());
    let mut skipped = Vec::new();
    let mut taken = HashSet::new();
    for payload in payloads {
        let Some(content) = payload.content_b64.as_deref().filter(|c| !c.is_empty()) else {
            debug!("Server sent no content for '{}'", payload.name);
            skipped.push(payload.name.clone());
            continue;
        };
        let base = safe_file_name(&payload.name)?;
        let name = unique_name(base.clone(), &mut taken);
        if name != base {
            warn!("'{}' would overwrite '{base}'; saving it as '{name}'", payload.name);
        }
        let bytes = STANDARD
            .decode(content.trim())
            .with_context(|| format!("Decoding base64 content of '{}'", payload.name))?;
        decoded.push(DecodedFile { name, bytes });
    }
    Ok((decoded, skipped))
}

/// Keeps only the final path component so a payload name cannot escape the target folder.
pub fn safe_file_name(name: &str) -> Result<String> {
    let candidate = name
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .unwrap_or_default();
    if candidate.is_empty() || candidate == "." || candidate == ".." {
        return Err(anyhow!("Invalid file name '{name}' in server response"));
    }
    Ok(candidate.to_string())
}

/// `lote.csv`, then `lote_2.csv`, `lote_3.csv`... for each repeat.
fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, format!(".{extension}")),
        _ => (name.as_str(), String::new()),
    };
    let mut counter = 2;
    loop {
        let candidate = format!("{stem}_{counter}{extension}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

pub fn save_files(files: &[DecodedFile], target: &SaveTarget) -> Result<SaveSummary> {
    let mut summary = SaveSummary::default();
    if files.is_empty() {
        return Ok(summary);
    }
    let chosen_ready = match &target.chosen {
        Some(dir) => match fs::create_dir_all(dir) {
            Ok(()) => true,
            Err(err) => {
                warn!("Cannot use output folder {dir:?} ({err}); saving to {:?}", target.downloads);
                false
            }
        },
        None => false,
    };

    for file in files {
        if chosen_ready && let Some(dir) = &target.chosen {
            let path = dir.join(&file.name);
            match fs::write(&path, &file.bytes) {
                Ok(()) => {
                    summary.written.push(path);
                    continue;
                }
                Err(err) => warn!("Writing {path:?} failed ({err}); saving to downloads instead"),
            }
        }
        if target.chosen.is_some() {
            summary.fallbacks += 1;
        }
        fs::create_dir_all(&target.downloads)
            .with_context(|| format!("Creating downloads folder {:?}", target.downloads))?;
        let path = target.downloads.join(&file.name);
        fs::write(&path, &file.bytes).with_context(|| format!("Writing {path:?}"))?;
        summary.written.push(path);
    }
    info!(
        "Saved {} file(s) to {:?}",
        summary.written.len(),
        target.primary()
    );
    Ok(summary)
}

/// Bundles the decoded files into a single deflated zip archive at `path`.
pub fn bundle_zip(files: &[DecodedFile], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Creating folder {parent:?}"))?;
    }
    let file = File::create(path).with_context(|| format!("Creating archive {path:?}"))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    for entry in files {
        writer
            .start_file(entry.name.as_str(), options)
            .with_context(|| format!("Adding '{}' to archive", entry.name))?;
        writer
            .write_all(&entry.bytes)
            .with_context(|| format!("Writing '{}' into archive", entry.name))?;
    }
    writer.finish().context("Finalizing zip archive")?;
    info!("Bundled {} file(s) into {path:?}", files.len());
    Ok(())
}
