//! Per-upload context and the state machine that orders user actions.
//!
//! ```text
//! Idle ──select_file──▶ FileSelected ──begin_submit──▶ Submitting ──complete──▶ Completed
//!                            ▲                              │
//!                            │                              └────fail────▶ Failed
//!                            └──────── select_file (from any settled state) ───────┘
//! ```
//!
//! While `Submitting`, every mutation is rejected, which makes a second
//! submit of the same upload an explicit error instead of a duplicate request.

use std::path::PathBuf;

use log::debug;
use thiserror::Error;

use crate::{
    mapping::{ColumnMapping, ColumnRole},
    predict::{BatchSize, Prediction, predict},
    request::{Action, OutputFormat, SubmitRequest},
    workbook::SheetInspection,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    FileSelected,
    Submitting,
    Completed { total_files: u64 },
    Failed { reason: String },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::FileSelected => "file-selected",
            SessionState::Submitting => "submitting",
            SessionState::Completed { .. } => "completed",
            SessionState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Select a spreadsheet before submitting")]
    NoFileSelected,
    #[error("A company name is required")]
    MissingCompany,
    #[error("An output format is required")]
    MissingOutputFormat,
    #[error("A submission is already in progress")]
    AlreadySubmitting,
    #[error("No submission is in progress (session is {0})")]
    NotSubmitting(&'static str),
}

/// Settled result of a submission, as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub total_files: u64,
    pub output_folder: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadSession {
    state: SessionState,
    file: Option<SheetInspection>,
    action: Action,
    company: String,
    batch_size: BatchSize,
    output_format: Option<OutputFormat>,
    output_dir: Option<PathBuf>,
    overrides: ColumnMapping,
    last_output_folder: Option<String>,
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new(Action::default(), BatchSize::default())
    }
}

impl UploadSession {
    pub fn new(action: Action, batch_size: BatchSize) -> Self {
        Self {
            state: SessionState::Idle,
            file: None,
            action,
            company: String::new(),
            batch_size,
            output_format: None,
            output_dir: None,
            overrides: ColumnMapping::default(),
            last_output_folder: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn file(&self) -> Option<&SheetInspection> {
        self.file.as_ref()
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn batch_size(&self) -> BatchSize {
        self.batch_size
    }

    pub fn output_dir(&self) -> Option<&PathBuf> {
        self.output_dir.as_ref()
    }

    pub fn last_output_folder(&self) -> Option<&str> {
        self.last_output_folder.as_deref()
    }

    fn ensure_idle_input(&self) -> Result<(), SessionError> {
        if self.state == SessionState::Submitting {
            Err(SessionError::AlreadySubmitting)
        } else {
            Ok(())
        }
    }

    /// Replaces the selected file. The company name and column overrides
    /// belong to the previous file and are cleared.
    pub fn select_file(&mut self, inspection: SheetInspection) -> Result<(), SessionError> {
        self.ensure_idle_input()?;
        debug!(
            "Selected {:?} ({} data row(s))",
            inspection.path, inspection.data_rows
        );
        self.file = Some(inspection);
        self.company.clear();
        self.overrides = ColumnMapping::default();
        self.state = SessionState::FileSelected;
        Ok(())
    }

    pub fn set_action(&mut self, action: Action) -> Result<(), SessionError> {
        self.ensure_idle_input()?;
        self.action = action;
        Ok(())
    }

    pub fn set_company(&mut self, company: &str) -> Result<(), SessionError> {
        self.ensure_idle_input()?;
        self.company = company.to_string();
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: BatchSize) -> Result<(), SessionError> {
        self.ensure_idle_input()?;
        self.batch_size = batch_size;
        Ok(())
    }

    pub fn set_output_format(&mut self, format: OutputFormat) -> Result<(), SessionError> {
        self.ensure_idle_input()?;
        self.output_format = Some(format);
        Ok(())
    }

    pub fn set_output_dir(&mut self, dir: Option<PathBuf>) -> Result<(), SessionError> {
        self.ensure_idle_input()?;
        self.output_dir = dir;
        Ok(())
    }

    pub fn override_column(
        &mut self,
        role: ColumnRole,
        header: Option<String>,
    ) -> Result<(), SessionError> {
        self.ensure_idle_input()?;
        let header = header.filter(|value| !value.trim().is_empty());
        self.overrides.set(role, header);
        Ok(())
    }

    /// Detected mapping with user overrides applied on top.
    pub fn effective_mapping(&self) -> ColumnMapping {
        let detected = self
            .file
            .as_ref()
            .and_then(|file| file.mapping.clone())
            .unwrap_or_default();
        detected.overlay(&self.overrides)
    }

    pub fn prediction(&self) -> Prediction {
        let rows = self.file.as_ref().map_or(0, |file| file.data_rows);
        predict(rows, i64::from(self.batch_size.get()))
    }

    pub fn begin_submit(&mut self) -> Result<SubmitRequest, SessionError> {
        self.ensure_idle_input()?;
        let file = self.file.as_ref().ok_or(SessionError::NoFileSelected)?;
        let company = self.company.trim();
        if company.is_empty() {
            return Err(SessionError::MissingCompany);
        }
        let output_format = self.output_format.ok_or(SessionError::MissingOutputFormat)?;
        let request = SubmitRequest {
            file: file.path.clone(),
            action: self.action,
            company: company.to_string(),
            batch_size: self.batch_size,
            output_format,
            columns: self.effective_mapping(),
        };
        self.state = SessionState::Submitting;
        Ok(request)
    }

    pub fn complete(&mut self, outcome: SubmitOutcome) -> Result<(), SessionError> {
        if self.state != SessionState::Submitting {
            return Err(SessionError::NotSubmitting(self.state.name()));
        }
        if outcome.output_folder.is_some() {
            self.last_output_folder = outcome.output_folder;
        }
        self.state = SessionState::Completed {
            total_files: outcome.total_files,
        };
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), SessionError> {
        if self.state != SessionState::Submitting {
            return Err(SessionError::NotSubmitting(self.state.name()));
        }
        self.state = SessionState::Failed {
            reason: reason.into(),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::detect_mapping;

    fn inspection(rows: u64) -> SheetInspection {
        let headers = vec!["Telefone".to_string(), "CPF".to_string()];
        SheetInspection {
            path: PathBuf::from("numeros.xlsx"),
            sheet: "Planilha1".into(),
            has_header: true,
            mapping: Some(detect_mapping(&headers)),
            headers,
            data_rows: rows,
        }
    }

    fn ready_session() -> UploadSession {
        let mut session = UploadSession::default();
        session.select_file(inspection(250)).expect("select");
        session.set_company("  SURF ").expect("company");
        session
            .set_output_format(OutputFormat::Spreadsheet)
            .expect("format");
        session
    }

    #[test]
    fn submit_requires_a_file() {
        let mut session = UploadSession::default();
        assert_eq!(session.begin_submit(), Err(SessionError::NoFileSelected));
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn submit_requires_company_and_format() {
        let mut session = UploadSession::default();
        session.select_file(inspection(10)).expect("select");
        assert_eq!(session.begin_submit(), Err(SessionError::MissingCompany));
        session.set_company("   ").expect("company");
        assert_eq!(session.begin_submit(), Err(SessionError::MissingCompany));
        session.set_company("ACME").expect("company");
        assert_eq!(
            session.begin_submit(),
            Err(SessionError::MissingOutputFormat)
        );
        assert_eq!(session.state(), &SessionState::FileSelected);
    }

    #[test]
    fn request_carries_trimmed_company_and_detected_columns() {
        let mut session = ready_session();
        session.set_batch_size(BatchSize::clamped(37)).expect("batch");
        let request = session.begin_submit().expect("submit");
        assert_eq!(request.company, "SURF");
        assert_eq!(request.batch_size.get(), 37);
        assert_eq!(request.columns.numero.as_deref(), Some("Telefone"));
        assert_eq!(request.columns.cnpj.as_deref(), Some("CPF"));
        assert_eq!(session.state(), &SessionState::Submitting);
    }

    #[test]
    fn double_submit_is_rejected() {
        let mut session = ready_session();
        session.begin_submit().expect("first submit");
        assert_eq!(session.begin_submit(), Err(SessionError::AlreadySubmitting));
        assert_eq!(
            session.set_company("other"),
            Err(SessionError::AlreadySubmitting)
        );
        assert_eq!(
            session.select_file(inspection(1)),
            Err(SessionError::AlreadySubmitting)
        );
    }

    #[test]
    fn settling_records_output_folder_and_allows_resubmit() {
        let mut session = ready_session();
        session.begin_submit().expect("submit");
        session
            .complete(SubmitOutcome {
                total_files: 3,
                output_folder: Some("/srv/uploads_SURF".into()),
            })
            .expect("complete");
        assert_eq!(session.state(), &SessionState::Completed { total_files: 3 });
        assert_eq!(session.last_output_folder(), Some("/srv/uploads_SURF"));

        session.begin_submit().expect("resubmit");
        session.fail("server down").expect("fail");
        assert_eq!(
            session.state(),
            &SessionState::Failed {
                reason: "server down".into()
            }
        );
        assert_eq!(session.last_output_folder(), Some("/srv/uploads_SURF"));
    }

    #[test]
    fn settling_without_submission_is_an_error() {
        let mut session = ready_session();
        assert_eq!(
            session.complete(SubmitOutcome::default()),
            Err(SessionError::NotSubmitting("file-selected"))
        );
        assert_eq!(
            session.fail("nope"),
            Err(SessionError::NotSubmitting("file-selected"))
        );
    }

    #[test]
    fn new_file_clears_company_and_overrides() {
        let mut session = ready_session();
        session
            .override_column(ColumnRole::TaxId, Some("Documento".into()))
            .expect("override");
        assert_eq!(
            session.effective_mapping().cnpj.as_deref(),
            Some("Documento")
        );
        session.select_file(inspection(5)).expect("reselect");
        assert_eq!(session.company(), "");
        assert_eq!(session.effective_mapping().cnpj.as_deref(), Some("CPF"));
    }

    #[test]
    fn blank_override_keeps_detected_column() {
        let mut session = ready_session();
        session
            .override_column(ColumnRole::Number, Some("  ".into()))
            .expect("override");
        assert_eq!(
            session.effective_mapping().numero.as_deref(),
            Some("Telefone")
        );
    }

    #[test]
    fn prediction_follows_batch_adjustments() {
        let mut session = ready_session();
        assert_eq!(session.prediction().file_count(), Some(3));
        session
            .set_batch_size(session.batch_size().adjust(-50))
            .expect("adjust");
        assert_eq!(session.batch_size().get(), 50);
        assert_eq!(session.prediction().file_count(), Some(5));
        assert_eq!(UploadSession::default().prediction(), Prediction::Unavailable);
    }
}
