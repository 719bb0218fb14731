use thiserror::Error;

use crate::protocol::{ProtocolClient, ProtocolError, ResultArtifact, Submission};
use crate::selection::{AnalysisKind, AnalysisSelection, ValidationError, validate};
use crate::transport::Transport;
use crate::upload::UploadedFile;

pub const ANALYSIS_FAILED_PREFIX: &str = "Analysis failed: ";

/// The whole UI is in exactly one of these at any time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    Results(Vec<ResultArtifact>),
    Error(String),
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn results(&self) -> Option<&[ResultArtifact]> {
        match self {
            SessionState::Results(items) => Some(items),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SessionState::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunRejected {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("an analysis run is already in progress")]
    Busy,
}

/// Everything the worker needs for one submission.
#[derive(Debug, Clone)]
pub struct RunJob {
    pub run_id: u64,
    pub file: UploadedFile,
    pub analyses: Vec<AnalysisKind>,
}

#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    selection: AnalysisSelection,
    file: Option<UploadedFile>,
    session: SessionState,
    next_run_id: u64,
    in_flight: Option<u64>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> AnalysisSelection {
        self.selection
    }

    pub fn file(&self) -> Option<&UploadedFile> {
        self.file.as_ref()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    pub fn toggle(&mut self, kind: AnalysisKind) -> AnalysisSelection {
        self.selection = self.selection.toggle(kind);
        self.selection
    }

    /// Replaces the file wholesale. A pending error is dropped; earlier
    /// results stay until the next run starts.
    pub fn select_file(&mut self, file: UploadedFile) {
        self.file = Some(file);
        if matches!(self.session, SessionState::Error(_)) {
            self.session = SessionState::Idle;
        }
    }

    /// Inline hint shown while the selection is inconsistent and no error is
    /// already on screen.
    pub fn speed_warning(&self) -> Option<ValidationError> {
        if self.selection.speed_without_tracking() && self.session.error().is_none() {
            Some(ValidationError::SpeedRequiresTracking)
        } else {
            None
        }
    }

    /// Validates and enters `Loading`. Validation failures go straight to
    /// `Error` without touching the network; a second call while a run is
    /// outstanding is rejected and changes nothing.
    pub fn begin_run(&mut self) -> Result<RunJob, RunRejected> {
        if self.in_flight.is_some() || self.session.is_loading() {
            return Err(RunRejected::Busy);
        }
        if let Err(violation) = validate(&self.selection, self.file.is_some()) {
            self.session = SessionState::Error(violation.to_string());
            return Err(violation.into());
        }
        let Some(file) = self.file.clone() else {
            self.session = SessionState::Error(ValidationError::FileRequired.to_string());
            return Err(ValidationError::FileRequired.into());
        };

        self.next_run_id += 1;
        let run_id = self.next_run_id;
        self.in_flight = Some(run_id);
        self.session = SessionState::Loading;

        Ok(RunJob {
            run_id,
            file,
            analyses: self.selection.requested(),
        })
    }

    /// Leaves `Loading` for `Results` or `Error`. Returns false when the
    /// completion belongs to a run that is no longer outstanding.
    pub fn finish_run(
        &mut self,
        run_id: u64,
        outcome: Result<Vec<ResultArtifact>, ProtocolError>,
    ) -> bool {
        if !self.is_outstanding(run_id) {
            return false;
        }
        self.in_flight = None;
        self.session = match outcome {
            Ok(artifacts) => SessionState::Results(artifacts),
            Err(err) => SessionState::Error(format!("{ANALYSIS_FAILED_PREFIX}{err}")),
        };
        true
    }

    /// Ends an outstanding run that never reached the service.
    pub fn abort_run(&mut self, run_id: u64, reason: &str) -> bool {
        if !self.is_outstanding(run_id) {
            return false;
        }
        self.in_flight = None;
        self.session = SessionState::Error(format!("{ANALYSIS_FAILED_PREFIX}{reason}"));
        true
    }

    fn is_outstanding(&self, run_id: u64) -> bool {
        self.in_flight == Some(run_id) && self.session.is_loading()
    }

    /// Blocking run on the caller's thread.
    pub fn run<T: Transport>(
        &mut self,
        client: &ProtocolClient<T>,
    ) -> Result<Submission, RunOutcomeError> {
        let job = self.begin_run()?;
        let outcome = client.submit(&job.file, &job.analyses);
        drop(job.file);
        match outcome {
            Ok(submission) => {
                self.finish_run(job.run_id, Ok(submission.artifacts.clone()));
                Ok(submission)
            }
            Err(err) => {
                self.finish_run(job.run_id, Err(err.clone()));
                Err(RunOutcomeError::Failed(err))
            }
        }
    }

    /// Discards results and errors. Ignored while a run is outstanding.
    pub fn reset(&mut self) {
        if self.session.is_loading() {
            return;
        }
        self.session = SessionState::Idle;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunOutcomeError {
    #[error(transparent)]
    Rejected(#[from] RunRejected),
    #[error(transparent)]
    Failed(ProtocolError),
}
