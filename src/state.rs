use std::collections::VecDeque;
use std::path::PathBuf;

use crate::orchestrator::{Orchestrator, RunJob, RunRejected, SessionState};
use crate::protocol::{ProtocolError, ResultArtifact, Submission, SubmitRoute};
use crate::selection::AnalysisKind;
use crate::upload::{UploadedFile, format_size};
use crate::viewer::{ViewerState, download_offered, download_url};

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Analyses,
    Results,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub viewer: ViewerState,
    pub focus: Focus,
    pub analysis_cursor: usize,
    pub result_cursor: usize,
    /// File path being typed; `Some` while the prompt is open.
    pub path_input: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            orchestrator: Orchestrator::new(),
            viewer: ViewerState::Closed,
            focus: Focus::Analyses,
            analysis_cursor: 0,
            result_cursor: 0,
            path_input: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn results(&self) -> &[ResultArtifact] {
        self.orchestrator.session().results().unwrap_or_default()
    }

    pub fn selected_result(&self) -> Option<&ResultArtifact> {
        self.results().get(self.result_cursor)
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Analyses => Focus::Results,
            Focus::Results => Focus::Analyses,
        };
    }

    pub fn select_next(&mut self) {
        match self.focus {
            Focus::Analyses => {
                self.analysis_cursor = (self.analysis_cursor + 1).min(AnalysisKind::ALL.len() - 1);
            }
            Focus::Results => {
                let len = self.results().len();
                if len > 0 {
                    self.result_cursor = (self.result_cursor + 1).min(len - 1);
                }
            }
        }
    }

    pub fn select_prev(&mut self) {
        match self.focus {
            Focus::Analyses => self.analysis_cursor = self.analysis_cursor.saturating_sub(1),
            Focus::Results => self.result_cursor = self.result_cursor.saturating_sub(1),
        }
    }

    pub fn toggle_analysis(&mut self, kind: AnalysisKind) {
        let selection = self.orchestrator.toggle(kind);
        if let Some(pos) = AnalysisKind::ALL.iter().position(|k| *k == kind) {
            self.analysis_cursor = pos;
        }
        let state = if selection.is_enabled(kind) { "on" } else { "off" };
        self.push_log(format!("[INFO] {} {state}", kind.label()));
    }

    pub fn toggle_analysis_at_cursor(&mut self) {
        if let Some(kind) = AnalysisKind::ALL.get(self.analysis_cursor).copied() {
            self.toggle_analysis(kind);
        }
    }

    pub fn set_file(&mut self, file: UploadedFile) {
        self.push_log(format!(
            "[INFO] Loaded {} ({})",
            file.name(),
            format_size(file.len())
        ));
        self.orchestrator.select_file(file);
    }

    pub fn load_file_from_path(&mut self, raw: &str) {
        let path = raw.trim();
        if path.is_empty() {
            self.push_log("[INFO] No file path entered");
            return;
        }
        match UploadedFile::from_path(path) {
            Ok(file) => self.set_file(file),
            Err(err) => self.push_log(format!("[WARN] Could not load video: {err:#}")),
        }
    }

    /// Starts a run and returns the job for the worker. Rejections are logged
    /// and, for validation failures, already reflected in the session.
    pub fn start_run(&mut self) -> Option<RunJob> {
        match self.orchestrator.begin_run() {
            Ok(job) => {
                self.viewer.close();
                self.result_cursor = 0;
                let names = job
                    .analyses
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.push_log(format!(
                    "[INFO] Run #{} started for {} [{names}]",
                    job.run_id,
                    job.file.name()
                ));
                Some(job)
            }
            Err(RunRejected::Busy) => {
                self.push_log("[INFO] Analysis already running");
                None
            }
            Err(RunRejected::Invalid(violation)) => {
                self.push_log(format!("[WARN] {violation}"));
                None
            }
        }
    }

    pub fn view_selected(&mut self) {
        let Some(artifact) = self.selected_result().cloned() else {
            self.push_log("[INFO] No result selected");
            return;
        };
        self.viewer.view(&artifact);
    }

    /// Returns the artifact to fetch when the selected one has a file.
    pub fn download_selected(&mut self) -> Option<ResultArtifact> {
        let artifact = self.viewed_or_selected()?;
        if !download_offered(&artifact) {
            self.push_log(format!("[INFO] {} has no file to download", artifact.name));
            return None;
        }
        if download_url(&artifact).is_none() {
            self.push_log(format!("[INFO] {} has no retrievable file", artifact.name));
            return None;
        }
        self.push_log(format!("[INFO] Downloading {}", artifact.name));
        Some(artifact)
    }

    fn viewed_or_selected(&mut self) -> Option<ResultArtifact> {
        if let ViewerState::ShowingMedia { artifact, .. } = &self.viewer {
            return Some(artifact.clone());
        }
        let selected = self.selected_result().cloned();
        if selected.is_none() {
            self.push_log("[INFO] No result selected");
        }
        selected
    }

    pub fn reset(&mut self) {
        if self.orchestrator.is_loading() {
            self.push_log("[INFO] Cannot reset while analysis is running");
            return;
        }
        self.orchestrator.reset();
        self.result_cursor = 0;
    }
}

#[derive(Debug, Clone)]
pub enum WorkerCommand {
    Submit(RunJob),
    Download(ResultArtifact),
}

#[derive(Debug, Clone)]
pub enum Delta {
    RunFinished {
        run_id: u64,
        outcome: Result<Submission, ProtocolError>,
    },
    Downloaded {
        name: String,
        path: PathBuf,
    },
    Log(String),
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::RunFinished { run_id, outcome } => match outcome {
            Ok(submission) => {
                if let Some(failure) = submission.primary_failure.as_ref() {
                    state.push_log(format!(
                        "[WARN] Primary flow failed ({failure}); used legacy /analyze"
                    ));
                }
                let count = submission.artifacts.len();
                let route = match submission.route {
                    SubmitRoute::Primary => "upload+process",
                    SubmitRoute::Fallback => "legacy analyze",
                };
                if state.orchestrator.finish_run(run_id, Ok(submission.artifacts)) {
                    state.result_cursor = 0;
                    state.push_log(format!(
                        "[INFO] Run #{run_id} complete via {route}: {count} artifact(s)"
                    ));
                } else {
                    state.push_log(format!("[INFO] Ignored stale result for run #{run_id}"));
                }
            }
            Err(err) => {
                let ProtocolError::FallbackFailed { primary, fallback } = &err;
                state.push_log(format!("[WARN] Primary flow failed ({primary})"));
                state.push_log(format!("[WARN] Legacy analyze failed ({fallback})"));
                if !state.orchestrator.finish_run(run_id, Err(err)) {
                    state.push_log(format!("[INFO] Ignored stale failure for run #{run_id}"));
                }
            }
        },
        Delta::Downloaded { name, path } => {
            state.push_log(format!("[INFO] Saved {name} to {}", path.display()));
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

pub fn session_label(session: &SessionState) -> &'static str {
    match session {
        SessionState::Idle => "IDLE",
        SessionState::Loading => "LOADING",
        SessionState::Results(_) => "RESULTS",
        SessionState::Error(_) => "ERROR",
    }
}
