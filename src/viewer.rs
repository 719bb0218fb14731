use crate::protocol::{ArtifactKind, MediaKind, ResultArtifact, SpeedMetrics};

/// Full-screen viewer. Independent of the session: nothing here reads or
/// writes `SessionState`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewerState {
    #[default]
    Closed,
    ShowingMedia {
        artifact: ResultArtifact,
        media: MediaKind,
    },
    ShowingSpeedDashboard(SpeedMetrics),
}

/// Where a pointer press landed while the viewer is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Backdrop,
    Content,
}

impl ViewerState {
    pub fn is_open(&self) -> bool {
        !matches!(self, ViewerState::Closed)
    }

    pub fn view(&mut self, artifact: &ResultArtifact) {
        *self = match (&artifact.kind, &artifact.data) {
            (ArtifactKind::SpeedAnalysis, Some(data)) => {
                ViewerState::ShowingSpeedDashboard(data.clone())
            }
            _ => ViewerState::ShowingMedia {
                artifact: artifact.clone(),
                media: artifact.media_kind(),
            },
        };
    }

    pub fn close(&mut self) {
        *self = ViewerState::Closed;
    }

    /// Backdrop presses dismiss; presses inside the content are swallowed.
    pub fn on_click(&mut self, target: ClickTarget) {
        if target == ClickTarget::Backdrop {
            self.close();
        }
    }
}

/// Structured results have no file representation.
pub fn download_offered(artifact: &ResultArtifact) -> bool {
    artifact.kind != ArtifactKind::SpeedAnalysis
}

pub fn download_url(artifact: &ResultArtifact) -> Option<&str> {
    if download_offered(artifact) && artifact.has_retrievable_file() {
        Some(&artifact.url)
    } else {
        None
    }
}
