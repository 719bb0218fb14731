use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Tracking,
    Heatmap,
    Pose,
    Speed,
}

impl AnalysisKind {
    /// Submission order; downstream processing and display rely on it.
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::Tracking,
        AnalysisKind::Heatmap,
        AnalysisKind::Pose,
        AnalysisKind::Speed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::Tracking => "tracking",
            AnalysisKind::Heatmap => "heatmap",
            AnalysisKind::Pose => "pose",
            AnalysisKind::Speed => "speed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AnalysisKind::Tracking => "Player Detection & Tracking",
            AnalysisKind::Heatmap => "Player Movement Heatmap",
            AnalysisKind::Pose => "Pose / Skeletal Analysis",
            AnalysisKind::Speed => "Player Speed Analysis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload a video before running analysis")]
    FileRequired,
    #[error("Speed analysis requires player tracking. Please enable 'Player Detection & Tracking'.")]
    SpeedRequiresTracking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSelection {
    pub tracking: bool,
    pub heatmap: bool,
    pub pose: bool,
    pub speed: bool,
}

impl Default for AnalysisSelection {
    fn default() -> Self {
        Self {
            tracking: true,
            heatmap: true,
            pose: false,
            speed: false,
        }
    }
}

impl AnalysisSelection {
    pub fn none() -> Self {
        Self {
            tracking: false,
            heatmap: false,
            pose: false,
            speed: false,
        }
    }

    pub fn is_enabled(&self, kind: AnalysisKind) -> bool {
        match kind {
            AnalysisKind::Tracking => self.tracking,
            AnalysisKind::Heatmap => self.heatmap,
            AnalysisKind::Pose => self.pose,
            AnalysisKind::Speed => self.speed,
        }
    }

    pub fn with(mut self, kind: AnalysisKind, enabled: bool) -> Self {
        match kind {
            AnalysisKind::Tracking => self.tracking = enabled,
            AnalysisKind::Heatmap => self.heatmap = enabled,
            AnalysisKind::Pose => self.pose = enabled,
            AnalysisKind::Speed => self.speed = enabled,
        }
        self
    }

    /// Flips exactly one flag. Dependencies are never auto-corrected here;
    /// `validate` reports them instead.
    pub fn toggle(self, kind: AnalysisKind) -> Self {
        let current = self.is_enabled(kind);
        self.with(kind, !current)
    }

    pub fn requested(&self) -> Vec<AnalysisKind> {
        AnalysisKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    pub fn speed_without_tracking(&self) -> bool {
        self.speed && !self.tracking
    }
}

/// First violation wins: the file check comes before the dependency check.
pub fn validate(selection: &AnalysisSelection, file_present: bool) -> Result<(), ValidationError> {
    if !file_present {
        return Err(ValidationError::FileRequired);
    }
    if selection.speed_without_tracking() {
        return Err(ValidationError::SpeedRequiresTracking);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AnalysisKind, AnalysisSelection, ValidationError, validate};

    #[test]
    fn defaults_enable_tracking_and_heatmap() {
        let sel = AnalysisSelection::default();
        assert_eq!(
            sel.requested(),
            vec![AnalysisKind::Tracking, AnalysisKind::Heatmap]
        );
    }

    #[test]
    fn toggle_changes_only_one_flag() {
        let base = AnalysisSelection::default();
        for kind in AnalysisKind::ALL {
            let toggled = base.toggle(kind);
            for other in AnalysisKind::ALL {
                if other == kind {
                    assert_ne!(toggled.is_enabled(other), base.is_enabled(other));
                } else {
                    assert_eq!(toggled.is_enabled(other), base.is_enabled(other));
                }
            }
        }
    }

    #[test]
    fn turning_tracking_off_leaves_speed_alone() {
        let sel = AnalysisSelection::default()
            .toggle(AnalysisKind::Speed)
            .toggle(AnalysisKind::Tracking);
        assert!(sel.speed);
        assert!(!sel.tracking);
    }

    #[test]
    fn requested_order_is_fixed() {
        let sel = AnalysisSelection::none()
            .with(AnalysisKind::Speed, true)
            .with(AnalysisKind::Pose, true)
            .with(AnalysisKind::Tracking, true);
        let names: Vec<&str> = sel.requested().into_iter().map(AnalysisKind::as_str).collect();
        assert_eq!(names, vec!["tracking", "pose", "speed"]);
    }

    #[test]
    fn missing_file_is_reported_before_dependency() {
        let sel = AnalysisSelection::none().with(AnalysisKind::Speed, true);
        assert_eq!(validate(&sel, false), Err(ValidationError::FileRequired));
        assert_eq!(
            validate(&sel, true),
            Err(ValidationError::SpeedRequiresTracking)
        );
    }

    #[test]
    fn empty_selection_with_file_is_valid() {
        assert_eq!(validate(&AnalysisSelection::none(), true), Ok(()));
    }
}
