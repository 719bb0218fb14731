mod common;

use common::{ORIGIN, ScriptedTransport, clip, ok_json, status, unreachable};
use vision_terminal::orchestrator::{Orchestrator, RunOutcomeError, RunRejected, SessionState};
use vision_terminal::protocol::{
    ArtifactKind, Intensity, ProtocolClient, ResultArtifact, SpeedMetrics,
};
use vision_terminal::selection::{AnalysisKind, AnalysisSelection, ValidationError, validate};
use vision_terminal::viewer::{ViewerState, download_offered};

fn speed_metrics() -> SpeedMetrics {
    SpeedMetrics {
        average_speed: Some(5.2),
        max_speed: Some(8.1),
        intensity: Intensity {
            walking: Some(60.0),
            jogging: Some(30.0),
            sprinting: Some(10.0),
        },
    }
}

#[test]
fn speed_without_tracking_is_rejected_for_every_other_combination() {
    for heatmap in [false, true] {
        for pose in [false, true] {
            let sel = AnalysisSelection {
                tracking: false,
                heatmap,
                pose,
                speed: true,
            };
            assert_eq!(
                validate(&sel, true),
                Err(ValidationError::SpeedRequiresTracking)
            );
        }
    }
}

#[test]
fn run_without_file_never_touches_network() {
    let client = ProtocolClient::new(ORIGIN, ScriptedTransport::new(Vec::new()));
    let mut orch = Orchestrator::new();
    let err = orch.run(&client).expect_err("no file");
    assert_eq!(
        err,
        RunOutcomeError::Rejected(RunRejected::Invalid(ValidationError::FileRequired))
    );
    assert!(client.transport().calls().is_empty());
    assert!(!orch.is_loading());
    assert!(matches!(orch.session(), SessionState::Error(_)));
}

#[test]
fn speed_without_tracking_never_touches_network() {
    let client = ProtocolClient::new(ORIGIN, ScriptedTransport::new(Vec::new()));
    let mut orch = Orchestrator::new();
    orch.select_file(clip());
    orch.toggle(AnalysisKind::Tracking);
    orch.toggle(AnalysisKind::Speed);
    orch.run(&client).expect_err("invalid");
    assert!(client.transport().calls().is_empty());
    assert_eq!(
        orch.session().error(),
        Some("Speed analysis requires player tracking. Please enable 'Player Detection & Tracking'.")
    );
}

#[test]
fn both_paths_failing_ends_in_error_not_loading() {
    let client = ProtocolClient::new(
        ORIGIN,
        ScriptedTransport::new(vec![unreachable(), status(503, "")]),
    );
    let mut orch = Orchestrator::new();
    orch.select_file(clip());
    orch.run(&client).expect_err("both fail");

    assert!(!orch.is_loading());
    let msg = orch.session().error().expect("error state");
    assert!(msg.starts_with("Analysis failed: "));
    assert!(msg.len() > "Analysis failed: ".len());
    assert_eq!(msg, "Analysis failed: request failed with status code 503");
}

#[test]
fn success_clears_prior_error_and_failure_clears_prior_results() {
    let client = ProtocolClient::new(
        ORIGIN,
        ScriptedTransport::new(vec![
            // run 2: primary succeeds
            ok_json(r#"{"filename":"match.mp4"}"#),
            ok_json(r#"{"outputs":[{"name":"Heatmap","url":"/h.png"}]}"#),
            // run 3: both fail
            unreachable(),
            unreachable(),
        ]),
    );
    let mut orch = Orchestrator::new();

    // run 1: validation error
    orch.run(&client).expect_err("no file");
    assert!(orch.session().error().is_some());

    orch.select_file(clip());
    orch.run(&client).expect("succeeds");
    assert_eq!(orch.session().error(), None);
    assert_eq!(
        orch.session().results(),
        Some(&[ResultArtifact::media("Heatmap", format!("{ORIGIN}/h.png"))][..])
    );

    orch.run(&client).expect_err("fails");
    assert_eq!(orch.session().results(), None);
    assert!(orch.session().error().is_some());
}

#[test]
fn viewing_speed_artifact_shows_dashboard_values() {
    let artifact = ResultArtifact::speed("Player Speed Analysis", speed_metrics());
    let mut viewer = ViewerState::default();
    viewer.view(&artifact);

    let ViewerState::ShowingSpeedDashboard(data) = &viewer else {
        panic!("expected dashboard, got {viewer:?}");
    };
    assert_eq!(data.intensity.walking, Some(60.0));
    assert_eq!(data.intensity.jogging, Some(30.0));
    assert_eq!(data.intensity.sprinting, Some(10.0));
    assert!(!download_offered(&artifact));
}

#[test]
fn speed_data_with_missing_figures_still_opens_dashboard() {
    let client = ProtocolClient::new(
        ORIGIN,
        ScriptedTransport::new(vec![
            ok_json(r#"{"filename":"match.mp4"}"#),
            ok_json(
                r##"{"outputs":[{"name":"Player Speed Analysis","url":"#","type":"speed_analysis",
                    "data":{"max_speed":8.1,"intensity":{"Walking":60,"Jogging":30,"Sprinting":10}}}]}"##,
            ),
        ]),
    );
    let mut orch = Orchestrator::new();
    orch.select_file(clip());
    orch.toggle(AnalysisKind::Speed);
    orch.run(&client).expect("ok");

    let artifact = &orch.session().results().expect("results")[0];
    let mut viewer = ViewerState::default();
    viewer.view(artifact);
    let ViewerState::ShowingSpeedDashboard(data) = &viewer else {
        panic!("expected dashboard, got {viewer:?}");
    };
    assert_eq!(data.average_speed, None);
    assert_eq!(data.max_speed, Some(8.1));
    assert_eq!(data.intensity.walking, Some(60.0));

    let mut metrics = speed_metrics();
    metrics.average_speed = None;
    metrics.max_speed = None;
    metrics.intensity = Intensity::default();
    viewer.view(&ResultArtifact::speed("blank", metrics.clone()));
    assert_eq!(viewer, ViewerState::ShowingSpeedDashboard(metrics));
}

#[test]
fn intensity_not_summing_to_hundred_is_shown_as_is() {
    let mut metrics = speed_metrics();
    metrics.intensity.sprinting = Some(33.0);
    let artifact = ResultArtifact::speed("Player Speed Analysis", metrics.clone());
    let mut viewer = ViewerState::default();
    viewer.view(&artifact);
    assert_eq!(viewer, ViewerState::ShowingSpeedDashboard(metrics));
}

#[test]
fn closing_viewer_leaves_session_untouched() {
    let client = ProtocolClient::new(
        ORIGIN,
        ScriptedTransport::new(vec![
            ok_json(r#"{"filename":"match.mp4"}"#),
            ok_json(r#"{"outputs":[{"name":"a.mp4","url":"/files/a.mp4"}]}"#),
        ]),
    );
    let mut orch = Orchestrator::new();
    orch.select_file(clip());
    orch.run(&client).expect("ok");
    let before = orch.session().clone();

    let artifacts = orch.session().results().expect("results").to_vec();
    let mut viewer = ViewerState::default();
    for artifact in artifacts
        .iter()
        .chain(std::iter::once(&ResultArtifact::speed("s", speed_metrics())))
    {
        viewer.view(artifact);
        assert!(viewer.is_open());
        viewer.close();
        assert_eq!(viewer, ViewerState::Closed);
        assert_eq!(orch.session(), &before);
    }
    assert_eq!(artifacts[0].kind, ArtifactKind::Media);
}

#[test]
fn viewer_survives_a_new_run() {
    let client = ProtocolClient::new(ORIGIN, ScriptedTransport::new(vec![unreachable(), unreachable()]));
    let mut orch = Orchestrator::new();
    let mut viewer = ViewerState::default();
    viewer.view(&ResultArtifact::media("old.png", "http://h/old.png"));

    orch.select_file(clip());
    orch.run(&client).expect_err("fails");
    assert!(viewer.is_open());
}
