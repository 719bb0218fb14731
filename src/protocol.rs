//! Client side of the analysis service.
//!
//! Two backend generations exist: the structured `/upload` + `/process` flow
//! and the legacy single-shot `/analyze` endpoint. `ProtocolClient::submit`
//! tries the structured flow first and, if any step of it fails, makes exactly
//! one legacy attempt. Both shapes are normalized into `ResultArtifact`s.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::selection::AnalysisKind;
use crate::transport::{HttpReply, Transport};
use crate::upload::UploadedFile;

/// `url` value meaning "nothing to fetch for this artifact".
pub const SENTINEL_URL: &str = "#";

pub const UPLOAD_PATH: &str = "/upload";
pub const PROCESS_PATH: &str = "/process";
pub const ANALYZE_PATH: &str = "/analyze";

pub const LEGACY_TRACKED_NAME: &str = "tracked.mp4";
pub const LEGACY_HEATMAP_NAME: &str = "heatmap.png";

const SPEED_ANALYSIS_TYPE: &str = "speed_analysis";
const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "ogg"];
const GENERIC_FAILURE: &str = "Analysis failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Media,
    SpeedAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Intensity {
    pub walking: Option<f64>,
    pub jogging: Option<f64>,
    pub sprinting: Option<f64>,
}

/// Speed dashboard payload. Every figure is optional: the dashboard renders
/// whatever the backend sent. Intensity shares are taken as-is and are not
/// required to add up to 100.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpeedMetrics {
    pub average_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub intensity: Intensity,
}

impl SpeedMetrics {
    /// Reads a `data` object field by field. Returns `None` only when `data`
    /// is not a JSON object; missing or non-numeric fields stay blank.
    pub fn from_json(data: &Value) -> Option<Self> {
        let fields = data.as_object()?;
        let number = |map: &serde_json::Map<String, Value>, key: &str| {
            map.get(key).and_then(Value::as_f64)
        };
        let intensity = match fields.get("intensity").and_then(Value::as_object) {
            Some(shares) => Intensity {
                walking: number(shares, "Walking"),
                jogging: number(shares, "Jogging"),
                sprinting: number(shares, "Sprinting"),
            },
            None => Intensity::default(),
        };
        Some(Self {
            average_speed: number(fields, "average_speed"),
            max_speed: number(fields, "max_speed"),
            intensity,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultArtifact {
    pub name: String,
    pub url: String,
    pub kind: ArtifactKind,
    pub data: Option<SpeedMetrics>,
}

impl ResultArtifact {
    pub fn media(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: ArtifactKind::Media,
            data: None,
        }
    }

    pub fn speed(name: impl Into<String>, data: SpeedMetrics) -> Self {
        Self {
            name: name.into(),
            url: SENTINEL_URL.to_string(),
            kind: ArtifactKind::SpeedAnalysis,
            data: Some(data),
        }
    }

    pub fn has_retrievable_file(&self) -> bool {
        self.url != SENTINEL_URL
    }

    pub fn media_kind(&self) -> MediaKind {
        media_kind_for_url(&self.url)
    }
}

pub fn media_kind_for_url(url: &str) -> MediaKind {
    let Some((_, ext)) = url.rsplit_once('.') else {
        return MediaKind::Image;
    };
    if VIDEO_EXTENSIONS
        .iter()
        .any(|video| ext.eq_ignore_ascii_case(video))
    {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

/// Which contract produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRoute {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub artifacts: Vec<ResultArtifact>,
    pub route: SubmitRoute,
    /// Why the structured flow was abandoned, when the legacy endpoint answered.
    pub primary_failure: Option<CallFailure>,
}

/// One failed HTTP exchange. `status`/`body` are present when the server
/// answered; `reason` always describes the failure at transport level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{endpoint}: {reason}")]
pub struct CallFailure {
    pub endpoint: &'static str,
    pub status: Option<u16>,
    pub body: Option<String>,
    pub reason: String,
}

impl CallFailure {
    fn transport(endpoint: &'static str, reason: String) -> Self {
        Self {
            endpoint,
            status: None,
            body: None,
            reason,
        }
    }

    fn from_reply(endpoint: &'static str, reply: &HttpReply, reason: String) -> Self {
        Self {
            endpoint,
            status: Some(reply.status),
            body: Some(reply.text()),
            reason,
        }
    }

    /// Most specific message available: server `detail`, then the raw body,
    /// then the transport reason.
    pub fn user_message(&self) -> String {
        if let Some(body) = self.body.as_deref() {
            if let Some(detail) = detail_message(body) {
                return detail;
            }
            let trimmed = body.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
        let reason = self.reason.trim();
        if reason.is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            reason.to_string()
        }
    }
}

fn detail_message(body: &str) -> Option<String> {
    let root: Value = serde_json::from_str(body.trim()).ok()?;
    match root.get("detail")? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("{}", .fallback.user_message())]
    FallbackFailed {
        primary: CallFailure,
        fallback: CallFailure,
    },
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProcessRequest<'a> {
    filename: &'a str,
    analyses: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    outputs: Option<Vec<ProcessOutput>>,
}

#[derive(Debug, Deserialize)]
struct ProcessOutput {
    name: String,
    url: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyResponse {
    #[serde(default)]
    tracked_video: Option<String>,
    #[serde(default)]
    heatmap: Option<String>,
}

pub struct ProtocolClient<T> {
    origin: String,
    transport: T,
}

impl<T: Transport> ProtocolClient<T> {
    pub fn new(origin: impl Into<String>, transport: T) -> Self {
        let origin = origin.into();
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn submit(
        &self,
        file: &UploadedFile,
        analyses: &[AnalysisKind],
    ) -> Result<Submission, ProtocolError> {
        let primary = match self.submit_primary(file, analyses) {
            Ok(artifacts) => {
                return Ok(Submission {
                    artifacts,
                    route: SubmitRoute::Primary,
                    primary_failure: None,
                });
            }
            Err(failure) => failure,
        };

        match self.submit_legacy(file) {
            Ok(artifacts) => Ok(Submission {
                artifacts,
                route: SubmitRoute::Fallback,
                primary_failure: Some(primary),
            }),
            Err(fallback) => Err(ProtocolError::FallbackFailed { primary, fallback }),
        }
    }

    fn submit_primary(
        &self,
        file: &UploadedFile,
        analyses: &[AnalysisKind],
    ) -> Result<Vec<ResultArtifact>, CallFailure> {
        let url = self.endpoint(UPLOAD_PATH);
        let reply = self
            .transport
            .post_multipart(&url, "file", file)
            .map_err(|err| CallFailure::transport(UPLOAD_PATH, err))?;
        let upload: UploadResponse = decode_success(UPLOAD_PATH, &reply)?;
        let filename = upload
            .filename
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                CallFailure::from_reply(
                    UPLOAD_PATH,
                    &reply,
                    "upload response has no filename".to_string(),
                )
            })?;

        let request = ProcessRequest {
            filename: &filename,
            analyses: analyses.iter().map(|kind| kind.as_str()).collect(),
        };
        let body = serde_json::to_value(&request)
            .map_err(|err| CallFailure::transport(PROCESS_PATH, err.to_string()))?;
        let url = self.endpoint(PROCESS_PATH);
        let reply = self
            .transport
            .post_json(&url, &body)
            .map_err(|err| CallFailure::transport(PROCESS_PATH, err))?;
        let processed: ProcessResponse = decode_success(PROCESS_PATH, &reply)?;

        Ok(self.normalize_outputs(processed.outputs.unwrap_or_default()))
    }

    fn submit_legacy(&self, file: &UploadedFile) -> Result<Vec<ResultArtifact>, CallFailure> {
        let url = self.endpoint(ANALYZE_PATH);
        let reply = self
            .transport
            .post_multipart(&url, "video", file)
            .map_err(|err| CallFailure::transport(ANALYZE_PATH, err))?;
        // An empty or `null` success body means neither artifact was produced.
        let legacy: LegacyResponse = if reply.is_success() && reply.text().trim().is_empty() {
            LegacyResponse::default()
        } else {
            decode_success::<Option<LegacyResponse>>(ANALYZE_PATH, &reply)?.unwrap_or_default()
        };

        let mut artifacts = Vec::with_capacity(2);
        if let Some(path) = present(legacy.tracked_video) {
            artifacts.push(ResultArtifact::media(LEGACY_TRACKED_NAME, self.rebase(&path)));
        }
        if let Some(path) = present(legacy.heatmap) {
            artifacts.push(ResultArtifact::media(LEGACY_HEATMAP_NAME, self.rebase(&path)));
        }
        Ok(artifacts)
    }

    fn normalize_outputs(&self, outputs: Vec<ProcessOutput>) -> Vec<ResultArtifact> {
        let mut seen: HashSet<String> = HashSet::with_capacity(outputs.len());
        outputs
            .into_iter()
            .map(|out| {
                let kind = match out.kind.as_deref() {
                    Some(SPEED_ANALYSIS_TYPE) => ArtifactKind::SpeedAnalysis,
                    _ => ArtifactKind::Media,
                };
                let data = match kind {
                    ArtifactKind::SpeedAnalysis => {
                        out.data.as_ref().and_then(SpeedMetrics::from_json)
                    }
                    ArtifactKind::Media => None,
                };
                ResultArtifact {
                    name: unique_name(&mut seen, out.name),
                    url: self.rebase(&out.url),
                    kind,
                    data,
                }
            })
            .collect()
    }

    pub fn rebase(&self, url: &str) -> String {
        if url == SENTINEL_URL {
            return url.to_string();
        }
        format!("{}{}", self.origin, url)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }
}

fn decode_success<D: for<'de> Deserialize<'de>>(
    endpoint: &'static str,
    reply: &HttpReply,
) -> Result<D, CallFailure> {
    if !reply.is_success() {
        return Err(CallFailure::from_reply(
            endpoint,
            reply,
            format!("request failed with status code {}", reply.status),
        ));
    }
    serde_json::from_slice(&reply.body).map_err(|err| {
        CallFailure::from_reply(endpoint, reply, format!("invalid response json: {err}"))
    })
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// First of `name`, `name (2)`, `name (3)`, ... not emitted yet in this set.
fn unique_name(seen: &mut HashSet<String>, name: String) -> String {
    let mut candidate = name.clone();
    let mut n = 1;
    while seen.contains(&candidate) {
        n += 1;
        candidate = format!("{name} ({n})");
    }
    seen.insert(candidate.clone());
    candidate
}
