//! The `/analyze` request state machine.
//!
//! A request moves `Received -> Validated -> Stored -> Analyzed -> Responded`
//! and can drop into `Failed` from every non-terminal stage. Each stage maps
//! its errors to a [`RequestFailure`], whose message is what the client sees.

use crate::output::{PredictionSegment, SpeciesScore, pool};
use crate::server::ServerContext;
use crate::server::meta::{RequestMeta, parse_meta_field, save_flag};
use crate::server::storage::{StoredUpload, client_file_name, store_upload, supported_extension};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, error, info, warn};

/// Audio part of a multipart upload.
#[derive(Debug, Clone, Default)]
pub struct UploadedAudio {
    /// Client-supplied file name.
    pub file_name: String,
    /// File contents.
    pub data: Vec<u8>,
}

/// Form fields of an `/analyze` request.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    /// The `audio` file field.
    pub audio: Option<UploadedAudio>,
    /// The `meta` text field.
    pub meta: Option<String>,
}

/// Stages of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    /// Form fields extracted.
    Received,
    /// Upload and metadata accepted.
    Validated,
    /// Audio written to disk.
    Stored,
    /// Classifier finished.
    Analyzed,
    /// Response built.
    Responded,
    /// Request ended with an error message.
    Failed,
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Stored => "stored",
            Self::Analyzed => "analyzed",
            Self::Responded => "responded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    /// No or empty `audio` field.
    NoAudio,
    /// `meta` is not a JSON object.
    InvalidMetadata,
    /// Extension outside the allow-list.
    UnsupportedFiletype,
    /// Upload could not be written.
    Storage,
    /// Analysis failed with a detail message.
    Analysis(String),
}

impl RequestFailure {
    /// Message returned to the client.
    pub fn message(&self) -> String {
        match self {
            Self::NoAudio => "No audio file.".to_string(),
            Self::InvalidMetadata => "Invalid metadata.".to_string(),
            Self::UnsupportedFiletype => "Filetype not supported.".to_string(),
            Self::Storage => "Error while saving file.".to_string(),
            Self::Analysis(detail) => format!("Error during analysis: {detail}"),
        }
    }
}

/// Successful analysis payload.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    /// Always `"success"`.
    pub msg: String,
    /// Classified segments.
    pub results: Vec<PredictionSegment>,
    /// Pooled top species.
    pub summary: Vec<SpeciesScore>,
    /// Request metadata; only written to the sidecar file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

/// JSON body of an `/analyze` response.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalyzeReply {
    /// Analysis results.
    Success(AnalyzeResponse),
    /// Error message.
    Message {
        /// User-visible message.
        msg: String,
    },
}

impl From<RequestFailure> for AnalyzeReply {
    fn from(failure: RequestFailure) -> Self {
        Self::Message {
            msg: failure.message(),
        }
    }
}

/// Handles `/analyze` requests against a shared server context.
///
/// Requests never share mutable state; each works on its own clone of the
/// base run configuration.
pub struct RequestHandler {
    context: ServerContext,
}

impl RequestHandler {
    /// Create a handler for `context`.
    pub const fn new(context: ServerContext) -> Self {
        Self { context }
    }

    /// Shared server context.
    pub const fn context(&self) -> &ServerContext {
        &self.context
    }

    /// Run a request to completion. Blocks on the classifier.
    pub fn handle(&self, request: AnalyzeRequest) -> AnalyzeReply {
        let mut stage = RequestStage::Received;

        match self.process(request, &mut stage) {
            Ok(response) => {
                advance(&mut stage, RequestStage::Responded);
                AnalyzeReply::Success(response)
            }
            Err(failure) => {
                debug!("Request failed after stage {stage}: {}", failure.message());
                advance(&mut stage, RequestStage::Failed);
                failure.into()
            }
        }
    }

    fn process(
        &self,
        request: AnalyzeRequest,
        stage: &mut RequestStage,
    ) -> Result<AnalyzeResponse, RequestFailure> {
        // Received -> Validated
        let audio = request
            .audio
            .filter(|audio| !audio.data.is_empty())
            .ok_or(RequestFailure::NoAudio)?;
        let meta_map =
            parse_meta_field(request.meta.as_deref()).ok_or(RequestFailure::InvalidMetadata)?;
        let meta_json = Value::Object(meta_map.clone());
        debug!("Request metadata: {meta_json}");

        let file_name = client_file_name(&audio.file_name).ok_or(RequestFailure::NoAudio)?;
        let extension =
            supported_extension(file_name).ok_or(RequestFailure::UnsupportedFiletype)?;
        advance(stage, RequestStage::Validated);

        // Validated -> Stored
        let save = save_flag(&meta_map);
        let upload = store_upload(
            &audio.data,
            file_name,
            &extension,
            save,
            &self.context.storage_path,
            self.context.temp_dir.as_deref(),
        )
        .map_err(|e| {
            error!("Cannot save file {file_name}: {e}");
            RequestFailure::Storage
        })?;
        advance(stage, RequestStage::Stored);

        // Stored -> Analyzed; `upload` is dropped on every exit below.
        let response = self.analyze(&upload, meta_map).map_err(|detail| {
            error!(
                "Cannot analyze file {}: {detail}",
                upload.path().display()
            );
            RequestFailure::Analysis(detail)
        })?;
        advance(stage, RequestStage::Analyzed);

        Ok(response)
    }

    fn analyze(
        &self,
        upload: &StoredUpload,
        meta_map: Map<String, Value>,
    ) -> Result<AnalyzeResponse, String> {
        let meta = RequestMeta::from_map(&meta_map)?;

        let mut config = self.context.base.clone();
        meta.apply(&mut config);
        config
            .narrow_species(self.context.species_filter.as_ref())
            .map_err(|e| e.to_string())?;

        let path = upload.path();
        let classified = catch_unwind(AssertUnwindSafe(|| {
            self.context.classifier.classify(path, &config)
        }));
        let results = match classified {
            Ok(result) => result.map_err(|e| e.to_string())?,
            Err(_) => return Err("classifier panicked".to_string()),
        };

        let summary = pool(&results, meta.num_results, meta.pmode);
        info!(
            "Analyzed {} ({} segments, top species: {})",
            path.display(),
            results.len(),
            summary.first().map_or("none", |s| s.species.as_str())
        );

        let mut response = AnalyzeResponse {
            msg: "success".to_string(),
            results,
            summary,
            meta: Some(meta_map),
        };

        if upload.is_permanent() {
            write_sidecar(upload, &response)?;
        }

        response.meta = None;
        Ok(response)
    }
}

/// Write the full payload, meta included, next to the stored audio.
fn write_sidecar(upload: &StoredUpload, response: &AnalyzeResponse) -> Result<(), String> {
    let path = upload.path().with_extension("json");
    let file = File::create(&path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), response)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn advance(stage: &mut RequestStage, next: RequestStage) {
    if *stage == RequestStage::Failed || *stage == RequestStage::Responded {
        warn!("Request already finished ({stage}), ignoring transition to {next}");
        return;
    }
    debug!("Request {stage} -> {next}");
    *stage = next;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{
        FailingClassifier, RecordingClassifier, StubClassifier, StubSpeciesFilter,
        sample_configuration,
    };
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Harness {
        storage: TempDir,
        temp: TempDir,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                storage: TempDir::new().unwrap(),
                temp: TempDir::new().unwrap(),
            }
        }

        fn handler(&self, classifier: Arc<dyn crate::inference::Classifier>) -> RequestHandler {
            RequestHandler::new(ServerContext {
                base: sample_configuration(),
                storage_path: self.storage.path().to_path_buf(),
                temp_dir: Some(self.temp.path().to_path_buf()),
                classifier,
                species_filter: Arc::new(StubSpeciesFilter),
            })
        }

        fn temp_is_empty(&self) -> bool {
            fs::read_dir(self.temp.path()).unwrap().next().is_none()
        }

        fn storage_is_empty(&self) -> bool {
            fs::read_dir(self.storage.path()).unwrap().next().is_none()
        }
    }

    fn request(name: &str, meta: Option<&str>) -> AnalyzeRequest {
        AnalyzeRequest {
            audio: Some(UploadedAudio {
                file_name: name.to_string(),
                data: b"RIFF0000WAVE".to_vec(),
            }),
            meta: meta.map(str::to_string),
        }
    }

    fn message(reply: &AnalyzeReply) -> &str {
        match reply {
            AnalyzeReply::Success(response) => &response.msg,
            AnalyzeReply::Message { msg } => msg,
        }
    }

    #[test]
    fn test_missing_audio() {
        let harness = Harness::new();
        let handler = harness.handler(Arc::new(StubClassifier));

        let reply = handler.handle(AnalyzeRequest::default());
        assert_eq!(message(&reply), "No audio file.");

        let empty = AnalyzeRequest {
            audio: Some(UploadedAudio {
                file_name: "night.wav".to_string(),
                data: Vec::new(),
            }),
            meta: None,
        };
        assert_eq!(message(&handler.handle(empty)), "No audio file.");
    }

    #[test]
    fn test_invalid_metadata() {
        let harness = Harness::new();
        let handler = harness.handler(Arc::new(StubClassifier));

        let reply = handler.handle(request("night.wav", Some("[1, 2, 3]")));
        assert_eq!(message(&reply), "Invalid metadata.");
        assert!(harness.temp_is_empty());
    }

    #[test]
    fn test_unsupported_filetype_writes_nothing() {
        let harness = Harness::new();
        let handler = harness.handler(Arc::new(StubClassifier));

        let reply = handler.handle(request("notes.txt", Some(r#"{"save": true}"#)));
        assert_eq!(message(&reply), "Filetype not supported.");
        assert!(harness.temp_is_empty());
        assert!(harness.storage_is_empty());
    }

    #[test]
    fn test_success_without_save_leaves_no_files() {
        let harness = Harness::new();
        let handler = harness.handler(Arc::new(StubClassifier));

        let reply = handler.handle(request("night.wav", None));
        match &reply {
            AnalyzeReply::Success(response) => {
                assert_eq!(response.msg, "success");
                assert!(!response.results.is_empty());
                assert!(!response.summary.is_empty());
                assert!(response.meta.is_none());
            }
            AnalyzeReply::Message { msg } => panic!("unexpected failure: {msg}"),
        }
        assert!(harness.temp_is_empty());
        assert!(harness.storage_is_empty());
    }

    #[test]
    fn test_classifier_failure_cleans_up() {
        let harness = Harness::new();
        let handler = harness.handler(Arc::new(FailingClassifier::new("battyd-upload")));

        let reply = handler.handle(request("night.wav", None));
        assert!(message(&reply).starts_with("Error during analysis: "));
        assert!(harness.temp_is_empty());
    }

    #[test]
    fn test_classifier_panic_cleans_up() {
        let harness = Harness::new();
        let handler = harness.handler(Arc::new(FailingClassifier::panicking("battyd-upload")));

        let reply = handler.handle(request("night.wav", None));
        assert_eq!(message(&reply), "Error during analysis: classifier panicked");
        assert!(harness.temp_is_empty());
    }

    #[test]
    fn test_malformed_number_is_analysis_error() {
        let harness = Harness::new();
        let handler = harness.handler(Arc::new(StubClassifier));

        let reply = handler.handle(request("night.wav", Some(r#"{"overlap": "wide"}"#)));
        assert!(message(&reply).starts_with("Error during analysis: invalid value for 'overlap'"));
        assert!(harness.temp_is_empty());
    }

    #[test]
    fn test_save_writes_audio_and_sidecar() {
        let harness = Harness::new();
        let handler = harness.handler(Arc::new(StubClassifier));

        let reply = handler.handle(request(
            "Site-A/Night.WAV",
            Some(r#"{"save": true, "pmode": "max", "num_results": 1}"#),
        ));
        let AnalyzeReply::Success(response) = reply else {
            panic!("analysis failed");
        };
        assert!(response.meta.is_none());
        assert_eq!(response.summary.len(), 1);

        let date_dir = fs::read_dir(harness.storage.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        assert!(date_dir.join("night.wav").is_file());

        let sidecar: Value =
            serde_json::from_str(&fs::read_to_string(date_dir.join("night.json")).unwrap())
                .unwrap();
        assert_eq!(sidecar["msg"], "success");
        assert_eq!(sidecar["meta"]["pmode"], "max");
        assert!(harness.temp_is_empty());
    }

    #[test]
    fn test_request_overrides_reach_classifier() {
        let harness = Harness::new();
        let recorder = Arc::new(RecordingClassifier::default());
        let handler = harness.handler(recorder.clone());

        handler.handle(request(
            "night.wav",
            Some(r#"{"lat": 49.1, "lon": "11.2", "week": 20, "sensitivity": 1.25, "overlap": 0.5}"#),
        ));

        let seen = recorder.last_config().unwrap();
        assert_eq!(seen.week, Some(20));
        assert!((seen.sensitivity - 0.75).abs() < 1e-6);
        assert!((seen.overlap - 0.5).abs() < 1e-6);
        assert_eq!(seen.species_list, vec!["Myotis myotis".to_string()]);
        // The shared base configuration is untouched.
        assert!(handler.context().base.location.is_none());
    }

    #[test]
    fn test_no_location_clears_species_list() {
        let harness = Harness::new();
        let recorder = Arc::new(RecordingClassifier::default());
        let mut handler = harness.handler(recorder.clone());
        handler.context.base.species_list = vec!["stale".to_string()];

        handler.handle(request("night.wav", Some(r#"{"lat": 49.1}"#)));

        let seen = recorder.last_config().unwrap();
        assert!(seen.species_list.is_empty());
        assert!(seen.location.is_none());
    }

    #[test]
    fn test_storage_failure_leaves_nothing_behind() {
        let harness = Harness::new();
        let blocker = harness.storage.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let handler = RequestHandler::new(ServerContext {
            base: sample_configuration(),
            storage_path: blocker.join("uploads"),
            temp_dir: Some(blocker.join("tmp")),
            classifier: Arc::new(StubClassifier),
            species_filter: Arc::new(StubSpeciesFilter),
        });

        for meta in [Some(r#"{"save": true}"#), None] {
            let reply = handler.handle(request("night.wav", meta));
            assert_eq!(message(&reply), "Error while saving file.");
        }

        let entries: Vec<_> = fs::read_dir(harness.storage.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(entries, vec![blocker.clone()]);
        assert!(blocker.is_file());
        assert!(harness.temp_is_empty());
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            RequestFailure::Storage.message(),
            "Error while saving file."
        );
        assert_eq!(
            RequestFailure::Analysis("boom".into()).message(),
            "Error during analysis: boom"
        );
        let reply: AnalyzeReply = RequestFailure::NoAudio.into();
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"msg":"No audio file."}"#
        );
    }

    #[test]
    fn test_stage_transitions_stop_at_terminal() {
        let mut stage = RequestStage::Received;
        advance(&mut stage, RequestStage::Validated);
        advance(&mut stage, RequestStage::Failed);
        advance(&mut stage, RequestStage::Stored);
        assert_eq!(stage, RequestStage::Failed);
    }
}
