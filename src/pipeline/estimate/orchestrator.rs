//! Analysis state machine.
//!
//! `waiting → analyzing → done | error`. Every change to the photo set (or an
//! explicit re-run) starts a new request with a fresh epoch. A request may
//! only publish progress or a terminal state while its epoch is still the
//! current one, so a slow attempt that resolves after a newer one can never
//! overwrite it. Superseded attempts run to completion and are dropped.
//!
//! Consumers observe state through a `tokio::sync::watch` channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::hash::FaceHashes;
use super::local::build_local_result;
use super::normalize::normalize_server_out;
use super::quality::{assess_photo_quality, QualityReport};
use super::remote::{HttpRemoteScorer, RemoteError, RemoteScorer, ScoringPayload};
use super::source::{FaceImages, ImageSource};
use super::types::{AnalysisResult, ImageSlot};
use super::EstimateError;
use crate::config::AnalyzerConfig;

/// The only failure text ever shown to the user.
pub const ANALYSIS_FAILED_MESSAGE: &str =
    "We couldn't analyze these photos. Try different photos.";

const PROGRESS_STARTED: u8 = 8;
const PROGRESS_ENCODED: u8 = 35;
const PROGRESS_SEEDED: u8 = 85;
const PROGRESS_DONE: u8 = 100;

// ──────────────────────────────────────────────
// State
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Waiting,
    Analyzing,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisFailure {
    /// Photo bytes could not be read on any path.
    UnreadableImages,
}

impl AnalysisFailure {
    pub fn user_message(&self) -> &'static str {
        ANALYSIS_FAILED_MESSAGE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisState {
    Waiting,
    Analyzing { progress: u8 },
    Done { result: Arc<AnalysisResult> },
    Error { progress: u8, failure: AnalysisFailure },
}

impl AnalysisState {
    pub fn status(&self) -> AnalysisStatus {
        match self {
            AnalysisState::Waiting => AnalysisStatus::Waiting,
            AnalysisState::Analyzing { .. } => AnalysisStatus::Analyzing,
            AnalysisState::Done { .. } => AnalysisStatus::Done,
            AnalysisState::Error { .. } => AnalysisStatus::Error,
        }
    }

    pub fn progress(&self) -> u8 {
        match self {
            AnalysisState::Waiting => 0,
            AnalysisState::Analyzing { progress } | AnalysisState::Error { progress, .. } => {
                *progress
            }
            AnalysisState::Done { .. } => PROGRESS_DONE,
        }
    }

    pub fn result(&self) -> Option<&Arc<AnalysisResult>> {
        match self {
            AnalysisState::Done { result } => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            AnalysisState::Error { failure, .. } => Some(failure.user_message()),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisState::Done { .. } | AnalysisState::Error { .. })
    }
}

/// One analysis attempt, bound to the epoch that created it.
///
/// Creating a request moves the machine to `Analyzing`; it stays there until
/// the request is passed to `execute` or `spawn`.
#[must_use = "the analyzer stays in Analyzing until the request is executed"]
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    epoch: u64,
    images: FaceImages,
    meta: Value,
}

impl AnalysisRequest {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

struct PhotoBytes {
    front: Vec<u8>,
    left: Vec<u8>,
    right: Vec<u8>,
}

async fn read_slot(images: &FaceImages, slot: ImageSlot) -> Result<Vec<u8>, EstimateError> {
    let source = images.get(slot).ok_or_else(|| EstimateError::ImageRead {
        slot,
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no photo in slot"),
    })?;
    source
        .read_bytes()
        .await
        .map_err(|source| EstimateError::ImageRead { slot, source })
}

async fn read_photos(images: &FaceImages) -> Result<PhotoBytes, EstimateError> {
    let (front, left, right) = tokio::try_join!(
        read_slot(images, ImageSlot::Front),
        read_slot(images, ImageSlot::Left),
        read_slot(images, ImageSlot::Right),
    )?;
    Ok(PhotoBytes { front, left, right })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ──────────────────────────────────────────────
// FaceAnalyzer
// ──────────────────────────────────────────────

pub struct FaceAnalyzer {
    remote: Option<Arc<dyn RemoteScorer>>,
    images: Mutex<FaceImages>,
    meta: Mutex<Value>,
    epoch: AtomicU64,
    state: watch::Sender<AnalysisState>,
}

impl FaceAnalyzer {
    /// Build with an explicit scorer. `offline` in the config disables it.
    pub fn new(config: AnalyzerConfig, remote: Option<Arc<dyn RemoteScorer>>) -> Self {
        let remote = remote.filter(|_| !config.offline);
        let (state, _) = watch::channel(AnalysisState::Waiting);
        Self {
            remote,
            images: Mutex::new(FaceImages::new()),
            meta: Mutex::new(Value::Null),
            epoch: AtomicU64::new(0),
            state,
        }
    }

    /// Build with the HTTP scorer when the config enables one.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, RemoteError> {
        let remote: Option<Arc<dyn RemoteScorer>> = match &config.remote_endpoint {
            Some(endpoint) if config.remote_enabled() => Some(Arc::new(HttpRemoteScorer::new(
                endpoint,
                config.remote_timeout_secs,
            )?)),
            _ => None,
        };
        Ok(Self::new(config, remote))
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AnalysisState {
        self.state.borrow().clone()
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn images(&self) -> FaceImages {
        lock(&self.images).clone()
    }

    pub fn meta(&self) -> Value {
        lock(&self.meta).clone()
    }

    /// Replace the intake answers. A change re-runs a complete photo set.
    #[must_use = "a returned request must be executed or spawned"]
    pub fn set_meta(&self, meta: Value) -> Option<AnalysisRequest> {
        {
            let mut current = lock(&self.meta);
            if *current == meta {
                return None;
            }
            *current = meta;
        }
        self.rerun()
    }

    #[must_use = "a returned request must be executed or spawned"]
    pub fn set_image(&self, slot: ImageSlot, source: Arc<dyn ImageSource>) -> Option<AnalysisRequest> {
        let mut images = lock(&self.images);
        images.set(slot, source);
        self.begin(&images)
    }

    pub fn clear_image(&self, slot: ImageSlot) {
        let mut images = lock(&self.images);
        images.clear(slot);
        self.begin(&images);
    }

    #[must_use = "a returned request must be executed or spawned"]
    pub fn set_images(&self, images: FaceImages) -> Option<AnalysisRequest> {
        let mut current = lock(&self.images);
        *current = images;
        self.begin(&current)
    }

    /// Start over against the current photos. `None` when a slot is empty.
    #[must_use = "a returned request must be executed or spawned"]
    pub fn rerun(&self) -> Option<AnalysisRequest> {
        let images = lock(&self.images);
        if !images.is_complete() {
            tracing::debug!(missing = ?images.missing(), "Re-run skipped, photo set incomplete");
            return None;
        }
        self.begin(&images)
    }

    /// Drop all photos and return to waiting.
    pub fn reset(&self) {
        let mut images = lock(&self.images);
        *images = FaceImages::new();
        self.begin(&images);
    }

    /// Bump the epoch and publish the entry state for `images`.
    ///
    /// The bump happens under the channel's write lock, the same lock every
    /// guarded publish takes, so an epoch check and its publish are atomic.
    fn begin(&self, images: &FaceImages) -> Option<AnalysisRequest> {
        let meta = self.meta();
        let mut request = None;
        self.state.send_modify(|state| {
            let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            if images.is_complete() {
                *state = AnalysisState::Analyzing { progress: 0 };
                request = Some(AnalysisRequest {
                    epoch,
                    images: images.clone(),
                    meta,
                });
            } else {
                *state = AnalysisState::Waiting;
            }
        });

        match &request {
            Some(r) => tracing::info!(epoch = r.epoch, "Photo set complete, analysis queued"),
            None => tracing::debug!(filled = images.count(), "Waiting for photos"),
        }
        request
    }

    fn is_current(&self, request: &AnalysisRequest) -> bool {
        self.epoch.load(Ordering::SeqCst) == request.epoch
    }

    /// Raise progress. Never lowers it, never touches a stale request.
    fn advance(&self, request: &AnalysisRequest, progress: u8) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current(request) {
                return false;
            }
            match state {
                AnalysisState::Analyzing { progress: current } if *current < progress => {
                    *current = progress;
                    true
                }
                _ => false,
            }
        })
    }

    /// Publish a terminal state if `request` still owns the machine.
    fn settle<F>(&self, request: &AnalysisRequest, next: F) -> bool
    where
        F: FnOnce(&AnalysisState) -> AnalysisState,
    {
        let applied = self.state.send_if_modified(|state| {
            if !self.is_current(request) || !matches!(state, AnalysisState::Analyzing { .. }) {
                return false;
            }
            *state = next(state);
            true
        });
        if !applied {
            tracing::debug!(
                epoch = request.epoch,
                current = self.current_epoch(),
                "Discarding superseded analysis"
            );
        }
        applied
    }

    /// Spawn `execute` on the tokio runtime.
    pub fn spawn(self: &Arc<Self>, request: AnalysisRequest) -> JoinHandle<bool> {
        let analyzer = Arc::clone(self);
        tokio::spawn(async move { analyzer.execute(request).await })
    }

    /// Set the photos and run to completion. Returns the resulting state.
    pub async fn analyze(&self, images: FaceImages) -> AnalysisState {
        if let Some(request) = self.set_images(images) {
            self.execute(request).await;
        }
        self.state()
    }

    /// Run one attempt. Returns whether its terminal state was published.
    pub async fn execute(&self, request: AnalysisRequest) -> bool {
        let span = tracing::info_span!("face_analysis", epoch = request.epoch);
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: AnalysisRequest) -> bool {
        let start = Instant::now();
        self.advance(&request, PROGRESS_STARTED);

        let photos = match read_photos(&request.images).await {
            Ok(photos) => Some(photos),
            Err(e) => {
                tracing::warn!(error = %e, "Photo read failed, skipping remote scoring");
                None
            }
        };

        if let (Some(remote), Some(photos)) = (&self.remote, &photos) {
            if !self.is_current(&request) {
                tracing::debug!("Request superseded before remote scoring");
                return false;
            }
            match self.score_remote(remote.as_ref(), photos, &request).await {
                Ok(result) => {
                    let source = result.source.to_string();
                    let applied = self.settle(&request, |_| AnalysisState::Done {
                        result: Arc::new(result),
                    });
                    tracing::info!(
                        %source,
                        applied,
                        elapsed_ms = %start.elapsed().as_millis(),
                        "Analysis complete"
                    );
                    return applied;
                }
                Err(e) => {
                    tracing::warn!(
                        provider = remote.provider(),
                        error = %e,
                        "Remote scoring failed, using local estimate"
                    );
                }
            }
        }

        let photos = match photos {
            Some(photos) => photos,
            None => match read_photos(&request.images).await {
                Ok(photos) => photos,
                Err(e) => {
                    tracing::error!(error = %e, "Photos unreadable, analysis failed");
                    return self.settle(&request, |state| AnalysisState::Error {
                        progress: state.progress(),
                        failure: AnalysisFailure::UnreadableImages,
                    });
                }
            },
        };

        let hashes = FaceHashes::from_bytes(&photos.front, &photos.left, &photos.right);
        let seed = hashes.seed();
        self.advance(&request, PROGRESS_SEEDED);

        let result = build_local_result(seed);
        let applied = self.settle(&request, |_| AnalysisState::Done {
            result: Arc::new(result),
        });
        tracing::info!(
            seed,
            source = "local",
            applied,
            elapsed_ms = %start.elapsed().as_millis(),
            "Analysis complete"
        );
        applied
    }

    async fn score_remote(
        &self,
        remote: &dyn RemoteScorer,
        photos: &PhotoBytes,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, EstimateError> {
        let payload = ScoringPayload::encode(
            &photos.front,
            &photos.left,
            &photos.right,
            request.meta.clone(),
        );
        self.advance(request, PROGRESS_ENCODED);
        tracing::debug!(
            provider = remote.provider(),
            payload_bytes = payload.encoded_len(),
            "Submitting photos for remote scoring"
        );

        let raw = remote.score(&payload).await?;
        if !raw.is_object() {
            return Err(RemoteError::Malformed.into());
        }
        Ok(normalize_server_out(Some(&raw)))
    }

    /// Advisory quality reports for the photos currently set.
    pub async fn check_quality(&self) -> Vec<(ImageSlot, QualityReport)> {
        let images = self.images();
        let mut reports = Vec::new();
        for slot in ImageSlot::ALL {
            let Some(source) = images.get(slot) else {
                continue;
            };
            match source.read_bytes().await {
                Ok(bytes) => reports.push((slot, assess_photo_quality(&bytes))),
                Err(e) => {
                    tracing::warn!(%slot, error = %e, "Could not read photo for quality check")
                }
            }
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;
    use crate::pipeline::estimate::remote::MockRemoteScorer;
    use crate::pipeline::estimate::source::MemoryImage;
    use crate::pipeline::estimate::types::{ResultSource, SkinType};

    fn memory(bytes: &[u8]) -> Arc<dyn ImageSource> {
        Arc::new(MemoryImage::new(bytes.to_vec()))
    }

    /// Photos whose seed is 118248761.
    fn fixture_images() -> FaceImages {
        FaceImages::complete(memory(&[1, 2, 3]), memory(&[4, 5, 6]), memory(&[7, 8, 9]))
    }

    fn local_only() -> FaceAnalyzer {
        FaceAnalyzer::new(AnalyzerConfig::default(), None)
    }

    fn with_remote(scorer: Arc<dyn RemoteScorer>) -> FaceAnalyzer {
        FaceAnalyzer::new(AnalyzerConfig::default(), Some(scorer))
    }

    struct BrokenImage;

    #[async_trait]
    impl ImageSource for BrokenImage {
        async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
            Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "corrupt"))
        }

        fn describe(&self) -> String {
            "broken".into()
        }
    }

    /// Fails the first read, succeeds afterwards.
    struct FlakyImage {
        reads: AtomicUsize,
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl ImageSource for FlakyImage {
        async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(std::io::Error::new(std::io::ErrorKind::Interrupted, "busy"))
            } else {
                Ok(self.bytes.clone())
            }
        }

        fn describe(&self) -> String {
            "flaky".into()
        }
    }

    /// Blocks until the gate is opened.
    struct GatedImage {
        gate: Arc<Notify>,
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl ImageSource for GatedImage {
        async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
            self.gate.notified().await;
            Ok(self.bytes.clone())
        }

        fn describe(&self) -> String {
            "gated".into()
        }
    }

    #[test]
    fn starts_waiting() {
        let analyzer = local_only();
        let state = analyzer.state();
        assert_eq!(state.status(), AnalysisStatus::Waiting);
        assert_eq!(state.progress(), 0);
        assert!(state.result().is_none());
    }

    #[test]
    fn incomplete_set_stays_waiting() {
        let analyzer = local_only();
        assert!(analyzer.set_image(ImageSlot::Front, memory(&[1])).is_none());
        assert!(analyzer.set_image(ImageSlot::Left, memory(&[2])).is_none());
        assert_eq!(analyzer.state(), AnalysisState::Waiting);

        let request = analyzer.set_image(ImageSlot::Right, memory(&[3]));
        assert!(request.is_some());
        assert_eq!(analyzer.state(), AnalysisState::Analyzing { progress: 0 });
    }

    #[tokio::test]
    async fn clearing_a_slot_returns_to_waiting() {
        let analyzer = local_only();
        let state = analyzer.analyze(fixture_images()).await;
        assert_eq!(state.status(), AnalysisStatus::Done);

        analyzer.clear_image(ImageSlot::Left);
        let state = analyzer.state();
        assert_eq!(state.status(), AnalysisStatus::Waiting);
        assert!(state.result().is_none());
        assert_eq!(state.progress(), 0);
    }

    #[tokio::test]
    async fn local_path_produces_fixture_result() {
        let analyzer = local_only();
        let state = analyzer.analyze(fixture_images()).await;

        assert_eq!(state.status(), AnalysisStatus::Done);
        assert_eq!(state.progress(), 100);
        let result = state.result().unwrap();
        assert_eq!(result.source, ResultSource::Local);
        assert_eq!(result.skin_type, SkinType::Dry);
        assert_eq!(result.overall_rating, 46);
        assert_eq!(result.potential_rating, 65);
        let scores: Vec<u32> = result.scores.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![5, 18, 38, 10, 75, 40, 35, 68]);
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_local() {
        let scorer = Arc::new(MockRemoteScorer::failing(|| RemoteError::Timeout(30)));
        let analyzer = with_remote(scorer.clone());

        let state = analyzer.analyze(fixture_images()).await;

        assert_eq!(scorer.calls(), 1);
        let result = state.result().unwrap();
        assert!(result.source.is_local());
        assert_eq!(result.overall_rating, 46);
    }

    #[tokio::test]
    async fn non_object_remote_body_falls_back_to_local() {
        let scorer = Arc::new(MockRemoteScorer::returning(json!(["not", "an", "object"])));
        let analyzer = with_remote(scorer);

        let state = analyzer.analyze(fixture_images()).await;
        assert!(state.result().unwrap().source.is_local());
    }

    #[tokio::test]
    async fn remote_success_is_normalized() {
        let scorer = Arc::new(MockRemoteScorer::returning(json!({
            "skin_type": "oily",
            "metrics": { "clarity": "72.4", "redness": 30, "oiliness": 81 },
            "flags": ["Oil control"],
            "overallRating": 64,
        })));
        let analyzer = with_remote(scorer);

        let state = analyzer.analyze(fixture_images()).await;
        let result = state.result().unwrap();
        assert_eq!(result.source, ResultSource::Remote("gpt".into()));
        assert_eq!(result.skin_type, SkinType::Oily);
        assert_eq!(result.metrics.clarity, 72);
        assert_eq!(result.overall_rating, 64);
        assert_eq!(result.summary, "Type: oily. Priorities → Oil control…");
    }

    #[tokio::test]
    async fn offline_config_never_calls_remote() {
        let scorer = Arc::new(MockRemoteScorer::returning(json!({})));
        let config = AnalyzerConfig {
            offline: true,
            ..AnalyzerConfig::default()
        };
        let analyzer = FaceAnalyzer::new(config, Some(scorer.clone()));
        assert!(!analyzer.has_remote());

        let state = analyzer.analyze(fixture_images()).await;
        assert_eq!(scorer.calls(), 0);
        assert!(state.result().unwrap().source.is_local());
    }

    #[tokio::test]
    async fn meta_is_passed_through_to_payload() {
        let scorer = Arc::new(MockRemoteScorer::returning(json!({})));
        let analyzer = with_remote(scorer.clone());
        let meta = json!({ "skin": "combo", "issues": ["acne"], "budget": 40 });

        assert!(analyzer.set_meta(meta.clone()).is_none());
        analyzer.analyze(fixture_images()).await;

        let payload = scorer.last_payload().unwrap();
        assert_eq!(payload.meta, meta);
        assert_eq!(payload.front_b64, "AQID");
    }

    #[tokio::test]
    async fn changed_meta_reruns_complete_set() {
        let analyzer = local_only();
        analyzer.analyze(fixture_images()).await;

        let request = analyzer.set_meta(json!({ "skin": "dry" })).unwrap();
        assert_eq!(analyzer.state().status(), AnalysisStatus::Analyzing);
        // same meta again is a no-op
        assert!(analyzer.set_meta(json!({ "skin": "dry" })).is_none());

        assert!(analyzer.execute(request).await);
        let state = analyzer.state();
        assert_eq!(state.status(), AnalysisStatus::Done);
        assert_eq!(state.result().unwrap().overall_rating, 46);
    }

    #[tokio::test]
    async fn meta_change_after_done_reaches_done_when_spawned() {
        let analyzer = Arc::new(local_only());
        analyzer.analyze(fixture_images()).await;

        let request = analyzer.set_meta(json!({ "budget": "low" })).unwrap();
        assert!(analyzer.spawn(request).await.unwrap());
        assert_eq!(analyzer.state().status(), AnalysisStatus::Done);
    }

    #[tokio::test]
    async fn empty_slot_reads_as_not_found() {
        let images = FaceImages::new()
            .with(ImageSlot::Front, memory(&[1]))
            .with(ImageSlot::Right, memory(&[3]));
        let err = read_photos(&images).await.err().unwrap();
        match err {
            EstimateError::ImageRead { slot, source } => {
                assert_eq!(slot, ImageSlot::Left);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreadable_images_end_in_error() {
        let scorer = Arc::new(MockRemoteScorer::returning(json!({})));
        let analyzer = with_remote(scorer.clone());
        let images = FaceImages::complete(Arc::new(BrokenImage), memory(&[4]), memory(&[7]));

        let state = analyzer.analyze(images).await;

        assert_eq!(state.status(), AnalysisStatus::Error);
        assert_eq!(state.error_message(), Some(ANALYSIS_FAILED_MESSAGE));
        assert!(state.result().is_none());
        assert_eq!(scorer.calls(), 0);
    }

    #[tokio::test]
    async fn one_failed_read_is_retried_on_local_path() {
        let analyzer = local_only();
        let flaky = Arc::new(FlakyImage {
            reads: AtomicUsize::new(0),
            bytes: vec![1, 2, 3],
        });
        let images = FaceImages::complete(flaky, memory(&[4, 5, 6]), memory(&[7, 8, 9]));

        let state = analyzer.analyze(images).await;
        assert_eq!(state.result().unwrap().overall_rating, 46);
    }

    #[tokio::test]
    async fn stale_result_never_overwrites_newer_one() {
        let analyzer = Arc::new(local_only());
        let gate = Arc::new(Notify::new());
        let slow: Arc<dyn ImageSource> = Arc::new(GatedImage {
            gate: gate.clone(),
            bytes: vec![200],
        });

        let first = analyzer
            .set_images(FaceImages::complete(slow, memory(&[4]), memory(&[7])))
            .unwrap();
        let first_epoch = first.epoch();
        let handle = analyzer.spawn(first);

        let second = analyzer.set_images(fixture_images()).unwrap();
        assert!(second.epoch() > first_epoch);
        assert!(analyzer.execute(second).await);
        let expected = analyzer.state();
        assert_eq!(expected.result().unwrap().overall_rating, 46);

        gate.notify_one();
        assert!(!handle.await.unwrap());
        assert_eq!(analyzer.state(), expected);
    }

    #[tokio::test]
    async fn rerun_recomputes_with_new_epoch() {
        let analyzer = local_only();
        assert!(analyzer.rerun().is_none());

        analyzer.analyze(fixture_images()).await;
        let before = analyzer.current_epoch();
        let first = analyzer.state();

        let request = analyzer.rerun().unwrap();
        assert!(request.epoch() > before);
        assert_eq!(analyzer.state(), AnalysisState::Analyzing { progress: 0 });
        assert!(analyzer.execute(request).await);
        assert_eq!(
            analyzer.state().result().unwrap().as_ref(),
            first.result().unwrap().as_ref()
        );
    }

    #[tokio::test]
    async fn superseded_request_is_discarded() {
        let analyzer = local_only();
        let old = analyzer.set_images(fixture_images()).unwrap();
        let _new = analyzer.rerun().unwrap();

        assert!(!analyzer.execute(old).await);
        assert_eq!(analyzer.state(), AnalysisState::Analyzing { progress: 0 });
    }

    #[tokio::test]
    async fn reset_returns_to_waiting_and_clears_photos() {
        let analyzer = local_only();
        analyzer.analyze(fixture_images()).await;
        analyzer.reset();
        assert_eq!(analyzer.state(), AnalysisState::Waiting);
        assert_eq!(analyzer.images().count(), 0);
    }

    #[tokio::test]
    async fn observed_progress_is_monotonic() {
        let scorer = Arc::new(MockRemoteScorer::failing(|| RemoteError::Malformed));
        let analyzer = Arc::new(with_remote(scorer));
        let request = analyzer.set_images(fixture_images()).unwrap();

        let mut rx = analyzer.subscribe();
        let watcher = tokio::spawn(async move {
            let initial = rx.borrow_and_update().clone();
            let mut seen = vec![initial.progress()];
            if initial.is_terminal() {
                return seen;
            }
            loop {
                if rx.changed().await.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                seen.push(state.progress());
                if state.is_terminal() {
                    break;
                }
            }
            seen
        });

        analyzer.spawn(request).await.unwrap();
        let seen = watcher.await.unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress: {seen:?}");
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn from_config_builds_http_scorer_only_when_enabled() {
        let local = FaceAnalyzer::from_config(AnalyzerConfig::default()).unwrap();
        assert!(!local.has_remote());

        let config = AnalyzerConfig {
            remote_endpoint: Some("http://localhost:8787/api/analyze".into()),
            ..AnalyzerConfig::default()
        };
        let remote = FaceAnalyzer::from_config(config).unwrap();
        assert!(remote.has_remote());
    }

    #[tokio::test]
    async fn quality_reports_cover_set_slots() {
        let analyzer = local_only();
        assert!(analyzer.set_image(ImageSlot::Front, memory(&[1, 2, 3])).is_none());
        assert!(analyzer.set_image(ImageSlot::Right, Arc::new(BrokenImage)).is_none());

        let reports = analyzer.check_quality().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, ImageSlot::Front);
    }
}
