//! Skin estimation pipeline.
//!
//! ```text
//! photos → sample_hash ×3 → combine_seed → build_local_result ─┐
//!       └→ ScoringPayload → RemoteScorer → normalize_server_out ┴→ AnalysisResult
//! ```
//!
//! `FaceAnalyzer` owns the state machine and decides which branch runs.

pub mod types;
pub mod hash;
pub mod findings;
pub mod local;
pub mod normalize;
pub mod source;
pub mod remote;
pub mod quality;
pub mod orchestrator;

pub use types::*;
pub use hash::*;
pub use findings::*;
pub use local::*;
pub use normalize::*;
pub use source::*;
pub use remote::*;
pub use quality::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("Could not read {slot} photo: {source}")]
    ImageRead {
        slot: ImageSlot,
        source: std::io::Error,
    },

    #[error("Remote scoring failed: {0}")]
    Remote(#[from] RemoteError),
}
