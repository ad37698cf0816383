//! Seed derivation from raw photo bytes.
//!
//! Photos are large, so the hash samples one byte every `SAMPLE_STRIDE`
//! bytes instead of reading all of them. Output only has to be stable
//! for identical content, not collision resistant.

use serde::Serialize;

/// FNV-1a 32-bit offset basis.
pub const FNV_OFFSET_BASIS: u32 = 2_166_136_261;

/// FNV 32-bit prime.
pub const FNV_PRIME: u32 = 16_777_619;

/// Distance between sampled bytes.
pub const SAMPLE_STRIDE: usize = 4096;

/// Sampled FNV-style hash of a byte buffer.
///
/// XOR then multiply (wrapping) for every `SAMPLE_STRIDE`-th byte,
/// starting at index 0. An empty buffer hashes to the offset basis.
pub fn sample_hash(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .step_by(SAMPLE_STRIDE)
        .fold(FNV_OFFSET_BASIS, |acc, &b| {
            (acc ^ u32::from(b)).wrapping_mul(FNV_PRIME)
        })
}

/// XOR of the three per-slot hashes.
pub fn combine_seed(front: u32, left: u32, right: u32) -> u32 {
    front ^ left ^ right
}

/// Per-slot hashes of one complete photo set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaceHashes {
    pub front: u32,
    pub left: u32,
    pub right: u32,
}

impl FaceHashes {
    pub fn from_bytes(front: &[u8], left: &[u8], right: &[u8]) -> Self {
        Self {
            front: sample_hash(front),
            left: sample_hash(left),
            right: sample_hash(right),
        }
    }

    pub fn seed(&self) -> u32 {
        combine_seed(self.front, self.left, self.right)
    }
}
