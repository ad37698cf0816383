//! Byte sources for the three face photos.
//!
//! The pipeline never decodes pixels for scoring; it only needs the raw
//! bytes, which may live in memory (uploads) or on disk (CLI).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::types::ImageSlot;

/// Readable photo bytes. Implementations must be cheap to share.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn read_bytes(&self) -> std::io::Result<Vec<u8>>;

    /// Short label for logs. Never includes image content.
    fn describe(&self) -> String;
}

/// Photo already held in memory.
pub struct MemoryImage {
    bytes: Arc<[u8]>,
}

impl MemoryImage {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl ImageSource for MemoryImage {
    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.to_vec())
    }

    fn describe(&self) -> String {
        format!("memory ({} bytes)", self.bytes.len())
    }
}

/// Photo on disk, read on every attempt.
pub struct FileImage {
    path: PathBuf,
}

impl FileImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImageSource for FileImage {
    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// The wizard's three photo slots. Any slot may be empty.
#[derive(Clone, Default)]
pub struct FaceImages {
    slots: HashMap<ImageSlot, Arc<dyn ImageSource>>,
}

impl FaceImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a complete set.
    pub fn complete(
        front: Arc<dyn ImageSource>,
        left: Arc<dyn ImageSource>,
        right: Arc<dyn ImageSource>,
    ) -> Self {
        let mut images = Self::new();
        images.set(ImageSlot::Front, front);
        images.set(ImageSlot::Left, left);
        images.set(ImageSlot::Right, right);
        images
    }

    pub fn with(mut self, slot: ImageSlot, source: Arc<dyn ImageSource>) -> Self {
        self.set(slot, source);
        self
    }

    pub fn set(&mut self, slot: ImageSlot, source: Arc<dyn ImageSource>) {
        self.slots.insert(slot, source);
    }

    pub fn clear(&mut self, slot: ImageSlot) {
        self.slots.remove(&slot);
    }

    pub fn get(&self, slot: ImageSlot) -> Option<&Arc<dyn ImageSource>> {
        self.slots.get(&slot)
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// All three slots filled.
    pub fn is_complete(&self) -> bool {
        ImageSlot::ALL.iter().all(|slot| self.slots.contains_key(slot))
    }

    pub fn missing(&self) -> Vec<ImageSlot> {
        ImageSlot::ALL
            .iter()
            .copied()
            .filter(|slot| !self.slots.contains_key(slot))
            .collect()
    }
}

impl std::fmt::Debug for FaceImages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for slot in ImageSlot::ALL {
            if let Some(source) = self.slots.get(&slot) {
                map.entry(&slot.as_str(), &source.describe());
            }
        }
        map.finish()
    }
}
