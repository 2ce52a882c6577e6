//! Image selection for the sign-up form: loading, checking and previews.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};

/// Largest accepted avatar.
pub const AVATAR_MAX_BYTES: u64 = 5 * 1024 * 1024;
/// Largest accepted cover photo.
pub const COVER_MAX_BYTES: u64 = 10 * 1024 * 1024;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Where a picked image goes on the sign-up form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    Avatar,
    Cover,
}

impl ImageSlot {
    pub fn max_bytes(self) -> u64 {
        match self {
            ImageSlot::Avatar => AVATAR_MAX_BYTES,
            ImageSlot::Cover => COVER_MAX_BYTES,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "Profile photo",
            ImageSlot::Cover => "Cover photo",
        }
    }

    /// Extensions offered by the picker. Empty means any image.
    pub fn picker_extensions(self) -> &'static [&'static str] {
        match self {
            ImageSlot::Avatar => &[],
            ImageSlot::Cover => &["png", "jpeg", "jpg", "webp", "avif", "gif"],
        }
    }

    /// Checks size first, then type.
    pub fn check(self, file: &SelectedFile) -> Result<(), SelectionRejected> {
        if file.size() > self.max_bytes() {
            return Err(SelectionRejected {
                slot: self,
                reason: RejectReason::TooLarge,
            });
        }
        if !file.is_image() {
            return Err(SelectionRejected {
                slot: self,
                reason: RejectReason::NotImage,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    TooLarge,
    NotImage,
}

/// A picked file that failed the slot's checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRejected {
    pub slot: ImageSlot,
    pub reason: RejectReason,
}

impl SelectionRejected {
    pub fn message(&self) -> &'static str {
        match (self.slot, self.reason) {
            (ImageSlot::Avatar, RejectReason::TooLarge) => "Image must be less than 5MB",
            (ImageSlot::Cover, RejectReason::TooLarge) => "Cover image must be less than 10MB",
            (ImageSlot::Avatar, RejectReason::NotImage) => {
                "Please select an image file (JPEG, PNG, etc.)"
            }
            (ImageSlot::Cover, RejectReason::NotImage) => "Please select an image file",
        }
    }
}

impl fmt::Display for SelectionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for SelectionRejected {}

/// File contents held in memory until submission.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl SelectedFile {
    /// Wraps bytes, sniffing the MIME type from content and falling back to
    /// the file extension.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .or_else(|| mime_type_for_extension(&name))
            .unwrap_or(FALLBACK_MIME)
            .to_string();
        Self { name, mime, bytes }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        Ok(Self::from_bytes(name, bytes))
    }

    /// Loads `path` for `slot`, refusing files over the slot's limit before
    /// reading any content.
    pub fn from_path_for(slot: ImageSlot, path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if metadata.len() > slot.max_bytes() {
            return Err(SelectionRejected {
                slot,
                reason: RejectReason::TooLarge,
            }
            .into());
        }
        Self::from_path(path)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// Returns the MIME type implied by an image file extension.
pub fn mime_type_for_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension().and_then(|e| e.to_str())?;

    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "avif" => Some("image/avif"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Normalizes a typed or pasted file path.
///
/// Undoes drag-and-drop shell escaping (`\ `, `\(`, `\)`), strips wrapping
/// quotes and expands `~/` to the home directory.
pub fn normalize_input_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    let unescaped = trimmed
        .replace("\\ ", " ")
        .replace("\\(", "(")
        .replace("\\)", ")");

    if let Some(rest) = unescaped.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }

    PathBuf::from(unescaped)
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    live: HashMap<u64, String>,
}

/// Tracks preview handles that are still alive.
///
/// Stands in for the object URLs a browser keeps for picked files. Cloning
/// shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a preview for `file` and returns its handle.
    pub fn create(&self, file: &SelectedFile) -> PreviewHandle {
        let id = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.next_id += 1;
            let id = inner.next_id;
            inner.live.insert(id, file.name.clone());
            id
        };

        PreviewHandle {
            id,
            url: format!("blob:gatehouse/{id}"),
            registry: Arc::clone(&self.inner),
        }
    }

    /// Number of handles not yet dropped.
    pub fn live_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .len()
    }
}

/// Local preview of a picked file. Dropping it releases the entry.
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    url: String,
    registry: Arc<Mutex<RegistryInner>>,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .remove(&self.id);
    }
}

/// Accepted image together with its live preview.
#[derive(Debug)]
pub struct ImageSelection {
    pub file: SelectedFile,
    pub preview: PreviewHandle,
}

impl ImageSelection {
    /// Checks `file` against `slot` and registers a preview on success.
    pub fn accept(
        slot: ImageSlot,
        file: SelectedFile,
        registry: &PreviewRegistry,
    ) -> Result<Self, SelectionRejected> {
        slot.check(&file)?;
        let preview = registry.create(&file);
        Ok(Self { file, preview })
    }
}
