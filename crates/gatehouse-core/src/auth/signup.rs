//! Resumable sign-up bookkeeping.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::paths;
use crate::validation::SignUpForm;

/// Steps of one sign-up attempt that already went through.
///
/// Keyed by the submitted username and email. Resubmitting the same identity
/// continues after the last finished step, so a failure halfway never
/// creates a second account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignUpProgress {
    pub username: String,
    pub email: String,
    /// Set once the backend accepted the new account.
    pub account_id: Option<String>,
    pub session_created: bool,
    pub uploaded_file_id: Option<String>,
    pub preferences_written: bool,
}

impl SignUpProgress {
    pub fn start(form: &SignUpForm) -> Self {
        Self {
            username: form.username.clone(),
            email: form.email.clone(),
            ..Self::default()
        }
    }

    /// Continues `previous` when it belongs to the same identity, otherwise
    /// starts over.
    pub fn resume_or_start(previous: Option<SignUpProgress>, form: &SignUpForm) -> Self {
        match previous {
            Some(progress) if progress.matches(form) => progress,
            _ => Self::start(form),
        }
    }

    pub fn matches(&self, form: &SignUpForm) -> bool {
        self.username == form.username && self.email.eq_ignore_ascii_case(&form.email)
    }

    pub fn account_created(&self) -> bool {
        self.account_id.is_some()
    }

    /// True when an avatar still has to be uploaded for this attempt.
    pub fn upload_pending(&self, has_avatar: bool) -> bool {
        has_avatar && self.uploaded_file_id.is_none()
    }
}

/// Unfinished sign-up kept on disk, so a later process can resume it.
///
/// The interactive page keeps progress in memory; headless commands start
/// a fresh process per attempt and need this file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    /// Store at `$GATEHOUSE_HOME/signup.json`.
    pub fn open_default() -> Self {
        Self::at(paths::signup_progress_path())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored record. A missing file means nothing is pending.
    pub fn load(&self) -> Result<Option<SignUpProgress>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&contents)
            .map(Some)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    pub fn save(&self, progress: &SignUpProgress) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let contents =
            serde_json::to_string_pretty(progress).context("Failed to serialize sign-up progress")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}
