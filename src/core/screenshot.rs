//! Screenshot store: per-player screenshot folders on disk
//!
//! Layout: `<universe>/Screenshots/<player>/<date_taken>.png`
//!
//! Uploads are rate limited per player and never overwrite an existing file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::{PlayerId, ReasonCode, ScreenshotInfo};
use crate::SCREENSHOT_FOLDER;

/// Error types for screenshot operations
#[derive(Debug, Error)]
pub enum ScreenshotError {
    /// A screenshot with this name already exists
    #[error("{player} tried to overwrite screenshot {file}")]
    DuplicateWrite { player: PlayerId, file: String },

    /// Player uploads faster than the configured interval
    #[error("{player} is sending screenshots too fast")]
    RateExceeded { player: PlayerId },

    /// Folder name is not a single path component
    #[error("Invalid folder name: {0}")]
    InvalidName(String),

    /// No such screenshot
    #[error("Screenshot not found: {0}")]
    NotFound(String),

    #[error("Screenshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ScreenshotError {
    /// Reason code for policy rejections
    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            ScreenshotError::DuplicateWrite { .. } => Some(ReasonCode::S001_DUPLICATE_WRITE),
            ScreenshotError::RateExceeded { .. } => Some(ReasonCode::S001_RATE_EXCEEDED),
            _ => None,
        }
    }
}

/// Screenshot folders under one universe directory
#[derive(Debug)]
pub struct ScreenshotStore {
    root: PathBuf,
    min_interval: Duration,
    last_upload: DashMap<PlayerId, DateTime<Utc>>,
}

impl ScreenshotStore {
    pub fn new(universe_dir: impl AsRef<Path>, min_interval_ms: u64) -> Self {
        Self {
            root: universe_dir.as_ref().join(SCREENSHOT_FOLDER),
            min_interval: Duration::milliseconds(min_interval_ms as i64),
            last_upload: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a screenshot for `player`, returning the written path
    ///
    /// The player's rate window only advances when the file is written.
    pub fn save(&self, player: &PlayerId, screenshot: &ScreenshotInfo) -> Result<PathBuf, ScreenshotError> {
        let folder = self.folder_path(player.as_str())?;
        let now = Utc::now();

        // Held until the write finishes so one player's uploads are serialized
        let last_upload = self.last_upload.entry(player.clone());
        if let Entry::Occupied(last) = &last_upload {
            if now - *last.get() < self.min_interval {
                warn!(%player, reason = ReasonCode::S001_RATE_EXCEEDED.code(), "sending screenshots too fast");
                return Err(ScreenshotError::RateExceeded { player: player.clone() });
            }
        }

        fs::create_dir_all(&folder)?;
        let file = screenshot.file_name();
        let path = folder.join(&file);
        if path.exists() {
            warn!(
                %player,
                file = %file,
                reason = ReasonCode::S001_DUPLICATE_WRITE.code(),
                "tried to overwrite a screenshot"
            );
            return Err(ScreenshotError::DuplicateWrite {
                player: player.clone(),
                file,
            });
        }

        fs::write(&path, &screenshot.data)?;
        last_upload.insert(now);
        info!(
            %player,
            file = %file,
            bytes = screenshot.data.len(),
            reason = ReasonCode::S001_SCREENSHOT_SAVED.code(),
            "screenshot saved"
        );
        Ok(path)
    }

    /// Names of all player folders, sorted
    pub fn folders(&self) -> Result<Vec<String>, ScreenshotError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut folders = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    folders.push(name.to_string());
                }
            }
        }
        folders.sort();
        Ok(folders)
    }

    /// Every screenshot in `folder`, oldest first
    pub fn list(&self, folder: &str) -> Result<Vec<ScreenshotInfo>, ScreenshotError> {
        let dir = self.folder_path(folder)?;
        if !dir.is_dir() {
            return Err(ScreenshotError::NotFound(folder.to_string()));
        }

        let mut screenshots = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if let Some(date_taken) = parse_date_taken(&path) {
                screenshots.push(ScreenshotInfo::new(date_taken, fs::read(&path)?));
            }
        }
        screenshots.sort_by_key(|s| s.date_taken);
        Ok(screenshots)
    }

    /// One screenshot by its capture time
    pub fn get(&self, folder: &str, photo_id: i64) -> Result<ScreenshotInfo, ScreenshotError> {
        let path = self.folder_path(folder)?.join(format!("{}.png", photo_id));
        match fs::read(&path) {
            Ok(data) => Ok(ScreenshotInfo::new(photo_id, data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ScreenshotError::NotFound(format!("{}/{}", folder, photo_id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn folder_path(&self, folder: &str) -> Result<PathBuf, ScreenshotError> {
        let valid = !folder.is_empty()
            && folder != "."
            && folder != ".."
            && !folder.contains(['/', '\\', '\0']);
        if !valid {
            return Err(ScreenshotError::InvalidName(folder.to_string()));
        }
        Ok(self.root.join(folder))
    }
}

/// `<digits>.png` → digits
fn parse_date_taken(path: &Path) -> Option<i64> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

// =============================================================================
// TESTS
// =============================================================================
