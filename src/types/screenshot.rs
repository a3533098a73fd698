//! Screenshot wire types

use serde::{Deserialize, Serialize};

/// One stored screenshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotInfo {
    /// Capture time as sent by the client, also the file stem
    pub date_taken: i64,
    pub num_bytes: usize,
    pub data: Vec<u8>,
}

impl ScreenshotInfo {
    pub fn new(date_taken: i64, data: Vec<u8>) -> Self {
        Self {
            date_taken,
            num_bytes: data.len(),
            data,
        }
    }

    /// File name the screenshot is stored under
    pub fn file_name(&self) -> String {
        format!("{}.png", self.date_taken)
    }
}
