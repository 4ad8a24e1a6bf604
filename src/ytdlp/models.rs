use serde::Deserialize;
use std::path::PathBuf;

use crate::utils::{parse_percent, percent_of};

/// Marker yt-dlp prints in front of every progress dictionary.
pub const PROGRESS_PREFIX: &str = "[progress] ";

/// Progress dictionary as rendered by `--progress-template "%(progress)j"`
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressReport {
    pub status: String,
    #[serde(rename = "_percent_str", default)]
    pub percent_str: Option<String>,
    #[serde(default)]
    pub downloaded_bytes: Option<u64>,
    #[serde(default)]
    pub total_bytes: Option<u64>,
    #[serde(default)]
    pub total_bytes_estimate: Option<f64>,
}

impl ProgressReport {
    pub fn is_downloading(&self) -> bool {
        self.status == "downloading"
    }

    /// Whole percent of the current item, preferring yt-dlp's own string.
    pub fn percent(&self) -> Option<u8> {
        if let Some(percent) = self.percent_str.as_deref().and_then(parse_percent) {
            return Some(percent);
        }

        let done = self.downloaded_bytes?;
        let total = self
            .total_bytes
            .or_else(|| self.total_bytes_estimate.map(|estimate| estimate as u64))?;
        percent_of(done, total)
    }
}

/// How yt-dlp is invoked for every batch. The default binary is the bare
/// name; `find_ytdlp` resolves a real path at startup.
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    pub binary: PathBuf,
    pub format: String,
    pub audio_format: String,
    pub audio_quality: String,
    pub output_template: String,
    pub ffmpeg_location: Option<PathBuf>,
    pub verbose: bool,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            format: "bestaudio/best".to_string(),
            audio_format: "mp3".to_string(),
            audio_quality: "192K".to_string(),
            output_template: "%(title)s.%(ext)s".to_string(),
            ffmpeg_location: None,
            verbose: true,
        }
    }
}
