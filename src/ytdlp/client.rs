use regex::Regex;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::models::{ProgressReport, YtDlpConfig, PROGRESS_PREFIX};
use crate::domain::{AppError, DownloadBatch};
use crate::utils::parse_percent;

static CLASSIC_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?%).*\bETA\b").expect("valid progress regex")
});

#[derive(Debug, Clone)]
pub struct YtDlpClient {
    config: YtDlpConfig,
}

impl YtDlpClient {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    /// Command line for one batch: best audio, converted to MP3, named
    /// after the video title, with machine-readable progress on stdout.
    pub fn build_args(&self, batch: &DownloadBatch) -> Vec<OsString> {
        let config = &self.config;
        let mut args: Vec<OsString> = vec![
            "--format".into(),
            config.format.clone().into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            config.audio_format.clone().into(),
            "--audio-quality".into(),
            config.audio_quality.clone().into(),
            "--paths".into(),
            batch.output_dir.clone().into_os_string(),
            "--output".into(),
            config.output_template.clone().into(),
            // First failing URL ends the batch instead of being skipped
            "--abort-on-error".into(),
            "--encoding".into(),
            "utf-8".into(),
            "--newline".into(),
            "--no-colors".into(),
            "--progress-template".into(),
            format!("download:{}%(progress)j", PROGRESS_PREFIX).into(),
        ];

        if let Some(ffmpeg) = &config.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.clone().into_os_string());
        }

        if config.verbose {
            args.push("--verbose".into());
        }

        // Everything after this is a URL, even if it starts with a dash
        args.push("--".into());
        args.extend(batch.urls.iter().map(OsString::from));
        args
    }

    /// Start yt-dlp for the whole batch with stdout and stderr piped.
    pub fn spawn(&self, batch: &DownloadBatch) -> Result<Child, AppError> {
        info!(
            "Starting yt-dlp for {} URL(s) into {}",
            batch.urls.len(),
            batch.output_dir.display()
        );

        Command::new(&self.config.binary)
            .args(self.build_args(batch))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AppError::Spawn(format!("{}: {}", self.config.binary.display(), e))
            })
    }
}

/// Extract the current item's percentage from one line of yt-dlp stdout.
///
/// Only reports in the "downloading" state count. Lines in yt-dlp's
/// default `[download]  42.5% of ... ETA ...` layout are accepted too.
pub fn parse_progress_line(line: &str) -> Option<u8> {
    let line = line.trim_end();

    if let Some(json) = line.strip_prefix(PROGRESS_PREFIX) {
        return match serde_json::from_str::<ProgressReport>(json) {
            Ok(report) if report.is_downloading() => report.percent(),
            Ok(_) => None,
            Err(e) => {
                debug!("Unreadable progress report: {}", e);
                None
            }
        };
    }

    let caps = CLASSIC_PROGRESS.captures(line)?;
    parse_percent(&caps[1])
}

/// Locate yt-dlp: next to our executable first, then `PATH`.
///
/// Falls back to the bare name so that a missing binary surfaces as a
/// spawn error when the first batch starts.
pub fn find_ytdlp() -> PathBuf {
    let name = if cfg!(windows) { "yt-dlp.exe" } else { "yt-dlp" };

    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(name)))
        .filter(|path| path.is_file());
    if let Some(path) = beside_exe {
        info!("Using bundled yt-dlp: {}", path.display());
        return path;
    }

    match which::which("yt-dlp") {
        Ok(path) => {
            info!("Using yt-dlp from PATH: {}", path.display());
            path
        }
        Err(e) => {
            warn!("yt-dlp not found ({}), downloads will fail until it is installed", e);
            PathBuf::from(name)
        }
    }
}
