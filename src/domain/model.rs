use std::path::PathBuf;

/// URLs queued when Download was pressed, plus where their MP3s go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadBatch {
    pub urls: Vec<String>,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPhase {
    #[default]
    Idle,
    AwaitingDirectory,
    Running,
}
