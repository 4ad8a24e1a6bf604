use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Failed to start yt-dlp: {0}")]
    Spawn(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("yt-dlp exited with {}", describe_exit(*.0))]
    ExitStatus(Option<i32>),
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}
