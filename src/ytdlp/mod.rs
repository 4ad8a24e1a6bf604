pub mod client;
pub mod models;

pub use client::{parse_progress_line, YtDlpClient};
pub use models::YtDlpConfig;
