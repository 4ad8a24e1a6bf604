use futures::{stream::BoxStream, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader, Split};
use tokio::process::{Child, ChildStdout};
use tracing::{debug, error, info};

use crate::{
    domain::{AppError, DownloadBatch},
    ytdlp::{parse_progress_line, YtDlpClient},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Percent (0..=100) of the item currently downloading
    Progress(u8),
    Finished,
    Failed(AppError),
}

/// Runs one yt-dlp process per batch and reports what it does.
#[derive(Clone)]
pub struct BatchWorker {
    client: YtDlpClient,
}

impl BatchWorker {
    pub fn new(client: YtDlpClient) -> Self {
        Self { client }
    }

    /// Event stream for one batch. Nothing starts until it is polled; the
    /// stream ends after a single `Finished` or `Failed`.
    pub fn run(&self, batch: DownloadBatch) -> BoxStream<'static, WorkerEvent> {
        futures::stream::unfold(
            WorkerState::Start {
                client: self.client.clone(),
                batch,
            },
            |state| async move {
                match state {
                    WorkerState::Start { client, batch } => {
                        let mut child = match client.spawn(&batch) {
                            Ok(child) => child,
                            Err(e) => {
                                return Some((WorkerEvent::Failed(e), WorkerState::Done));
                            }
                        };

                        if let Some(stderr) = child.stderr.take() {
                            tokio::spawn(async move {
                                let mut lines = BufReader::new(stderr).split(b'\n');
                                while let Ok(Some(line)) = lines.next_segment().await {
                                    debug!("yt-dlp: {}", decode_line(&line));
                                }
                            });
                        }

                        let Some(stdout) = child.stdout.take() else {
                            return Some((
                                WorkerEvent::Failed(AppError::Io(
                                    "yt-dlp stdout was not captured".to_string(),
                                )),
                                WorkerState::Done,
                            ));
                        };

                        let lines = BufReader::new(stdout).split(b'\n');
                        Some(next_event(child, lines).await)
                    }
                    WorkerState::Running { child, lines } => Some(next_event(child, lines).await),
                    WorkerState::Done => None,
                }
            },
        )
        .boxed()
    }
}

enum WorkerState {
    Start {
        client: YtDlpClient,
        batch: DownloadBatch,
    },
    Running {
        child: Child,
        lines: Split<BufReader<ChildStdout>>,
    },
    Done,
}

/// Read stdout until the next progress report or the end of output.
async fn next_event(
    mut child: Child,
    mut lines: Split<BufReader<ChildStdout>>,
) -> (WorkerEvent, WorkerState) {
    loop {
        match lines.next_segment().await {
            Ok(Some(raw)) => {
                let line = decode_line(&raw);
                if let Some(percent) = parse_progress_line(&line) {
                    return (WorkerEvent::Progress(percent), WorkerState::Running { child, lines });
                }
                debug!("yt-dlp: {}", line);
            }
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read yt-dlp output: {}", e);
                return (WorkerEvent::Failed(AppError::Io(e.to_string())), WorkerState::Done);
            }
        }
    }

    match child.wait().await {
        Ok(status) if status.success() => {
            info!("Batch finished");
            (WorkerEvent::Finished, WorkerState::Done)
        }
        Ok(status) => {
            error!("yt-dlp failed: {}", status);
            (
                WorkerEvent::Failed(AppError::ExitStatus(status.code())),
                WorkerState::Done,
            )
        }
        Err(e) => {
            error!("Failed to wait for yt-dlp: {}", e);
            (WorkerEvent::Failed(AppError::Io(e.to_string())), WorkerState::Done)
        }
    }
}

/// yt-dlp output is not guaranteed to be UTF-8 (titles in the locale code
/// page on Windows), so bad bytes are replaced instead of failing the read.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ytdlp::YtDlpConfig;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn stub_ytdlp(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn worker_for(binary: PathBuf) -> BatchWorker {
        BatchWorker::new(YtDlpClient::new(YtDlpConfig {
            binary,
            ..YtDlpConfig::default()
        }))
    }

    fn batch(dir: &Path) -> DownloadBatch {
        DownloadBatch {
            urls: vec!["https://youtu.be/a".to_string(), "https://youtu.be/b".to_string()],
            output_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_decode_line_replaces_invalid_bytes() {
        assert_eq!(decode_line(b"Beyonc\xe9.webm\r"), "Beyonc\u{fffd}.webm");
        assert_eq!(decode_line("Beyoncé".as_bytes()), "Beyoncé");
    }

    // One test only: exec of a stub fails with ETXTBSY if another test forks
    // while it is still open for writing.
    #[tokio::test]
    async fn test_worker_relays_progress_and_exit_status() {
        let dir = tempfile::tempdir().unwrap();

        let ok = stub_ytdlp(
            dir.path(),
            "ok-yt-dlp",
            r#"echo "[youtube] a: Downloading webpage"
echo '[progress] {"status": "downloading", "_percent_str": " 12.5%"}'
echo '[progress] {"status": "finished", "_percent_str": "100.0%"}'
echo '[progress] {"status": "downloading", "_percent_str": " 57.0%"}'
echo "verbose noise" >&2
exit 0"#,
        );
        let events: Vec<WorkerEvent> = worker_for(ok).run(batch(dir.path())).collect().await;
        assert_eq!(
            events,
            vec![
                WorkerEvent::Progress(12),
                WorkerEvent::Progress(57),
                WorkerEvent::Finished
            ]
        );

        let failing = stub_ytdlp(
            dir.path(),
            "failing-yt-dlp",
            r#"echo '[progress] {"status": "downloading", "_percent_str": " 30.0%"}'
exit 2"#,
        );
        let events: Vec<WorkerEvent> = worker_for(failing).run(batch(dir.path())).collect().await;
        assert_eq!(
            events,
            vec![
                WorkerEvent::Progress(30),
                WorkerEvent::Failed(AppError::ExitStatus(Some(2)))
            ]
        );

        let latin1 = stub_ytdlp(
            dir.path(),
            "latin1-yt-dlp",
            r#"printf '[download] Destination: Beyonc\351.webm\r\n'
printf 'caf\351 au lait\n' >&2
echo '[progress] {"status": "downloading", "_percent_str": " 50.0%"}'
exit 0"#,
        );
        let events: Vec<WorkerEvent> = worker_for(latin1).run(batch(dir.path())).collect().await;
        assert_eq!(events, vec![WorkerEvent::Progress(50), WorkerEvent::Finished]);

        let missing = worker_for(dir.path().join("no-such-binary"));
        let events: Vec<WorkerEvent> = missing.run(batch(dir.path())).collect().await;
        assert!(matches!(events.as_slice(), [WorkerEvent::Failed(AppError::Spawn(_))]));
    }
}
