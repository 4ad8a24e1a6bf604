use crate::application::{BatchWorker, WorkerEvent};
use crate::domain::{BatchPhase, DownloadBatch};
use crate::ui::{DownloadMessage, DownloadView};
use futures::StreamExt;
use iced::Task;
use std::path::PathBuf;
use tracing::{error, info};

pub struct DownloadApp {
    view: DownloadView,
    worker: BatchWorker,
}

impl DownloadApp {
    pub fn new(worker: BatchWorker) -> Self {
        Self {
            view: DownloadView::default(),
            worker,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    /// Result of the "Change Directory" picker
    DefaultDirectorySelected(Option<PathBuf>),
    /// (Batch URLs, Picked directory) for a download without a default
    OutputDirectorySelected(Vec<String>, Option<PathBuf>),
    Worker(WorkerEvent),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::ChangeDirectoryPressed => {
                    return Task::perform(
                        pick_directory("Select Default Download Directory"),
                        Message::DefaultDirectorySelected,
                    );
                }
                DownloadMessage::DownloadPressed => {
                    let Some(urls) = app.view.batch_urls() else {
                        return Task::none();
                    };

                    if let Some(output_dir) = app.view.default_output_dir.clone() {
                        return start_batch(app, DownloadBatch { urls, output_dir });
                    }

                    app.view.phase = BatchPhase::AwaitingDirectory;
                    return Task::perform(pick_directory("Select Output Directory"), move |dir| {
                        Message::OutputDirectorySelected(urls.clone(), dir)
                    });
                }
                DownloadMessage::UrlInputChanged(_) | DownloadMessage::AddUrlPressed => {}
            }
        }
        Message::DefaultDirectorySelected(Some(dir)) => {
            info!("Default output directory set to {}", dir.display());
            app.view.default_output_dir = Some(dir);
        }
        Message::DefaultDirectorySelected(None) => {}
        Message::OutputDirectorySelected(urls, dir) => match dir {
            Some(output_dir) => return start_batch(app, DownloadBatch { urls, output_dir }),
            None => app.view.phase = BatchPhase::Idle,
        },
        Message::Worker(event) => match event {
            WorkerEvent::Progress(percent) => app.view.set_progress(percent),
            WorkerEvent::Finished => app.view.finish_batch(),
            WorkerEvent::Failed(e) => {
                // Nothing is shown to the user; the list stays for a retry
                error!("Download batch failed: {}", e);
                app.view.abandon_batch();
            }
        },
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}

fn start_batch(app: &mut DownloadApp, batch: DownloadBatch) -> Task<Message> {
    info!(
        "Downloading {} URL(s) to {}",
        batch.urls.len(),
        batch.output_dir.display()
    );
    app.view.phase = BatchPhase::Running;
    app.view.set_progress(0);
    Task::stream(app.worker.run(batch).map(Message::Worker))
}

async fn pick_directory(title: &'static str) -> Option<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title(title)
        .pick_folder()
        .await
        .map(|handle| handle.path().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ytdlp::{YtDlpClient, YtDlpConfig};

    fn test_app() -> DownloadApp {
        DownloadApp::new(BatchWorker::new(YtDlpClient::new(YtDlpConfig {
            binary: PathBuf::from("yt-dlp-not-invoked"),
            ..YtDlpConfig::default()
        })))
    }

    fn add(app: &mut DownloadApp, url: &str) {
        let _ = update(
            app,
            Message::UiMessage(DownloadMessage::UrlInputChanged(url.to_string())),
        );
        let _ = update(app, Message::UiMessage(DownloadMessage::AddUrlPressed));
    }

    #[test]
    fn test_download_with_empty_list_is_noop() {
        let mut app = test_app();
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::DownloadPressed));
        assert_eq!(app.view.phase, BatchPhase::Idle);
    }

    #[test]
    fn test_default_directory_skips_the_picker() {
        let mut app = test_app();
        let _ = update(
            &mut app,
            Message::DefaultDirectorySelected(Some(PathBuf::from("/music"))),
        );
        let _ = update(&mut app, Message::DefaultDirectorySelected(None));
        assert_eq!(app.view.default_output_dir, Some(PathBuf::from("/music")));

        add(&mut app, "https://youtu.be/a");
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::DownloadPressed));
        assert_eq!(app.view.phase, BatchPhase::Running);
    }

    #[test]
    fn test_download_without_default_waits_for_picker() {
        let mut app = test_app();
        add(&mut app, "https://youtu.be/a");

        let _ = update(&mut app, Message::UiMessage(DownloadMessage::DownloadPressed));
        assert_eq!(app.view.phase, BatchPhase::AwaitingDirectory);

        let _ = update(
            &mut app,
            Message::OutputDirectorySelected(vec!["https://youtu.be/a".to_string()], None),
        );
        assert_eq!(app.view.phase, BatchPhase::Idle);
        assert_eq!(app.view.urls, vec!["https://youtu.be/a"]);
        assert_eq!(app.view.default_output_dir, None);

        let _ = update(
            &mut app,
            Message::OutputDirectorySelected(
                vec!["https://youtu.be/a".to_string()],
                Some(PathBuf::from("/tmp")),
            ),
        );
        assert_eq!(app.view.phase, BatchPhase::Running);
        assert_eq!(app.view.default_output_dir, None);
    }

    #[test]
    fn test_worker_events_drive_the_progress_bar() {
        let mut app = test_app();
        add(&mut app, "https://youtu.be/a");
        add(&mut app, "https://youtu.be/b");
        app.view.phase = BatchPhase::Running;

        let _ = update(&mut app, Message::Worker(WorkerEvent::Progress(37)));
        assert_eq!(app.view.progress, 37);
        assert_eq!(app.view.urls.len(), 2);

        let _ = update(&mut app, Message::Worker(WorkerEvent::Finished));
        assert_eq!(app.view.progress, 100);
        assert!(app.view.urls.is_empty());
        assert_eq!(app.view.phase, BatchPhase::Idle);
    }

    #[test]
    fn test_failure_is_silent() {
        let mut app = test_app();
        add(&mut app, "https://youtu.be/a");
        app.view.phase = BatchPhase::Running;

        let _ = update(&mut app, Message::Worker(WorkerEvent::Progress(64)));
        let _ = update(
            &mut app,
            Message::Worker(WorkerEvent::Failed(crate::domain::AppError::ExitStatus(Some(1)))),
        );
        assert_eq!(app.view.progress, 64);
        assert_eq!(app.view.urls, vec!["https://youtu.be/a"]);
        assert_eq!(app.view.phase, BatchPhase::Idle);
    }
}
