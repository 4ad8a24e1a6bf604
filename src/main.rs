mod app;
mod application;
mod domain;
mod ui;
mod utils;
mod ytdlp;

use application::BatchWorker;
use iced::{window, Size};
use ytdlp::{client::find_ytdlp, YtDlpClient, YtDlpConfig};

fn main() -> iced::Result {
    tracing_subscriber::fmt::init();

    let config = YtDlpConfig {
        binary: find_ytdlp(),
        ..YtDlpConfig::default()
    };
    let worker = BatchWorker::new(YtDlpClient::new(config));

    iced::application(
        move || app::DownloadApp::new(worker.clone()),
        app::update,
        app::view,
    )
    .title("YouTube to MP3 Downloader")
    .window(window::Settings {
        size: Size::new(800.0, 800.0),
        ..Default::default()
    })
    .run()
}
