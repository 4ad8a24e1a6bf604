use iced::{
    widget::{button, column, progress_bar, row, scrollable, text, text_input, Column},
    Element, Length,
};
use std::path::PathBuf;

use crate::domain::BatchPhase;

/// Main view state
#[derive(Default)]
pub struct DownloadView {
    pub url_input: String,
    pub urls: Vec<String>,
    pub progress: u8,
    pub default_output_dir: Option<PathBuf>,
    pub phase: BatchPhase,
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlInputChanged(String),
    AddUrlPressed,
    ChangeDirectoryPressed,
    DownloadPressed,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlInputChanged(url) => {
                self.url_input = url;
            }
            DownloadMessage::AddUrlPressed => self.add_url(),
            DownloadMessage::ChangeDirectoryPressed | DownloadMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
    }

    /// Move the input text into the list. Blank input is ignored.
    pub fn add_url(&mut self) {
        let url = self.url_input.trim();
        if url.is_empty() {
            return;
        }
        self.urls.push(url.to_string());
        self.url_input.clear();
    }

    /// Snapshot of the queued URLs, or `None` when there is nothing to do
    /// or a batch is already under way.
    pub fn batch_urls(&self) -> Option<Vec<String>> {
        if self.urls.is_empty() || self.phase != BatchPhase::Idle {
            return None;
        }
        Some(self.urls.clone())
    }

    pub fn set_progress(&mut self, percent: u8) {
        self.progress = percent.min(100);
    }

    pub fn finish_batch(&mut self) {
        self.progress = 100;
        self.urls.clear();
        self.phase = BatchPhase::Idle;
    }

    /// The batch died; list and progress keep their last state.
    pub fn abandon_batch(&mut self) {
        self.phase = BatchPhase::Idle;
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let directory_label = match &self.default_output_dir {
            Some(dir) => format!("Default directory: {}", dir.display()),
            None => "No default directory".to_string(),
        };

        let url_list = Column::with_children(self.urls.iter().map(|url| url_row(url))).spacing(4);

        let can_download = self.phase == BatchPhase::Idle && !self.urls.is_empty();

        column![
            text_input("Paste a video URL...", &self.url_input)
                .on_input(DownloadMessage::UrlInputChanged)
                .on_submit(DownloadMessage::AddUrlPressed)
                .padding(10),
            row![
                button("Add URL")
                    .on_press(DownloadMessage::AddUrlPressed)
                    .padding([10, 20]),
                button("Change Directory")
                    .on_press(DownloadMessage::ChangeDirectoryPressed)
                    .padding([10, 20]),
            ]
            .spacing(10),
            text(directory_label).size(14),
            scrollable(url_list).height(Length::Fill).width(Length::Fill),
            button("Download")
                .on_press_maybe(can_download.then_some(DownloadMessage::DownloadPressed))
                .padding([10, 20]),
            progress_bar(0.0..=100.0, f32::from(self.progress)),
            text(format!("{}%", self.progress)).size(14),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}

fn url_row(url: &str) -> Element<'_, DownloadMessage> {
    text(url).size(14).into()
}
