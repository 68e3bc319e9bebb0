use chrono::Local;
use iced::widget::{button, column, container, horizontal_rule, row, scrollable, text};
use iced::{Alignment, Color, Element, Length, Task, Theme};
use rfd::FileDialog;
use tracing::{error, info, warn};

mod capture;
mod config;
mod ingest;
mod state;
mod sync;
mod ui;

use capture::CaptureTimeResolver;
use config::AppConfig;
use state::data::ImageRef;
use state::form::{AnnotationForm, ObservationType};
use state::marks::{ActionRejected, MarkOutcome};
use state::AnnotationSession;
use sync::roster::{load_roster, ReviewerChoices, Roster};
use sync::{SyncError, SyncReport};

/// Severity of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Notice {
    kind: NoticeKind,
    text: String,
}

impl Notice {
    fn new(kind: NoticeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    fn color(&self) -> Color {
        match self.kind {
            NoticeKind::Info => Color::from_rgb(0.75, 0.8, 0.9),
            NoticeKind::Success => Color::from_rgb(0.45, 0.85, 0.5),
            NoticeKind::Warning => Color::from_rgb(0.95, 0.75, 0.3),
            NoticeKind::Error => Color::from_rgb(0.95, 0.4, 0.4),
        }
    }
}

/// Main application state
struct Annotator {
    config: AppConfig,
    /// Images, marks and saved records of this session
    session: AnnotationSession,
    form: AnnotationForm,
    /// Raw text of the retrieval date input, kept even when it does not parse
    date_text: String,
    /// `None` while the roster is still loading
    roster: Option<Result<Roster, String>>,
    reviewers: ReviewerChoices,
    notice: Option<Notice>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    PickImages,
    PickFolder,
    ImagesLoaded(Vec<ImageRef>),
    Next,
    Previous,
    MarkStart(bool),
    MarkEnd(bool),
    SingleImage(bool),
    SiteSelected(String),
    CameraSelected(String),
    RetrievalDateChanged(String),
    TypeSelected(ObservationType),
    SpeciesSelected(String),
    BehaviorSelected(String),
    ReviewerSelected(String),
    NotesChanged(String),
    Save,
    Sync,
    SyncFinished(Result<SyncReport, SyncError>),
    ClearAll,
    RefreshRoster,
    RosterLoaded(Result<Roster, String>),
}

fn today() -> chrono::NaiveDate {
    Local::now().date_naive()
}

impl Annotator {
    fn new() -> (Self, Task<Message>) {
        let config = AppConfig::load();
        let form = AnnotationForm::with_defaults(today());
        let date_text = form
            .retrieval_date
            .map(|d| d.format(state::form::DATE_FORMAT).to_string())
            .unwrap_or_default();

        info!("🐦 Annotator initialized");

        let mut annotator = Annotator {
            config,
            session: AnnotationSession::new(Box::new(CaptureTimeResolver::default())),
            form,
            date_text,
            roster: None,
            reviewers: ReviewerChoices {
                options: Vec::new(),
                available: false,
            },
            notice: None,
        };
        let task = annotator.refresh_roster();
        (annotator, task)
    }

    fn refresh_roster(&mut self) -> Task<Message> {
        self.roster = None;
        let backend = self.config.remote.backend.clone();
        let title = self.config.remote.assignments_table.clone();

        Task::perform(
            async move {
                tokio::task::spawn_blocking(move || load_roster(&backend, &title))
                    .await
                    .unwrap_or_else(|e| Err(format!("Roster task failed: {}", e)))
            },
            Message::RosterLoaded,
        )
    }

    fn set_notice(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.notice = Some(Notice::new(kind, text));
    }

    /// Turn a mark command's result into the status line
    fn report_mark(&mut self, result: Result<MarkOutcome, ActionRejected>) {
        match result {
            Ok(MarkOutcome::Marked {
                end_before_start: true,
            }) => self.set_notice(
                NoticeKind::Warning,
                "End image is before the start image. Saving is blocked until the marks are in order.",
            ),
            Ok(MarkOutcome::SingleImageOn) => {
                self.set_notice(NoticeKind::Info, "Single image mode: start and end locked to this image.")
            }
            Ok(MarkOutcome::SingleImageOff { marks_reset: true }) => {
                self.set_notice(NoticeKind::Info, "Single image mode off, marks cleared.")
            }
            Ok(_) => self.notice = None,
            Err(rejected) => self.set_notice(NoticeKind::Warning, rejected.to_string()),
        }
    }

    /// Everything back to a fresh session, reviewer included
    fn reset_all(&mut self) {
        self.form = AnnotationForm::with_defaults(today());
        self.date_text = today().format(state::form::DATE_FORMAT).to_string();
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PickImages => {
                let files = FileDialog::new()
                    .set_title("Select camera-trap images")
                    .add_filter("Images", ingest::IMAGE_EXTENSIONS)
                    .pick_files();

                if let Some(files) = files {
                    return self.update(Message::ImagesLoaded(ingest::from_paths(files)));
                }
            }
            Message::PickFolder => {
                let folder = FileDialog::new()
                    .set_title("Select a folder of camera-trap images")
                    .pick_folder();

                if let Some(folder) = folder {
                    self.set_notice(NoticeKind::Info, format!("Scanning {}...", folder.display()));
                    return Task::perform(
                        async move {
                            tokio::task::spawn_blocking(move || ingest::scan_folder(&folder))
                                .await
                                .unwrap_or_default()
                        },
                        Message::ImagesLoaded,
                    );
                }
            }
            Message::ImagesLoaded(images) => {
                if images.is_empty() {
                    self.set_notice(NoticeKind::Warning, "No .jpg, .jpeg or .png images found.");
                } else {
                    let count = images.len();
                    match self.session.set_images(images) {
                        Ok(()) => {
                            self.set_notice(NoticeKind::Success, format!("Loaded {} images.", count))
                        }
                        Err(rejected) => self.set_notice(
                            NoticeKind::Warning,
                            format!("{}; load the images again once it finishes.", rejected),
                        ),
                    }
                }
            }
            Message::Next => {
                self.session.next();
            }
            Message::Previous => {
                self.session.previous();
            }
            Message::MarkStart(on) => {
                let result = self.session.mark_start(on);
                self.report_mark(result);
            }
            Message::MarkEnd(on) => {
                let result = self.session.mark_end(on);
                self.report_mark(result);
            }
            Message::SingleImage(on) => {
                let result = self.session.set_single_image_mode(on);
                self.report_mark(result);
            }
            Message::SiteSelected(site) => self.form.site = site,
            Message::CameraSelected(camera) => self.form.camera = camera,
            Message::RetrievalDateChanged(value) => {
                self.form.set_retrieval_date_text(&value);
                self.date_text = value;
            }
            Message::TypeSelected(kind) => {
                self.form.set_observation_type(kind, &self.config.vocabulary);
            }
            Message::SpeciesSelected(species) => self.form.species = species,
            Message::BehaviorSelected(behavior) => self.form.behavior = behavior,
            Message::ReviewerSelected(reviewer) => self.form.reviewer_name = reviewer,
            Message::NotesChanged(notes) => self.form.notes = notes,
            Message::Save => match self.session.save(&self.form) {
                Ok(record) => {
                    let text = if record.is_single_image() {
                        format!("Single image annotation saved: {}", record.start_filename())
                    } else {
                        format!(
                            "Sequence saved: {} to {}",
                            record.start_filename(),
                            record.end_filename()
                        )
                    };
                    self.set_notice(NoticeKind::Success, text);
                }
                Err(err) => self.set_notice(NoticeKind::Error, err.to_string()),
            },
            Message::Sync => match self.session.begin_sync() {
                Ok(records) => {
                    self.set_notice(NoticeKind::Info, "Syncing started...");
                    let backend = self.config.remote.backend.clone();
                    let title = self.config.remote.annotations_table.clone();
                    let schema = self.config.schema;

                    return Task::perform(
                        async move {
                            tokio::task::spawn_blocking(move || {
                                sync::run_sync(&backend, &title, &schema, &records)
                            })
                            .await
                            .unwrap_or_else(|e| {
                                Err(SyncError::Unexpected {
                                    detail: e.to_string(),
                                })
                            })
                        },
                        Message::SyncFinished,
                    );
                }
                Err(err) => self.set_notice(NoticeKind::Warning, err.to_string()),
            },
            Message::SyncFinished(result) => {
                self.session.finish_sync(&result, &self.config.sync);

                match &result {
                    Ok(report) => {
                        let kind = if report.is_partial() {
                            NoticeKind::Warning
                        } else {
                            NoticeKind::Success
                        };
                        self.set_notice(kind, report.summary());
                        if self.config.sync.reset_images_after_sync && self.session.records().is_empty() {
                            self.reset_all();
                        }
                    }
                    Err(err) => {
                        error!("Sync failed: {}", err);
                        self.set_notice(NoticeKind::Error, err.to_string());
                    }
                }
            }
            Message::ClearAll => match self.session.clear_all() {
                Ok(()) => {
                    self.reset_all();
                    self.set_notice(NoticeKind::Info, "All local data and selections cleared.");
                    info!("All local data cleared");
                }
                Err(rejected) => self.set_notice(NoticeKind::Warning, rejected.to_string()),
            },
            Message::RefreshRoster => return self.refresh_roster(),
            Message::RosterLoaded(result) => {
                self.reviewers = ReviewerChoices::from_result(&result);
                if self.reviewers.available
                    && !self.reviewers.options.contains(&self.form.reviewer_name)
                {
                    self.form.reviewer_name.clear();
                }
                if !self.reviewers.available {
                    warn!("Reviewer list unavailable, falling back to free text");
                }
                self.roster = Some(result);
            }
        }

        Task::none()
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let idle = !self.session.is_syncing();
        let pickers = row![
            button("Pick images")
                .on_press_maybe(idle.then_some(Message::PickImages))
                .padding(8),
            button("Pick folder")
                .on_press_maybe(idle.then_some(Message::PickFolder))
                .padding(8),
        ]
        .spacing(10);

        let sidebar = column![
            pickers,
            horizontal_rule(1),
            ui::panels::marks(&self.session),
            horizontal_rule(1),
            ui::panels::form(&self.form, &self.date_text, &self.config.vocabulary, &self.reviewers),
            ui::panels::actions(&self.session),
        ]
        .spacing(14)
        .width(Length::Fixed(340.0));

        let notice: Element<'_, Message> = match &self.notice {
            Some(notice) => text(&notice.text).size(15).color(notice.color()).into(),
            None => text("").into(),
        };

        let roster_header = row![
            text("Camera assignments").size(18),
            button("Refresh").on_press(Message::RefreshRoster).padding(4),
        ]
        .spacing(12)
        .align_y(Alignment::Center);

        let main = column![
            container(ui::panels::viewer(&self.session)).height(Length::FillPortion(3)),
            notice,
            text(format!("Saved annotations ({})", self.session.records().len())).size(18),
            ui::tables::records(self.session.records(), &self.config.schema),
            roster_header,
            ui::tables::roster(self.roster.as_ref()),
        ]
        .spacing(12)
        .width(Length::Fill);

        container(row![scrollable(sidebar), main].spacing(24).padding(20))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn init_logging() {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(cfg!(debug_assertions));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();
}

fn main() -> iced::Result {
    init_logging();

    iced::application("Camera Trap Annotator", Annotator::update, Annotator::view)
        .theme(Annotator::theme)
        .centered()
        .run_with(Annotator::new)
}
