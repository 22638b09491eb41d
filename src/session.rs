//! The top-level view: owns the store, the render sink, logo uploads and the notifier.
//!
//! All mutation goes through the session, one event at a time. After every successful
//! change the complete configuration is synced to the render sink before the call returns,
//! so the preview never lags behind a finished edit.

use std::path::{Path, PathBuf};

use crate::config::{EngineOptions, QrConfiguration};
use crate::error::{SinkError, StoreError};
use crate::notify::{Notifier, Toast, TracingNotifier};
use crate::render::StyledEngine;
use crate::settings::StudioSettings;
use crate::sink::{RenderEngine, RenderSink, Surface};
use crate::store::{ConfigurationStore, FieldPath};
use crate::upload::{LogoUploads, UploadCompletion, UploadTicket};

/// One interaction with a form control. Text-valued controls carry their raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Content(String),
    Size(String),
    Margin(String),
    DotsColor(String),
    DotsShape(String),
    BackgroundColor(String),
    CornerSquareShape(String),
    CornerSquareColor(String),
    CornerDotShape(String),
    CornerDotColor(String),
    ErrorCorrectionLevel(String),
    ExportFormat(String),
    HideBackgroundDots(bool),
    LogoSelected(PathBuf),
    ClearLogo,
    Download,
}

impl InputEvent {
    /// The `(path, value)` pair a plain field control produces.
    pub fn field_update(&self) -> Option<(FieldPath, &str)> {
        let update = match self {
            InputEvent::Content(v) => (FieldPath::Content, v),
            InputEvent::Size(v) => (FieldPath::Dimensions, v),
            InputEvent::Margin(v) => (FieldPath::Margin, v),
            InputEvent::DotsColor(v) => (FieldPath::DotsColor, v),
            InputEvent::DotsShape(v) => (FieldPath::DotsShape, v),
            InputEvent::BackgroundColor(v) => (FieldPath::BackgroundColor, v),
            InputEvent::CornerSquareShape(v) => (FieldPath::CornerSquareShape, v),
            InputEvent::CornerSquareColor(v) => (FieldPath::CornerSquareColor, v),
            InputEvent::CornerDotShape(v) => (FieldPath::CornerDotShape, v),
            InputEvent::CornerDotColor(v) => (FieldPath::CornerDotColor, v),
            InputEvent::ErrorCorrectionLevel(v) => (FieldPath::ErrorCorrectionLevel, v),
            InputEvent::ExportFormat(v) => (FieldPath::ExportFormat, v),
            InputEvent::HideBackgroundDots(_)
            | InputEvent::LogoSelected(_)
            | InputEvent::ClearLogo
            | InputEvent::Download => return None,
        };
        Some((update.0, update.1.as_str()))
    }
}

/// Outcome of an export attempt.
#[derive(Debug)]
pub enum ExportOutcome {
    Saved(PathBuf),
    Failed(SinkError),
}

pub struct Session<E: RenderEngine, N: Notifier> {
    store: ConfigurationStore,
    sink: RenderSink<E>,
    uploads: LogoUploads,
    notifier: N,
}

impl Session<StyledEngine, TracingNotifier> {
    /// A session with the bundled engine, filesystem uploads and tracing toasts.
    pub fn from_settings(settings: &StudioSettings) -> Self {
        let store = ConfigurationStore::new(QrConfiguration::default(), settings.bounds);
        let engine = StyledEngine::new(
            EngineOptions::from(store.config()),
            settings.download_dir.clone(),
        );
        Session::new(store, engine, LogoUploads::default(), TracingNotifier)
    }
}

impl<E: RenderEngine, N: Notifier> Session<E, N> {
    /// `engine` must already carry the options of `store`'s initial configuration.
    pub fn new(store: ConfigurationStore, engine: E, uploads: LogoUploads, notifier: N) -> Self {
        Session {
            store,
            sink: RenderSink::new(engine),
            uploads,
            notifier,
        }
    }

    pub fn config(&self) -> &QrConfiguration {
        self.store.config()
    }

    pub fn store(&self) -> &ConfigurationStore {
        &self.store
    }

    pub fn sink(&self) -> &RenderSink<E> {
        &self.sink
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn pending_uploads(&self) -> usize {
        self.uploads.pending()
    }

    /// Binds the engine to the preview surface. Only the first call succeeds.
    pub fn attach(&mut self, surface: impl Surface + 'static) -> Result<(), SinkError> {
        self.sink.attach(surface)
    }

    /// Dispatches one control event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a control's text cannot be coerced; the configuration is
    /// left unchanged and nothing is rendered.
    pub fn handle(&mut self, event: InputEvent) -> Result<(), StoreError> {
        if let Some((path, raw)) = event.field_update() {
            return self.update(path, raw);
        }
        match event {
            InputEvent::HideBackgroundDots(hide) => self.set_hide_background_dots(hide),
            InputEvent::LogoSelected(path) => {
                self.select_logo_file(&path);
            }
            InputEvent::ClearLogo => self.clear_logo(),
            InputEvent::Download => {
                self.download();
            }
            _ => {}
        }
        Ok(())
    }

    pub fn update(&mut self, path: FieldPath, raw: &str) -> Result<(), StoreError> {
        self.store.update(path, raw)?;
        self.sync();
        Ok(())
    }

    pub fn set_logo(&mut self, data_uri: impl Into<String>) {
        self.store.set_logo(data_uri);
        self.sync();
    }

    pub fn clear_logo(&mut self) {
        self.store.clear_logo();
        self.sync();
    }

    pub fn set_hide_background_dots(&mut self, hide: bool) {
        self.store.set_hide_background_dots(hide);
        self.sync();
    }

    /// Records a file-picker selection and starts reading it, unless the same file is
    /// still selected (the picker reports no change in that case).
    pub fn select_logo_file(&mut self, path: &Path) -> Option<UploadTicket> {
        if !self.store.picker_mut().select(path) {
            tracing::debug!(path = %path.display(), "same logo file selected again, ignored");
            return None;
        }
        Some(self.uploads.begin(path))
    }

    /// Applies every upload that has completed so far, in completion order.
    pub fn pump(&mut self) -> usize {
        let done = self.uploads.try_completions();
        let count = done.len();
        for completion in done {
            self.apply_upload(completion);
        }
        count
    }

    /// Blocks for the next upload to complete and applies it. Returns `false` when no
    /// upload is pending.
    pub fn wait_for_upload(&mut self) -> bool {
        match self.uploads.wait_next() {
            Some(completion) => {
                self.apply_upload(completion);
                true
            }
            None => false,
        }
    }

    /// Blocks until every started upload has completed, applying each as it arrives.
    pub fn wait_for_uploads(&mut self) {
        while self.wait_for_upload() {}
    }

    /// Exports the current render in the selected format and reports the outcome as a toast.
    pub fn download(&mut self) -> ExportOutcome {
        let format = self.store.config().export_format;
        match self.sink.export(format) {
            Ok(path) => {
                self.notifier.notify(Toast::downloaded(format));
                ExportOutcome::Saved(path)
            }
            Err(err) => {
                tracing::warn!(error = %err, extension = format.extension(), "export failed");
                self.notifier.notify(Toast::download_failed());
                ExportOutcome::Failed(err)
            }
        }
    }

    fn apply_upload(&mut self, completion: UploadCompletion) {
        match completion.result {
            Ok(data_uri) => {
                tracing::debug!(ticket = completion.ticket.0, path = %completion.path.display(), "logo upload completed");
                self.set_logo(data_uri);
            }
            Err(err) => {
                tracing::warn!(ticket = completion.ticket.0, error = %err, "logo upload failed");
                self.notifier.notify(Toast::upload_failed());
            }
        }
    }

    fn sync(&mut self) {
        if let Err(err) = self.sink.sync(self.store.config()) {
            tracing::warn!(error = %err, revision = self.store.revision(), "render sync failed");
            self.notifier.notify(Toast::preview_failed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportFormat;
    use crate::notify::{ToastKind, ToastLog};
    use crate::sink::tests::RecordingEngine;
    use crate::upload::tests::{GatedSource, PanickingSource};
    use crate::upload::LogoSource;
    use std::time::{Duration, Instant};

    fn session_with(source: impl LogoSource) -> Session<RecordingEngine, ToastLog> {
        Session::new(
            ConfigurationStore::default(),
            RecordingEngine::default(),
            LogoUploads::new(source),
            ToastLog::new(),
        )
    }

    fn session() -> Session<RecordingEngine, ToastLog> {
        let (source, _) = GatedSource::new(&[]);
        session_with(source)
    }

    fn last_sync(session: &Session<RecordingEngine, ToastLog>) -> EngineOptions {
        session.sink().engine().updates.last().cloned().unwrap()
    }

    /// Polls `pump` until something is applied.
    fn pump_until_applied(session: &mut Session<RecordingEngine, ToastLog>) -> usize {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let applied = session.pump();
            if applied > 0 {
                return applied;
            }
            assert!(Instant::now() < deadline, "no upload completed in time");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_every_update_syncs_current_state() {
        let mut session = session();
        let events = [
            InputEvent::Content("https://example.com".to_string()),
            InputEvent::Size("512".to_string()),
            InputEvent::Margin("20".to_string()),
            InputEvent::DotsColor("#ff0000".to_string()),
            InputEvent::DotsShape("classy".to_string()),
            InputEvent::BackgroundColor("#eeeeee".to_string()),
            InputEvent::CornerSquareShape("extra-rounded".to_string()),
            InputEvent::CornerSquareColor("#00ff00".to_string()),
            InputEvent::CornerDotShape("dot".to_string()),
            InputEvent::CornerDotColor("#0000ff".to_string()),
            InputEvent::ErrorCorrectionLevel("H".to_string()),
            InputEvent::ExportFormat("svg".to_string()),
            InputEvent::HideBackgroundDots(false),
            InputEvent::ClearLogo,
        ];
        for (i, event) in events.into_iter().enumerate() {
            session.handle(event).unwrap();
            assert_eq!(session.sink().engine().updates.len(), i + 1);
            assert_eq!(last_sync(&session), EngineOptions::from(session.config()));
        }
    }

    #[test]
    fn test_invalid_input_does_not_sync() {
        let mut session = session();
        assert!(session.handle(InputEvent::Size("big".to_string())).is_err());
        assert!(session.sink().engine().updates.is_empty());
        assert_eq!(session.config(), &QrConfiguration::default());
    }

    #[test]
    fn test_download_exports_selected_format() {
        let mut session = session();
        session.handle(InputEvent::Content("https://example.com".to_string())).unwrap();
        session.handle(InputEvent::ExportFormat("svg".to_string())).unwrap();
        session.handle(InputEvent::Download).unwrap();

        assert_eq!(session.sink().engine().downloads, vec!["svg".to_string()]);
        assert_eq!(
            session.notifier().last(),
            Some(Toast::success("QR Code downloaded as SVG"))
        );
    }

    #[test]
    fn test_failed_download_shows_failure_toast() {
        let mut session = Session::new(
            ConfigurationStore::default(),
            RecordingEngine {
                fail_download: true,
                ..RecordingEngine::default()
            },
            LogoUploads::default(),
            ToastLog::new(),
        );
        assert!(matches!(session.download(), ExportOutcome::Failed(_)));

        let toasts = session.notifier().toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Failure);
        assert_eq!(toasts[0].message, "QR Code download failed");
        assert_eq!(session.config().export_format, ExportFormat::Png);
    }

    #[test]
    fn test_failed_sync_keeps_edit_and_notifies() {
        let mut session = session();
        session.set_logo("data:broken");

        assert_eq!(session.config().logo.data_uri, "data:broken");
        assert_eq!(session.notifier().last(), Some(Toast::preview_failed()));
    }

    #[test]
    fn test_reselecting_file_after_clear_uploads_again() {
        let mut session = session();
        let logo = Path::new("logo.png");

        assert!(session.select_logo_file(logo).is_some());
        session.wait_for_uploads();
        assert_eq!(session.config().logo.data_uri, "data:image/png;base64,logo.png");

        assert!(session.select_logo_file(logo).is_none());

        session.clear_logo();
        assert!(!session.config().logo.is_present());
        assert!(session.select_logo_file(logo).is_some());
        session.wait_for_uploads();
        assert_eq!(session.config().logo.data_uri, "data:image/png;base64,logo.png");
    }

    #[test]
    fn test_overlapping_uploads_last_completion_wins() {
        let (source, releases) = GatedSource::new(&["a.png", "b.png"]);
        let mut session = session_with(source);

        session.handle(InputEvent::LogoSelected(PathBuf::from("a.png"))).unwrap();
        session.handle(InputEvent::LogoSelected(PathBuf::from("b.png"))).unwrap();
        assert_eq!(session.pending_uploads(), 2);

        // B finishes first, then A: A was started first but completes last.
        releases["b.png"].send(()).unwrap();
        assert!(session.wait_for_upload());
        assert_eq!(session.config().logo.data_uri, "data:image/png;base64,b.png");

        releases["a.png"].send(()).unwrap();
        assert!(session.wait_for_upload());
        assert!(!session.wait_for_upload());

        assert_eq!(session.config().logo.data_uri, "data:image/png;base64,a.png");
        assert_eq!(last_sync(&session).image, "data:image/png;base64,a.png");
    }

    #[test]
    fn test_pump_applies_uploads_without_blocking() {
        let (source, releases) = GatedSource::new(&["a.png", "b.png"]);
        let mut session = session_with(source);

        session.handle(InputEvent::LogoSelected(PathBuf::from("a.png"))).unwrap();
        session.handle(InputEvent::LogoSelected(PathBuf::from("b.png"))).unwrap();
        assert_eq!(session.pump(), 0);
        assert!(!session.config().logo.is_present());

        releases["b.png"].send(()).unwrap();
        assert_eq!(pump_until_applied(&mut session), 1);
        assert_eq!(session.config().logo.data_uri, "data:image/png;base64,b.png");
        assert_eq!(session.pending_uploads(), 1);

        releases["a.png"].send(()).unwrap();
        assert_eq!(pump_until_applied(&mut session), 1);
        assert_eq!(session.config().logo.data_uri, "data:image/png;base64,a.png");
        assert_eq!(last_sync(&session).image, "data:image/png;base64,a.png");
        assert_eq!(session.pending_uploads(), 0);
        assert_eq!(session.pump(), 0);
    }

    #[test]
    fn test_panicking_upload_shows_failure_toast() {
        let mut session = session_with(PanickingSource);
        session.set_logo("data:image/png;base64,kept");

        session.handle(InputEvent::LogoSelected(PathBuf::from("broken.png"))).unwrap();
        session.wait_for_uploads();

        assert_eq!(session.pending_uploads(), 0);
        assert_eq!(session.config().logo.data_uri, "data:image/png;base64,kept");
        assert_eq!(session.notifier().last(), Some(Toast::upload_failed()));
    }
}
