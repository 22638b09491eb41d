//! The render sink: one long-lived rendering engine kept consistent with the store.
//!
//! The engine is created once with the initial options and only ever updated afterwards.
//! Every [`RenderSink::sync`] resubmits the complete configuration; no diffing happens here.
//! Engine failures are passed through unmodified.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use image::RgbaImage;

use crate::config::{EngineOptions, ExportFormat, QrConfiguration};
use crate::error::{EngineError, SinkError};

/// A display surface the engine draws its preview into.
pub trait Surface {
    fn present(&mut self, frame: &RgbaImage);
}

/// The operations this crate needs from a QR rendering engine.
pub trait RenderEngine {
    /// Binds the engine's output to `surface` and draws the current state into it.
    fn append(&mut self, surface: Box<dyn Surface>) -> Result<(), EngineError>;

    /// Replaces the engine's options and re-renders.
    fn update(&mut self, options: &EngineOptions) -> Result<(), EngineError>;

    /// Serializes the current render as `format` and returns where the file was written.
    fn download(&mut self, format: ExportFormat) -> Result<PathBuf, EngineError>;
}

#[derive(Debug, Default)]
struct PreviewState {
    frame: Option<RgbaImage>,
    presented: usize,
}

/// In-memory surface. Clones share the same frame, so a handle can be kept for inspection
/// after the surface itself has been handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct PreviewSurface {
    state: Rc<RefCell<PreviewState>>,
}

impl PreviewSurface {
    pub fn new() -> Self {
        PreviewSurface::default()
    }

    /// The most recently presented frame.
    pub fn frame(&self) -> Option<RgbaImage> {
        self.state.borrow().frame.clone()
    }

    /// How many frames have been presented so far.
    pub fn presented(&self) -> usize {
        self.state.borrow().presented
    }
}

impl Surface for PreviewSurface {
    fn present(&mut self, frame: &RgbaImage) {
        let mut state = self.state.borrow_mut();
        state.frame = Some(frame.clone());
        state.presented += 1;
    }
}

/// Owns the engine instance and the single attachment to a display surface.
pub struct RenderSink<E: RenderEngine> {
    engine: E,
    attached: bool,
    last_synced: Option<EngineOptions>,
}

impl<E: RenderEngine> RenderSink<E> {
    /// Wraps an engine that was constructed with the session's initial options.
    pub fn new(engine: E) -> Self {
        RenderSink {
            engine,
            attached: false,
            last_synced: None,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// The options passed to the engine by the last successful [`sync`](Self::sync).
    pub fn last_synced(&self) -> Option<&EngineOptions> {
        self.last_synced.as_ref()
    }

    /// Binds the engine to `surface`. Only the first call succeeds.
    pub fn attach(&mut self, surface: impl Surface + 'static) -> Result<(), SinkError> {
        if self.attached {
            return Err(SinkError::AlreadyAttached);
        }
        self.engine.append(Box::new(surface))?;
        self.attached = true;
        tracing::debug!("render sink attached");
        Ok(())
    }

    /// Pushes the complete configuration to the engine.
    pub fn sync(&mut self, config: &QrConfiguration) -> Result<(), SinkError> {
        let options = EngineOptions::from(config);
        self.engine.update(&options)?;
        tracing::debug!(data_len = options.data.len(), width = options.width, "render sink synced");
        self.last_synced = Some(options);
        Ok(())
    }

    /// Asks the engine to serialize its current render as `format`.
    pub fn export(&mut self, format: ExportFormat) -> Result<PathBuf, SinkError> {
        let path = self.engine.download(format)?;
        tracing::info!(extension = format.extension(), path = %path.display(), "render exported");
        Ok(path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Engine double that records every call it receives.
    #[derive(Default)]
    pub(crate) struct RecordingEngine {
        pub appended: usize,
        pub updates: Vec<EngineOptions>,
        pub downloads: Vec<String>,
        pub fail_download: bool,
    }

    impl RenderEngine for RecordingEngine {
        fn append(&mut self, mut surface: Box<dyn Surface>) -> Result<(), EngineError> {
            self.appended += 1;
            surface.present(&RgbaImage::new(1, 1));
            Ok(())
        }

        fn update(&mut self, options: &EngineOptions) -> Result<(), EngineError> {
            if options.image == "data:broken" {
                return Err(EngineError::MalformedDataUri(options.image.clone()));
            }
            self.updates.push(options.clone());
            Ok(())
        }

        fn download(&mut self, format: ExportFormat) -> Result<PathBuf, EngineError> {
            if self.fail_download {
                return Err(EngineError::Io(std::io::Error::other("disk full")));
            }
            self.downloads.push(format.extension().to_string());
            Ok(PathBuf::from(format!("qr.{}", format.extension())))
        }
    }

    #[test]
    fn test_attach_only_once() {
        let mut sink = RenderSink::new(RecordingEngine::default());
        let surface = PreviewSurface::new();

        sink.attach(surface.clone()).unwrap();
        assert!(matches!(sink.attach(PreviewSurface::new()), Err(SinkError::AlreadyAttached)));
        assert_eq!(sink.engine().appended, 1);
        assert_eq!(surface.presented(), 1);
    }

    #[test]
    fn test_sync_submits_full_configuration() {
        let mut sink = RenderSink::new(RecordingEngine::default());
        let mut config = QrConfiguration::default();
        config.content = "https://example.com".to_string();

        sink.sync(&config).unwrap();
        sink.sync(&config).unwrap();

        let expected = EngineOptions::from(&config);
        assert_eq!(sink.engine().updates, vec![expected.clone(), expected.clone()]);
        assert_eq!(sink.last_synced(), Some(&expected));
    }

    #[test]
    fn test_export_passes_format_through() {
        let mut sink = RenderSink::new(RecordingEngine::default());
        let mut config = QrConfiguration::default();
        config.content = "https://example.com".to_string();
        config.export_format = ExportFormat::Svg;

        sink.sync(&config).unwrap();
        let path = sink.export(config.export_format).unwrap();

        assert_eq!(sink.engine().downloads, vec!["svg".to_string()]);
        assert_eq!(path, PathBuf::from("qr.svg"));
    }

    #[test]
    fn test_engine_errors_propagate_unmodified() {
        let mut sink = RenderSink::new(RecordingEngine::default());
        let mut config = QrConfiguration::default();
        config.logo.data_uri = "data:broken".to_string();

        let err = sink.sync(&config).unwrap_err();
        assert!(matches!(err, SinkError::Engine(EngineError::MalformedDataUri(ref uri)) if uri == "data:broken"));
        assert_eq!(sink.last_synced(), None);
    }
}
