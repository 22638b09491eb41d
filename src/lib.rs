//! # qrstyle
//!
//! A configurator for styled QR codes: a configuration store kept in sync with a
//! rendering engine that previews the code and exports it as PNG, JPEG or SVG.
//!
//! The session holds one [`QrConfiguration`](config::QrConfiguration), always fully populated.
//! Form controls produce `(path, value)` updates; each one replaces a single field and is
//! immediately followed by a full re-render. Encoding is delegated to the `qrcode` crate,
//! drawing to `image`.
//!
//! ## Features
//!
//! - Dot shapes: square, dots, rounded, extra-rounded, classy, classy-rounded.
//! - Corner square (dot, square, extra-rounded) and corner dot (dot, square) styles and colors.
//! - Background color, size, margin and error correction level (L, M, Q, H).
//! - Logo overlay from an uploaded image, optionally clearing the dots behind it.
//! - Download as PNG, JPEG or SVG with a success or failure toast.
//!
//! ## Example
//!
//! ```rust,no_run
//! use qrstyle::logging::init_logging;
//! use qrstyle::session::{InputEvent, Session};
//! use qrstyle::settings::StudioSettings;
//! use qrstyle::sink::PreviewSurface;
//!
//! let settings = StudioSettings::default();
//! init_logging(&settings.logging);
//!
//! let mut session = Session::from_settings(&settings);
//! session.attach(PreviewSurface::new()).unwrap();
//!
//! session.handle(InputEvent::Content("https://example.com".into())).unwrap();
//! session.handle(InputEvent::DotsShape("classy-rounded".into())).unwrap();
//! session.handle(InputEvent::ExportFormat("svg".into())).unwrap();
//! session.handle(InputEvent::Download).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`config`]: the configuration schema and the engine's option vocabulary.
//! - [`store`]: the configuration store and field paths.
//! - [`sink`]: the render sink adapter and the engine/surface traits.
//! - [`render`]: the bundled styled rendering engine.
//! - [`session`]: the top-level view wiring controls, store, sink, uploads and toasts.
//! - [`settings`] and [`logging`]: session settings and `tracing` subscriber setup.

pub mod config;
pub mod error;
pub mod helper;
pub mod logging;
pub mod notify;
pub mod render;
pub mod session;
pub mod settings;
pub mod sink;
pub mod store;
pub mod upload;
