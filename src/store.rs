//! The configuration store: holds the current [`QrConfiguration`] and applies partial updates.
//!
//! Form controls hand over raw text; [`ConfigurationStore::update`] coerces it to the type of
//! the addressed field and replaces that field only. The store never renders; the owner of
//! the store is expected to sync the render sink after each successful mutation.

use core::fmt;
use core::str::FromStr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::QrConfiguration;
use crate::error::StoreError;

/// Address of a single editable field, spelled as a dotted path (e.g. `dotsStyle.color`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
    Content,
    /// Width and height together; the size control keeps the code square.
    Dimensions,
    Width,
    Height,
    Margin,
    LogoDataUri,
    HideBackgroundDots,
    DotsColor,
    DotsShape,
    BackgroundColor,
    CornerSquareShape,
    CornerSquareColor,
    CornerDotShape,
    CornerDotColor,
    ErrorCorrectionLevel,
    ExportFormat,
}

impl FieldPath {
    pub const ALL: &'static [FieldPath] = &[
        FieldPath::Content,
        FieldPath::Dimensions,
        FieldPath::Width,
        FieldPath::Height,
        FieldPath::Margin,
        FieldPath::LogoDataUri,
        FieldPath::HideBackgroundDots,
        FieldPath::DotsColor,
        FieldPath::DotsShape,
        FieldPath::BackgroundColor,
        FieldPath::CornerSquareShape,
        FieldPath::CornerSquareColor,
        FieldPath::CornerDotShape,
        FieldPath::CornerDotColor,
        FieldPath::ErrorCorrectionLevel,
        FieldPath::ExportFormat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldPath::Content => "content",
            FieldPath::Dimensions => "dimensions",
            FieldPath::Width => "dimensions.width",
            FieldPath::Height => "dimensions.height",
            FieldPath::Margin => "margin",
            FieldPath::LogoDataUri => "logo.dataUri",
            FieldPath::HideBackgroundDots => "logo.hideBackgroundDots",
            FieldPath::DotsColor => "dotsStyle.color",
            FieldPath::DotsShape => "dotsStyle.shape",
            FieldPath::BackgroundColor => "backgroundColor",
            FieldPath::CornerSquareShape => "cornerSquareStyle.shape",
            FieldPath::CornerSquareColor => "cornerSquareStyle.color",
            FieldPath::CornerDotShape => "cornerDotStyle.shape",
            FieldPath::CornerDotColor => "cornerDotStyle.color",
            FieldPath::ErrorCorrectionLevel => "errorCorrectionLevel",
            FieldPath::ExportFormat => "exportFormat",
        }
    }
}

impl FromStr for FieldPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::ALL
            .iter()
            .copied()
            .find(|path| path.as_str() == s)
            .ok_or_else(|| StoreError::UnknownPath(s.to_string()))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted range for the numeric controls. Values outside are clamped, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBounds {
    pub min_size: u32,
    pub max_size: u32,
    pub min_margin: u32,
    pub max_margin: u32,
}

impl Default for InputBounds {
    fn default() -> Self {
        InputBounds {
            min_size: 100,
            max_size: 2000,
            min_margin: 0,
            max_margin: 100,
        }
    }
}

/// Selection state of the logo file input.
///
/// A file input only reports a change when the chosen file differs from the current one,
/// so picking the same file twice in a row is silent until the picker is reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoPicker {
    selected: Option<PathBuf>,
}

impl LogoPicker {
    /// Records a selection, returning `true` when it counts as a change.
    pub fn select(&mut self, path: &Path) -> bool {
        if self.selected.as_deref() == Some(path) {
            return false;
        }
        self.selected = Some(path.to_path_buf());
        true
    }

    pub fn reset(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }
}

/// Holds the session's configuration. Created once with defaults, mutated in place.
#[derive(Debug, Clone)]
pub struct ConfigurationStore {
    config: QrConfiguration,
    bounds: InputBounds,
    picker: LogoPicker,
    revision: u64,
}

impl Default for ConfigurationStore {
    fn default() -> Self {
        ConfigurationStore::new(QrConfiguration::default(), InputBounds::default())
    }
}

impl ConfigurationStore {
    pub fn new(config: QrConfiguration, bounds: InputBounds) -> Self {
        ConfigurationStore {
            config,
            bounds,
            picker: LogoPicker::default(),
            revision: 0,
        }
    }

    pub fn config(&self) -> &QrConfiguration {
        &self.config
    }

    pub fn bounds(&self) -> InputBounds {
        self.bounds
    }

    pub fn picker(&self) -> &LogoPicker {
        &self.picker
    }

    pub fn picker_mut(&mut self) -> &mut LogoPicker {
        &mut self.picker
    }

    /// Number of successful mutations since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the field at `path` with `raw`, coerced to the field's type.
    ///
    /// Only the addressed field changes. On a coercion error nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when `raw` is not a number, boolean, color or enum value
    /// (whichever the field needs).
    ///
    /// # Example
    ///
    /// ```rust
    /// use qrstyle::store::{ConfigurationStore, FieldPath};
    ///
    /// let mut store = ConfigurationStore::default();
    /// store.update(FieldPath::DotsColor, "#ff0000").unwrap();
    /// assert_eq!(store.config().dots_style.color.to_string(), "#ff0000");
    /// ```
    pub fn update(&mut self, path: FieldPath, raw: &str) -> Result<(), StoreError> {
        let bounds = self.bounds;
        let config = &mut self.config;
        match path {
            FieldPath::Content => config.content = raw.to_string(),
            FieldPath::Dimensions => {
                let side = parse_clamped(path, raw, bounds.min_size, bounds.max_size)?;
                config.dimensions.width = side;
                config.dimensions.height = side;
            }
            FieldPath::Width => {
                config.dimensions.width = parse_clamped(path, raw, bounds.min_size, bounds.max_size)?
            }
            FieldPath::Height => {
                config.dimensions.height = parse_clamped(path, raw, bounds.min_size, bounds.max_size)?
            }
            FieldPath::Margin => {
                config.margin = parse_clamped(path, raw, bounds.min_margin, bounds.max_margin)?
            }
            FieldPath::LogoDataUri => config.logo.data_uri = raw.to_string(),
            FieldPath::HideBackgroundDots => config.logo.hide_background_dots = parse_bool(path, raw)?,
            FieldPath::DotsColor => config.dots_style.color = raw.parse()?,
            FieldPath::DotsShape => config.dots_style.shape = raw.parse()?,
            FieldPath::BackgroundColor => config.background_color = raw.parse()?,
            FieldPath::CornerSquareShape => config.corner_square_style.shape = raw.parse()?,
            FieldPath::CornerSquareColor => config.corner_square_style.color = raw.parse()?,
            FieldPath::CornerDotShape => config.corner_dot_style.shape = raw.parse()?,
            FieldPath::CornerDotColor => config.corner_dot_style.color = raw.parse()?,
            FieldPath::ErrorCorrectionLevel => config.error_correction_level = raw.parse()?,
            FieldPath::ExportFormat => config.export_format = raw.parse()?,
        }
        self.touch(path);
        Ok(())
    }

    /// Sets the logo image. `hide_background_dots` is left alone.
    pub fn set_logo(&mut self, data_uri: impl Into<String>) {
        self.config.logo.data_uri = data_uri.into();
        self.touch(FieldPath::LogoDataUri);
    }

    /// Removes the logo and resets the file picker so the same file can be chosen again.
    pub fn clear_logo(&mut self) {
        self.config.logo.data_uri.clear();
        self.picker.reset();
        self.touch(FieldPath::LogoDataUri);
    }

    /// Toggles dot hiding under the logo. The logo itself is left alone.
    pub fn set_hide_background_dots(&mut self, hide: bool) {
        self.config.logo.hide_background_dots = hide;
        self.touch(FieldPath::HideBackgroundDots);
    }

    fn touch(&mut self, path: FieldPath) {
        self.revision += 1;
        tracing::debug!(field = %path, revision = self.revision, "configuration updated");
    }
}

fn parse_clamped(path: FieldPath, raw: &str, min: u32, max: u32) -> Result<u32, StoreError> {
    let not_a_number = || StoreError::NotANumber {
        path: path.as_str(),
        value: raw.to_string(),
    };
    let value: f64 = raw.trim().parse().map_err(|_| not_a_number())?;
    if !value.is_finite() {
        return Err(not_a_number());
    }
    let clamped = value.trunc().clamp(f64::from(min), f64::from(max));
    if clamped != value.trunc() {
        tracing::debug!(field = %path, raw, clamped, "numeric input clamped");
    }
    Ok(clamped as u32)
}

fn parse_bool(path: FieldPath, raw: &str) -> Result<bool, StoreError> {
    match raw.trim() {
        "true" | "on" => Ok(true),
        "false" | "off" => Ok(false),
        _ => Err(StoreError::NotABoolean {
            path: path.as_str(),
            value: raw.to_string(),
        }),
    }
}
