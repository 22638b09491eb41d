//! The QR configuration schema and the rendering engine's option vocabulary.
//!
//! [`QrConfiguration`] is the only entity the configurator holds. It is always fully
//! populated; [`QrConfiguration::default`] supplies the session-start values.
//! [`EngineOptions`] is the same data spelled the way the rendering engine expects it,
//! minus the export format which is only consulted at download time.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// An `#rrggbb` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RgbHex(pub [u8; 3]);

impl RgbHex {
    pub const BLACK: RgbHex = RgbHex([0x00, 0x00, 0x00]);
    pub const WHITE: RgbHex = RgbHex([0xff, 0xff, 0xff]);

    pub fn rgb(self) -> [u8; 3] {
        self.0
    }
}

impl FromStr for RgbHex {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let mut rgb = [0u8; 3];
        for (i, channel) in rgb.iter_mut().enumerate() {
            *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(RgbHex(rgb))
    }
}

impl fmt::Display for RgbHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

impl Serialize for RgbHex {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RgbHex {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Declares a fieldless enum whose spellings are dictated by the rendering engine.
macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ConfigError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocabulary!(
    /// Shape of the data modules.
    DotShape, "dot shape" {
        Square => "square",
        Dots => "dots",
        Rounded => "rounded",
        ExtraRounded => "extra-rounded",
        Classy => "classy",
        ClassyRounded => "classy-rounded",
    }
);

vocabulary!(
    /// Shape of the outer ring of the three finder patterns.
    CornerSquareShape, "corner square shape" {
        Dot => "dot",
        Square => "square",
        ExtraRounded => "extra-rounded",
    }
);

vocabulary!(
    /// Shape of the 3x3 centre of the three finder patterns.
    CornerDotShape, "corner dot shape" {
        Dot => "dot",
        Square => "square",
    }
);

vocabulary!(
    /// QR error-correction level.
    ErrorCorrectionLevel, "error correction level" {
        L => "L",
        M => "M",
        Q => "Q",
        H => "H",
    }
);

vocabulary!(
    /// File format requested at download time.
    ExportFormat, "export format" {
        Png => "png",
        Jpeg => "jpeg",
        Svg => "svg",
    }
);

impl ErrorCorrectionLevel {
    pub fn ec_level(self) -> qrcode::EcLevel {
        match self {
            ErrorCorrectionLevel::L => qrcode::EcLevel::L,
            ErrorCorrectionLevel::M => qrcode::EcLevel::M,
            ErrorCorrectionLevel::Q => qrcode::EcLevel::Q,
            ErrorCorrectionLevel::H => qrcode::EcLevel::H,
        }
    }
}

impl ExportFormat {
    /// The file extension handed to the engine, e.g. `"svg"`.
    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn square(side: u32) -> Self {
        Dimensions {
            width: side,
            height: side,
        }
    }
}

/// Optional logo overlay. An empty `data_uri` means "no logo".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Logo {
    pub data_uri: String,
    /// Kept even while no logo is set, re-applied when one is added again.
    pub hide_background_dots: bool,
}

impl Logo {
    pub fn is_present(&self) -> bool {
        !self.data_uri.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotsStyle {
    pub color: RgbHex,
    pub shape: DotShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CornerSquareStyle {
    pub shape: CornerSquareShape,
    pub color: RgbHex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CornerDotStyle {
    pub shape: CornerDotShape,
    pub color: RgbHex,
}

/// Every visual and content parameter of the QR code being designed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrConfiguration {
    pub content: String,
    pub dimensions: Dimensions,
    pub margin: u32,
    pub logo: Logo,
    pub dots_style: DotsStyle,
    pub background_color: RgbHex,
    pub corner_square_style: CornerSquareStyle,
    pub corner_dot_style: CornerDotStyle,
    pub error_correction_level: ErrorCorrectionLevel,
    pub export_format: ExportFormat,
}

impl Default for QrConfiguration {
    fn default() -> Self {
        // Finder patterns follow the dots color until styled on their own.
        let dots_color = RgbHex([0x42, 0x67, 0xb2]);
        QrConfiguration {
            content: "https://lovable.dev".to_string(),
            dimensions: Dimensions::square(300),
            margin: 10,
            logo: Logo {
                data_uri: String::new(),
                hide_background_dots: true,
            },
            dots_style: DotsStyle {
                color: dots_color,
                shape: DotShape::Rounded,
            },
            background_color: RgbHex::WHITE,
            corner_square_style: CornerSquareStyle {
                shape: CornerSquareShape::Square,
                color: dots_color,
            },
            corner_dot_style: CornerDotStyle {
                shape: CornerDotShape::Square,
                color: dots_color,
            },
            error_correction_level: ErrorCorrectionLevel::Q,
            export_format: ExportFormat::Png,
        }
    }
}

/// Logo margin in pixels, fixed by the form.
pub const LOGO_MARGIN: u32 = 10;
/// Fraction of the code area a logo may cover.
pub const LOGO_SIZE_RATIO: f32 = 0.4;

/// The configuration as the rendering engine names it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOptions {
    pub width: u32,
    pub height: u32,
    pub data: String,
    pub margin: u32,
    pub image: String,
    pub qr_options: QrOptions,
    pub dots_options: DotsOptions,
    pub background_options: BackgroundOptions,
    pub corners_square_options: CornersSquareOptions,
    pub corners_dot_options: CornersDotOptions,
    pub image_options: ImageOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrOptions {
    pub error_correction_level: ErrorCorrectionLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotsOptions {
    pub color: RgbHex,
    #[serde(rename = "type")]
    pub kind: DotShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundOptions {
    pub color: RgbHex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornersSquareOptions {
    #[serde(rename = "type")]
    pub kind: CornerSquareShape,
    pub color: RgbHex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornersDotOptions {
    #[serde(rename = "type")]
    pub kind: CornerDotShape,
    pub color: RgbHex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOptions {
    pub hide_background_dots: bool,
    pub cross_origin: String,
    pub margin: u32,
    pub image_size: f32,
}

impl From<&QrConfiguration> for EngineOptions {
    fn from(config: &QrConfiguration) -> Self {
        EngineOptions {
            width: config.dimensions.width,
            height: config.dimensions.height,
            data: config.content.clone(),
            margin: config.margin,
            image: config.logo.data_uri.clone(),
            qr_options: QrOptions {
                error_correction_level: config.error_correction_level,
            },
            dots_options: DotsOptions {
                color: config.dots_style.color,
                kind: config.dots_style.shape,
            },
            background_options: BackgroundOptions {
                color: config.background_color,
            },
            corners_square_options: CornersSquareOptions {
                kind: config.corner_square_style.shape,
                color: config.corner_square_style.color,
            },
            corners_dot_options: CornersDotOptions {
                kind: config.corner_dot_style.shape,
                color: config.corner_dot_style.color,
            },
            image_options: ImageOptions {
                hide_background_dots: config.logo.hide_background_dots,
                cross_origin: "anonymous".to_string(),
                margin: LOGO_MARGIN,
                image_size: LOGO_SIZE_RATIO,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_hex_parse_and_display() {
        let color: RgbHex = "#4267B2".parse().unwrap();
        assert_eq!(color, RgbHex([0x42, 0x67, 0xb2]));
        assert_eq!(color.to_string(), "#4267b2");

        assert!("4267b2".parse::<RgbHex>().is_err());
        assert!("#4267b".parse::<RgbHex>().is_err());
        assert!("#zz67b2".parse::<RgbHex>().is_err());
    }

    #[test]
    fn test_shape_spellings_match_engine() {
        assert_eq!("extra-rounded".parse::<DotShape>().unwrap(), DotShape::ExtraRounded);
        assert_eq!("classy-rounded".parse::<DotShape>().unwrap(), DotShape::ClassyRounded);
        assert_eq!(CornerSquareShape::ExtraRounded.to_string(), "extra-rounded");
        assert!("Rounded".parse::<DotShape>().is_err());
        assert_eq!(DotShape::ALL.len(), 6);
    }

    #[test]
    fn test_engine_options_vocabulary() {
        let options = EngineOptions::from(&QrConfiguration::default());
        let json = serde_json::to_value(&options).unwrap();

        assert_eq!(json["width"], 300);
        assert_eq!(json["height"], 300);
        assert_eq!(json["data"], "https://lovable.dev");
        assert_eq!(json["image"], "");
        assert_eq!(json["dotsOptions"]["type"], "rounded");
        assert_eq!(json["dotsOptions"]["color"], "#4267b2");
        assert_eq!(json["backgroundOptions"]["color"], "#ffffff");
        assert_eq!(json["cornersSquareOptions"]["type"], "square");
        assert_eq!(json["cornersSquareOptions"]["color"], "#4267b2");
        assert_eq!(json["cornersDotOptions"]["color"], "#4267b2");
        assert_eq!(json["cornersDotOptions"]["type"], "square");
        assert_eq!(json["qrOptions"]["errorCorrectionLevel"], "Q");
        assert_eq!(json["imageOptions"]["hideBackgroundDots"], true);
        assert_eq!(json["imageOptions"]["crossOrigin"], "anonymous");
        assert!(json.get("exportFormat").is_none());
    }
}
