//! The bundled rendering engine.
//!
//! [`StyledEngine`] encodes the data with the `qrcode` crate and draws a styled symbol:
//! shaped data modules, custom finder patterns ("corner squares" and "corner dots"),
//! a background color, and an optional logo in the middle. Raster output backs the preview
//! surface and PNG/JPEG downloads, SVG downloads are produced as text.

use std::fmt::Write as _;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use qrcode::{Color, QrCode};

use crate::config::{CornerDotShape, CornerSquareShape, DotShape, EngineOptions, ExportFormat, RgbHex};
use crate::error::EngineError;
use crate::helper::{decode_data_uri, save_download, xml_escape};
use crate::sink::{RenderEngine, Surface};

/// Side of a finder pattern, in modules.
const FINDER: u32 = 7;

/// Which corners of a module are rounded: top-left, top-right, bottom-right, bottom-left.
type Corners = [bool; 4];

/// Occupancy of the four orthogonal neighbours of a module.
#[derive(Debug, Clone, Copy, Default)]
struct Neighbours {
    left: bool,
    right: bool,
    top: bool,
    bottom: bool,
}

fn rounded_corners(shape: DotShape, n: Neighbours) -> Corners {
    let both = |a: bool, b: bool| !a && !b;
    let either = |a: bool, b: bool| !a || !b;
    match shape {
        DotShape::Square => [false; 4],
        DotShape::Dots => [true; 4],
        DotShape::Rounded => [
            both(n.top, n.left),
            both(n.top, n.right),
            both(n.bottom, n.right),
            both(n.bottom, n.left),
        ],
        DotShape::ExtraRounded => [
            either(n.top, n.left),
            either(n.top, n.right),
            either(n.bottom, n.right),
            either(n.bottom, n.left),
        ],
        DotShape::Classy => [both(n.top, n.left), false, both(n.bottom, n.right), false],
        DotShape::ClassyRounded => [either(n.top, n.left), false, either(n.bottom, n.right), false],
    }
}

/// Whether the point `(u, v)` of a unit module is painted, given its rounded corners.
fn module_covers(corners: Corners, u: f32, v: f32) -> bool {
    let quadrant = match (u < 0.5, v < 0.5) {
        (true, true) => 0,
        (false, true) => 1,
        (false, false) => 2,
        (true, false) => 3,
    };
    if !corners[quadrant] {
        return true;
    }
    let (du, dv) = (u - 0.5, v - 0.5);
    du * du + dv * dv <= 0.25
}

/// Rounded rectangle centred on the origin, `half` wide each way, corner radius `radius`.
fn rounded_rect_contains(dx: f32, dy: f32, half: f32, radius: f32) -> bool {
    let (ax, ay) = (dx.abs(), dy.abs());
    if ax > half || ay > half {
        return false;
    }
    let qx = ax - (half - radius);
    let qy = ay - (half - radius);
    if qx <= 0.0 || qy <= 0.0 {
        return true;
    }
    qx * qx + qy * qy <= radius * radius
}

/// Outer and inner corner radius of the finder ring, in modules.
fn corner_square_radii(shape: CornerSquareShape) -> (f32, f32) {
    match shape {
        CornerSquareShape::Square => (0.0, 0.0),
        CornerSquareShape::Dot => (3.5, 2.5),
        CornerSquareShape::ExtraRounded => (2.5, 1.5),
    }
}

fn corner_dot_radius(shape: CornerDotShape) -> f32 {
    match shape {
        CornerDotShape::Square => 0.0,
        CornerDotShape::Dot => 1.5,
    }
}

fn rgba(color: RgbHex) -> Rgba<u8> {
    let [r, g, b] = color.rgb();
    Rgba([r, g, b, 255])
}

/// A decoded logo, scaled and positioned on the canvas.
struct LogoPlacement {
    image: RgbaImage,
    x: u32,
    y: u32,
    /// Module rectangle left free when background dots are hidden: col, row, cols, rows.
    hidden: (u32, u32, u32, u32),
}

/// Geometry of one render.
struct Layout {
    code: QrCode,
    count: u32,
    dot: u32,
    x0: u32,
    y0: u32,
    logo: Option<LogoPlacement>,
    hide_dots: bool,
}

impl Layout {
    fn new(options: &EngineOptions) -> Result<Layout, EngineError> {
        let code = QrCode::with_error_correction_level(
            options.data.as_bytes(),
            options.qr_options.error_correction_level.ec_level(),
        )?;
        let count = code.width() as u32;
        let drawable = options
            .width
            .min(options.height)
            .saturating_sub(2 * options.margin);
        let dot = drawable / count;
        if dot == 0 {
            return Err(EngineError::CanvasTooSmall {
                width: options.width,
                height: options.height,
                margin: options.margin,
                modules: count,
            });
        }
        let x0 = (options.width - count * dot) / 2;
        let y0 = (options.height - count * dot) / 2;

        let mut layout = Layout {
            code,
            count,
            dot,
            x0,
            y0,
            logo: None,
            hide_dots: options.image_options.hide_background_dots,
        };
        if !options.image.is_empty() {
            layout.logo = layout.place_logo(options)?;
        }
        Ok(layout)
    }

    fn place_logo(&self, options: &EngineOptions) -> Result<Option<LogoPlacement>, EngineError> {
        let bytes = decode_data_uri(&options.image)?;
        let decoded = image::load_from_memory(&bytes)?.to_rgba8();

        let mut box_modules = ((self.count as f32) * options.image_options.image_size) as u32;
        if box_modules % 2 == 0 {
            box_modules = box_modules.saturating_sub(1);
        }
        let margin = options.image_options.margin;
        let inner = (box_modules * self.dot).saturating_sub(2 * margin);
        if inner == 0 || decoded.width() == 0 || decoded.height() == 0 {
            return Ok(None);
        }

        let scale = (inner as f32 / decoded.width() as f32).min(inner as f32 / decoded.height() as f32);
        let width = ((decoded.width() as f32 * scale) as u32).max(1);
        let height = ((decoded.height() as f32 * scale) as u32).max(1);
        let image = imageops::resize(&decoded, width, height, FilterType::Lanczos3);

        let span = |px: u32| {
            let modules = (px + 2 * margin).div_ceil(self.dot).min(box_modules);
            if modules % 2 == 0 {
                modules + 1
            } else {
                modules
            }
        };
        let (cols, rows) = (span(width), span(height));
        let side = self.count * self.dot;
        Ok(Some(LogoPlacement {
            image,
            x: self.x0 + (side - width) / 2,
            y: self.y0 + (side - height) / 2,
            hidden: ((self.count - cols) / 2, (self.count - rows) / 2, cols, rows),
        }))
    }

    fn in_finder(&self, col: u32, row: u32) -> bool {
        let far = self.count - FINDER;
        (col < FINDER && row < FINDER) || (col >= far && row < FINDER) || (col < FINDER && row >= far)
    }

    fn is_hidden(&self, col: u32, row: u32) -> bool {
        match &self.logo {
            Some(logo) if self.hide_dots => {
                let (c, r, cols, rows) = logo.hidden;
                col >= c && col < c + cols && row >= r && row < r + rows
            }
            _ => false,
        }
    }

    /// Whether a data module is drawn as a dot.
    fn is_dot(&self, col: i64, row: i64) -> bool {
        if col < 0 || row < 0 || col >= self.count as i64 || row >= self.count as i64 {
            return false;
        }
        let (col, row) = (col as u32, row as u32);
        self.code[(col as usize, row as usize)] == Color::Dark
            && !self.in_finder(col, row)
            && !self.is_hidden(col, row)
    }

    fn neighbours(&self, col: u32, row: u32) -> Neighbours {
        let (c, r) = (col as i64, row as i64);
        Neighbours {
            left: self.is_dot(c - 1, r),
            right: self.is_dot(c + 1, r),
            top: self.is_dot(c, r - 1),
            bottom: self.is_dot(c, r + 1),
        }
    }

    fn finder_origins(&self) -> [(u32, u32); 3] {
        let far = self.count - FINDER;
        [(0, 0), (far, 0), (0, far)]
    }
}

/// The engine: owns its current options, an optional display surface, and a download directory.
pub struct StyledEngine {
    options: EngineOptions,
    surface: Option<Box<dyn Surface>>,
    download_dir: PathBuf,
}

impl StyledEngine {
    /// Creates the engine with its initial options. Nothing is rendered until it is
    /// appended to a surface, updated, or asked for a download.
    pub fn new(options: EngineOptions, download_dir: impl Into<PathBuf>) -> Self {
        StyledEngine {
            options,
            surface: None,
            download_dir: download_dir.into(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Rasterizes the current options.
    pub fn render_image(&self) -> Result<RgbaImage, EngineError> {
        let options = &self.options;
        let layout = Layout::new(options)?;
        let mut img = RgbaImage::from_pixel(
            options.width,
            options.height,
            rgba(options.background_options.color),
        );

        let dot = layout.dot;
        let dot_color = rgba(options.dots_options.color);
        for row in 0..layout.count {
            for col in 0..layout.count {
                if !layout.is_dot(col as i64, row as i64) {
                    continue;
                }
                let corners = rounded_corners(options.dots_options.kind, layout.neighbours(col, row));
                let (mx, my) = (layout.x0 + col * dot, layout.y0 + row * dot);
                for py in 0..dot {
                    for px in 0..dot {
                        let u = (px as f32 + 0.5) / dot as f32;
                        let v = (py as f32 + 0.5) / dot as f32;
                        if module_covers(corners, u, v) {
                            img.put_pixel(mx + px, my + py, dot_color);
                        }
                    }
                }
            }
        }

        let (outer_r, inner_r) = corner_square_radii(options.corners_square_options.kind);
        let centre_r = corner_dot_radius(options.corners_dot_options.kind);
        let square_color = rgba(options.corners_square_options.color);
        let centre_color = rgba(options.corners_dot_options.color);
        let side = FINDER * dot;
        for (fc, fr) in layout.finder_origins() {
            let (fx, fy) = (layout.x0 + fc * dot, layout.y0 + fr * dot);
            for py in 0..side {
                for px in 0..side {
                    let dx = (px as f32 + 0.5) / dot as f32 - 3.5;
                    let dy = (py as f32 + 0.5) / dot as f32 - 3.5;
                    if rounded_rect_contains(dx, dy, 1.5, centre_r) {
                        img.put_pixel(fx + px, fy + py, centre_color);
                    } else if rounded_rect_contains(dx, dy, 3.5, outer_r)
                        && !rounded_rect_contains(dx, dy, 2.5, inner_r)
                    {
                        img.put_pixel(fx + px, fy + py, square_color);
                    }
                }
            }
        }

        if let Some(logo) = &layout.logo {
            imageops::overlay(&mut img, &logo.image, logo.x as i64, logo.y as i64);
        }
        Ok(img)
    }

    /// Renders the current options as an SVG document.
    pub fn render_svg(&self) -> Result<String, EngineError> {
        let options = &self.options;
        let layout = Layout::new(options)?;
        let dot = layout.dot as f32;

        let mut result = String::new();
        result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
        let _ = writeln!(
            result,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{0}\" height=\"{1}\" viewBox=\"0 0 {0} {1}\">",
            options.width, options.height
        );
        let _ = writeln!(
            result,
            "\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            options.background_options.color
        );

        result += "\t<path d=\"";
        for row in 0..layout.count {
            for col in 0..layout.count {
                if !layout.is_dot(col as i64, row as i64) {
                    continue;
                }
                let corners = rounded_corners(options.dots_options.kind, layout.neighbours(col, row));
                let x = (layout.x0 + col * layout.dot) as f32;
                let y = (layout.y0 + row * layout.dot) as f32;
                let radii = corners.map(|rounded| if rounded { dot / 2.0 } else { 0.0 });
                push_rounded_rect(&mut result, x, y, dot, radii);
            }
        }
        let _ = writeln!(result, "\" fill=\"{}\"/>", options.dots_options.color);

        let (outer_r, inner_r) = corner_square_radii(options.corners_square_options.kind);
        let centre_r = corner_dot_radius(options.corners_dot_options.kind);
        for (fc, fr) in layout.finder_origins() {
            let x = (layout.x0 + fc * layout.dot) as f32;
            let y = (layout.y0 + fr * layout.dot) as f32;

            result += "\t<path fill-rule=\"evenodd\" d=\"";
            push_rounded_rect(&mut result, x, y, 7.0 * dot, [outer_r * dot; 4]);
            push_rounded_rect(&mut result, x + dot, y + dot, 5.0 * dot, [inner_r * dot; 4]);
            let _ = writeln!(result, "\" fill=\"{}\"/>", options.corners_square_options.color);

            result += "\t<path d=\"";
            push_rounded_rect(&mut result, x + 2.0 * dot, y + 2.0 * dot, 3.0 * dot, [centre_r * dot; 4]);
            let _ = writeln!(result, "\" fill=\"{}\"/>", options.corners_dot_options.color);
        }

        if let Some(logo) = &layout.logo {
            let _ = writeln!(
                result,
                "\t<image href=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"/>",
                xml_escape(&options.image),
                logo.x,
                logo.y,
                logo.image.width(),
                logo.image.height()
            );
        }
        result += "</svg>\n";
        Ok(result)
    }

    fn encode(&self, format: ExportFormat) -> Result<Vec<u8>, EngineError> {
        if format == ExportFormat::Svg {
            return Ok(self.render_svg()?.into_bytes());
        }
        let img = DynamicImage::ImageRgba8(self.render_image()?);
        let mut buffer = Cursor::new(Vec::new());
        match format {
            ExportFormat::Png => img.write_to(&mut buffer, ImageFormat::Png)?,
            _ => DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut buffer, ImageFormat::Jpeg)?,
        }
        Ok(buffer.into_inner())
    }

    fn redraw(&mut self) -> Result<(), EngineError> {
        let frame = self.render_image()?;
        if let Some(surface) = self.surface.as_mut() {
            surface.present(&frame);
        }
        Ok(())
    }
}

impl RenderEngine for StyledEngine {
    fn append(&mut self, surface: Box<dyn Surface>) -> Result<(), EngineError> {
        self.surface = Some(surface);
        self.redraw()
    }

    fn update(&mut self, options: &EngineOptions) -> Result<(), EngineError> {
        self.options = options.clone();
        self.redraw()
    }

    fn download(&mut self, format: ExportFormat) -> Result<PathBuf, EngineError> {
        let bytes = self.encode(format)?;
        Ok(save_download(&bytes, &self.download_dir, format)?)
    }
}

/// Appends a closed square path at `(x, y)` with per-corner radii (TL, TR, BR, BL).
fn push_rounded_rect(out: &mut String, x: f32, y: f32, side: f32, r: [f32; 4]) {
    let [tl, tr, br, bl] = r;
    let _ = write!(out, "M{},{}H{}", x + tl, y, x + side - tr);
    if tr > 0.0 {
        let _ = write!(out, "A{0},{0} 0 0 1 {1},{2}", tr, x + side, y + tr);
    }
    let _ = write!(out, "V{}", y + side - br);
    if br > 0.0 {
        let _ = write!(out, "A{0},{0} 0 0 1 {1},{2}", br, x + side - br, y + side);
    }
    let _ = write!(out, "H{}", x + bl);
    if bl > 0.0 {
        let _ = write!(out, "A{0},{0} 0 0 1 {1},{2}", bl, x, y + side - bl);
    }
    let _ = write!(out, "V{}", y + tl);
    if tl > 0.0 {
        let _ = write!(out, "A{0},{0} 0 0 1 {1},{2}", tl, x + tl, y);
    }
    out.push('Z');
}
