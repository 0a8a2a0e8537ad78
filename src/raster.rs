//! SVG rasterization using resvg/usvg.
//!
//! The rasterizer is the offscreen canvas of the export pipeline: it decodes
//! icon markup and draws it into a freshly allocated pixel buffer at a fixed
//! target resolution. Every call owns its own buffer, so concurrent export
//! jobs never share mutable state.

use std::sync::{Arc, OnceLock};

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, fontdb, Options, Tree};
use thiserror::Error;

use crate::loader::LazyLibrary;

#[derive(Error, Debug)]
pub enum RasterError {
    /// The markup could not be parsed as SVG. Fails fast instead of
    /// waiting on a decode that will never complete.
    #[error("malformed SVG: {0}")]
    Parse(#[from] usvg::Error),

    /// The target dimensions cannot back a pixel buffer (zero-sized).
    #[error("cannot allocate a {width}x{height} raster target")]
    Allocation { width: u32, height: u32 },
}

// ============================================================================
// Raster Target
// ============================================================================

/// The fixed-size pixel box an export draws into.
///
/// The source SVG is stretched to fill the whole box: output dimensions
/// always equal the target, regardless of the source viewBox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterTarget {
    pub width: u32,
    pub height: u32,
}

impl RasterTarget {
    /// Raster download size (PNG/JPEG exports).
    pub const ICON_EXPORT: Self = Self::square(640);

    /// Preview rendering size.
    pub const PREVIEW: Self = Self::square(480);

    /// The icons' native coordinate box.
    pub const NATIVE_ICON: Self = Self::square(24);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(size: u32) -> Self {
        Self::new(size, size)
    }
}

impl Default for RasterTarget {
    fn default() -> Self {
        Self::ICON_EXPORT
    }
}

// ============================================================================
// Shared font database
// ============================================================================

/// The process-wide system font database, loaded lazily in the background.
///
/// Font discovery is the one genuinely slow dependency of the rasterizer
/// (it walks system font directories), so it is treated like an external
/// library: loaded at most once per process, awaited with a bounded wait.
/// Icons rarely contain `<text>`, but the database must be in place before
/// any that do are decoded.
pub fn shared_fontdb() -> &'static LazyLibrary<fontdb::Database> {
    static FONTDB: OnceLock<LazyLibrary<fontdb::Database>> = OnceLock::new();
    FONTDB.get_or_init(|| {
        LazyLibrary::new("fontdb", || {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            log::debug!("font database loaded with {} faces", db.len());
            Ok::<_, String>(db)
        })
    })
}

// ============================================================================
// Rasterization
// ============================================================================

/// Rasterizes SVG markup into an RGBA image at the target dimensions.
///
/// The drawing is stretched to the target box (non-uniform scale), matching
/// a draw call of `(0, 0, width, height)` onto a same-sized canvas.
///
/// # Example
///
/// ```
/// use icondeck_exporter::{rasterize, shared_fontdb, RasterTarget};
/// use std::time::Duration;
///
/// let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24">
///     <path d="M0 0h24v24H0z"/></svg>"#;
/// let fonts = shared_fontdb().get(Duration::from_secs(60)).unwrap();
/// let image = rasterize(svg, RasterTarget::square(64), fonts).unwrap();
/// assert_eq!((image.width(), image.height()), (64, 64));
/// ```
pub fn rasterize(
    svg: &str,
    target: RasterTarget,
    fontdb: Arc<fontdb::Database>,
) -> Result<RgbaImage, RasterError> {
    let mut options = Options::default();
    options.fontdb = fontdb;
    let tree = Tree::from_str(svg, &options)?;

    let mut pixmap =
        Pixmap::new(target.width, target.height).ok_or(RasterError::Allocation {
            width: target.width,
            height: target.height,
        })?;

    let size = tree.size();
    let transform = Transform::from_scale(
        target.width as f32 / size.width(),
        target.height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(pixmap_to_rgba_image(&pixmap))
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let height = pixmap.height();
    let mut img = RgbaImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let pixel = pixmap.pixel(x, y).unwrap();
            // tiny_skia stores premultiplied alpha; encoders expect straight
            let (r, g, b, a) =
                unpremultiply(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha());
            img.put_pixel(x, y, Rgba([r, g, b, a]));
        }
    }

    img
}

fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SQUARE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M0 0h24v24H0z" fill="#ff0000"/></svg>"##;

    const WIDE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="10"><rect width="100" height="10" fill="#0000ff"/></svg>"##;

    fn fonts() -> Arc<fontdb::Database> {
        shared_fontdb().get(Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn output_matches_target_dimensions() {
        let image = rasterize(SQUARE_SVG, RasterTarget::square(64), fonts()).unwrap();
        assert_eq!((image.width(), image.height()), (64, 64));
    }

    #[test]
    fn non_square_sources_are_stretched_to_the_target() {
        // A 100x10 source still fills a square target completely.
        let image = rasterize(WIDE_SVG, RasterTarget::square(40), fonts()).unwrap();
        assert_eq!((image.width(), image.height()), (40, 40));

        let bottom = image.get_pixel(20, 39);
        assert_eq!(bottom.0, [0, 0, 255, 255], "stretch must cover the box");
    }

    #[test]
    fn filled_pixels_carry_the_source_color() {
        let image = rasterize(SQUARE_SVG, RasterTarget::square(16), fonts()).unwrap();
        assert_eq!(image.get_pixel(8, 8).0, [255, 0, 0, 255]);
    }

    #[test]
    fn malformed_markup_is_a_parse_error() {
        let err = rasterize("this is not svg", RasterTarget::square(16), fonts()).unwrap_err();
        assert!(matches!(err, RasterError::Parse(_)));
    }

    #[test]
    fn zero_sized_target_is_an_allocation_error() {
        let err = rasterize(SQUARE_SVG, RasterTarget::new(0, 16), fonts()).unwrap_err();
        assert!(matches!(err, RasterError::Allocation { .. }));
    }

    #[test]
    fn preset_sizes() {
        assert_eq!(RasterTarget::ICON_EXPORT, RasterTarget::new(640, 640));
        assert_eq!(RasterTarget::PREVIEW, RasterTarget::new(480, 480));
        assert_eq!(RasterTarget::NATIVE_ICON, RasterTarget::new(24, 24));
        assert_eq!(RasterTarget::default(), RasterTarget::ICON_EXPORT);
    }

    #[test]
    fn unpremultiply_zero_alpha_is_transparent_black() {
        assert_eq!(unpremultiply(10, 20, 30, 0), (0, 0, 0, 0));
    }
}
