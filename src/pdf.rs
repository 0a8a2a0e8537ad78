//! PDF document generation.
//!
//! Two rendering strategies exist, selected by [`PdfStyle`]:
//!
//! - **Vector** fills the icon's path geometry on a page matching the
//!   icons' native 24x24 coordinate box. Markup is parsed properly with
//!   usvg: every `<path>` is collected with its absolute transform, in
//!   any attribute order, with arcs pre-lowered to cubics.
//! - **EmbeddedRaster** embeds a rasterized JPEG of the icon on a page
//!   sized to the raster dimensions.
//!
//! Both return an explicit `Result`; they never substitute output
//! themselves. The export layer decides what to do with a failure. In
//! practice it falls back to [`error_document`], so the user always
//! receives a downloadable file.

use image::RgbaImage;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use resvg::tiny_skia::PathSegment;
use resvg::usvg::{self, Group, Node, Options, Tree};
use thiserror::Error;

use crate::encode::{encode_raster, EncodeError, RasterFormat};

/// Vector pages match the icons' native coordinate box.
const VECTOR_PAGE_SIZE: f32 = 24.0;

/// Error documents use a small fixed page, A8 in points.
const ERROR_PAGE_WIDTH: f32 = 148.0;
const ERROR_PAGE_HEIGHT: f32 = 210.0;

/// Fixed internal document title; downloads are renamed to `{slug}.pdf`.
const DOCUMENT_TITLE: &str = "invoice.pdf";

#[derive(Error, Debug)]
pub enum PdfError {
    /// The markup could not be parsed as SVG.
    #[error("malformed SVG: {0}")]
    Parse(#[from] usvg::Error),

    /// The document parsed but contains no fillable path geometry.
    #[error("icon has no fillable path data")]
    NoPath,

    /// Rasterizing or JPEG-encoding failed in the embedded-raster style.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// How PDF exports render the icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PdfStyle {
    /// Fill the icon's path data as vector geometry on a 24×24 page.
    #[default]
    Vector,
    /// Embed a rasterized JPEG on a page sized to the raster target.
    EmbeddedRaster,
}

// ============================================================================
// Document scaffolding
// ============================================================================

/// Object numbering shared by all document shapes.
struct DocRefs {
    catalog: Ref,
    pages: Ref,
    page: Ref,
    content: Ref,
    resource: Ref,
    info: Ref,
}

impl DocRefs {
    fn new() -> Self {
        Self {
            catalog: Ref::new(1),
            pages: Ref::new(2),
            page: Ref::new(3),
            content: Ref::new(4),
            resource: Ref::new(5),
            info: Ref::new(6),
        }
    }
}

fn begin_document(pdf: &mut Pdf, refs: &DocRefs) {
    pdf.catalog(refs.catalog).pages(refs.pages);
    pdf.pages(refs.pages).kids([refs.page]).count(1);
    pdf.document_info(refs.info).title(TextStr(DOCUMENT_TITLE));
}

// ============================================================================
// Vector rendering
// ============================================================================

/// Renders the icon's path geometry as a vector-filled PDF.
///
/// The page is 24×24 points. All paths in the document are filled with
/// their declared fill rule in PDF coordinates (y axis flipped).
pub fn render_vector(svg: &str) -> Result<Vec<u8>, PdfError> {
    let tree = Tree::from_str(svg, &Options::default())?;

    let mut paths = Vec::new();
    collect_paths(tree.root(), &mut paths);
    if paths.is_empty() {
        return Err(PdfError::NoPath);
    }

    let mut pdf = Pdf::new();
    let refs = DocRefs::new();
    begin_document(&mut pdf, &refs);

    {
        let mut page = pdf.page(refs.page);
        page.media_box(Rect::new(0.0, 0.0, VECTOR_PAGE_SIZE, VECTOR_PAGE_SIZE));
        page.parent(refs.pages);
        page.contents(refs.content);
        page.finish();
    }

    let size = tree.size();
    let mut content = Content::new();
    // Map SVG user space onto the page: scale to fit and flip the y axis,
    // since PDF puts the origin at the bottom-left.
    content.transform([
        VECTOR_PAGE_SIZE / size.width(),
        0.0,
        0.0,
        -(VECTOR_PAGE_SIZE / size.height()),
        0.0,
        VECTOR_PAGE_SIZE,
    ]);

    for path in &paths {
        emit_path(&mut content, path);
    }

    pdf.stream(refs.content, &content.finish());
    Ok(pdf.finish())
}

fn collect_paths<'a>(group: &'a Group, out: &mut Vec<&'a usvg::Path>) {
    for node in group.children() {
        match node {
            Node::Path(path) => out.push(path),
            Node::Group(child) => collect_paths(child, out),
            _ => {}
        }
    }
}

/// Emits one usvg path as PDF path construction + fill operators.
fn emit_path(content: &mut Content, path: &usvg::Path) {
    let t = path.abs_transform();
    let map = |x: f32, y: f32| -> (f32, f32) {
        (t.sx * x + t.kx * y + t.tx, t.ky * x + t.sy * y + t.ty)
    };

    // Track the current point to elevate quadratic segments to cubics.
    let (mut cx, mut cy) = (0.0f32, 0.0f32);

    for segment in path.data().segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                let (x, y) = map(p.x, p.y);
                content.move_to(x, y);
                (cx, cy) = (x, y);
            }
            PathSegment::LineTo(p) => {
                let (x, y) = map(p.x, p.y);
                content.line_to(x, y);
                (cx, cy) = (x, y);
            }
            PathSegment::QuadTo(p1, p2) => {
                let (qx, qy) = map(p1.x, p1.y);
                let (x, y) = map(p2.x, p2.y);
                // Degree elevation: cubic controls at 2/3 toward the
                // quadratic control point.
                let c1 = (cx + 2.0 / 3.0 * (qx - cx), cy + 2.0 / 3.0 * (qy - cy));
                let c2 = (x + 2.0 / 3.0 * (qx - x), y + 2.0 / 3.0 * (qy - y));
                content.cubic_to(c1.0, c1.1, c2.0, c2.1, x, y);
                (cx, cy) = (x, y);
            }
            PathSegment::CubicTo(p1, p2, p3) => {
                let (x1, y1) = map(p1.x, p1.y);
                let (x2, y2) = map(p2.x, p2.y);
                let (x, y) = map(p3.x, p3.y);
                content.cubic_to(x1, y1, x2, y2, x, y);
                (cx, cy) = (x, y);
            }
            PathSegment::Close => {
                content.close_path();
            }
        }
    }

    match path.fill().map(|f| f.rule()) {
        Some(usvg::FillRule::EvenOdd) => content.fill_even_odd(),
        _ => content.fill_nonzero(),
    };
}

// ============================================================================
// Embedded-raster rendering
// ============================================================================

/// Embeds a rasterized icon as a JPEG image XObject.
///
/// The page is sized to the raster dimensions, one point per pixel, with
/// the image drawn across the full page.
pub fn render_embedded_raster(image: &RgbaImage) -> Result<Vec<u8>, PdfError> {
    let jpeg = encode_raster(image, RasterFormat::Jpg)?;
    let (width, height) = (image.width() as f32, image.height() as f32);

    let mut pdf = Pdf::new();
    let refs = DocRefs::new();
    begin_document(&mut pdf, &refs);

    {
        let mut page = pdf.page(refs.page);
        page.media_box(Rect::new(0.0, 0.0, width, height));
        page.parent(refs.pages);
        page.contents(refs.content);
        page.resources()
            .x_objects()
            .pair(Name(b"Im1"), refs.resource);
        page.finish();
    }

    {
        let mut xobject = pdf.image_xobject(refs.resource, &jpeg);
        xobject.filter(Filter::DctDecode);
        xobject.width(image.width() as i32);
        xobject.height(image.height() as i32);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
        xobject.finish();
    }

    let mut content = Content::new();
    content.save_state();
    content.transform([width, 0.0, 0.0, height, 0.0, 0.0]);
    content.x_object(Name(b"Im1"));
    content.restore_state();

    pdf.stream(refs.content, &content.finish());
    Ok(pdf.finish())
}

// ============================================================================
// Error document
// ============================================================================

/// Builds the minimal document substituted when rendering fails.
///
/// A small fixed page with the message set in Helvetica (a base-14 font,
/// so nothing is embedded). This function cannot fail; the caller is
/// already in a failure path and must end up with a file either way.
pub fn error_document(message: &str) -> Vec<u8> {
    let mut pdf = Pdf::new();
    let refs = DocRefs::new();
    begin_document(&mut pdf, &refs);

    {
        let mut page = pdf.page(refs.page);
        page.media_box(Rect::new(0.0, 0.0, ERROR_PAGE_WIDTH, ERROR_PAGE_HEIGHT));
        page.parent(refs.pages);
        page.contents(refs.content);
        page.resources().fonts().pair(Name(b"F1"), refs.resource);
        page.finish();
    }

    pdf.type1_font(refs.resource).base_font(Name(b"Helvetica"));

    let mut content = Content::new();
    content.begin_text();
    content.set_font(Name(b"F1"), 12.0);
    content.next_line(8.0, ERROR_PAGE_HEIGHT - 20.0);
    for (i, line) in wrap_message(message, 20).iter().enumerate() {
        if i > 0 {
            content.next_line(0.0, -14.0);
        }
        content.show(Str(line.as_bytes()));
    }
    content.end_text();

    pdf.stream(refs.content, &content.finish());
    pdf.finish()
}

/// Greedy word wrap sized to the error page width.
fn wrap_message(message: &str, width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in message.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const TRIANGLE_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M12 0L24 24H0Z"/></svg>"#;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn vector_document_has_magic_title_and_page_box() {
        let bytes = render_vector(TRIANGLE_SVG).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(contains(&bytes, b"invoice.pdf"));
        assert!(contains(&bytes, b"MediaBox"));
    }

    #[test]
    fn malformed_markup_is_a_parse_error() {
        let err = render_vector("definitely not svg").unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn pathless_markup_is_a_no_path_error() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"></svg>"#;
        let err = render_vector(svg).unwrap_err();
        assert!(matches!(err, PdfError::NoPath));
    }

    #[test]
    fn embedded_raster_document_carries_the_jpeg() {
        let image = RgbaImage::from_pixel(32, 32, Rgba([0, 128, 255, 255]));
        let bytes = render_embedded_raster(&image).unwrap();

        assert!(bytes.starts_with(b"%PDF-"));
        assert!(contains(&bytes, b"DCTDecode"));
        // The JPEG SOI marker appears inside the image stream.
        assert!(contains(&bytes, &[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn error_document_is_nonempty_and_contains_the_message() {
        let bytes = error_document("pathdata parse failure");
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(contains(&bytes, b"pathdata"));
        assert!(contains(&bytes, b"Helvetica"));
    }

    #[test]
    fn error_document_accepts_an_empty_message() {
        let bytes = error_document("");
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn wrap_message_respects_the_width() {
        let lines = wrap_message("one two three four five six seven", 10);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= 10 || !l.contains(' ')));
    }
}
