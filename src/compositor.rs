// Thumbnail compositing
//
// Decodes the resolved icon (rasterizing SVG first), scales it to fit a
// square canvas without changing its aspect ratio, centers it on a fully
// transparent background and encodes the result as PNG.

use crate::sniff::ImageKind;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};
use thiserror::Error;

/// Longest edge an SVG is rasterized at, however large it claims to be
const MAX_SVG_EDGE: u32 = 8192;

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("invalid thumbnail size {0}")]
    InvalidSize(u32),

    #[error("invalid SVG: {0}")]
    Svg(#[from] usvg::Error),

    #[error("SVG of {width}x{height} cannot be rasterized")]
    SvgRaster { width: u32, height: u32 },

    #[error("cannot decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("cannot encode PNG: {0}")]
    Encode(#[source] image::ImageError),

    #[error("image has no pixels")]
    EmptyImage,
}

/// A finished thumbnail
#[derive(Clone, Debug)]
pub struct Thumbnail {
    /// Encoded PNG, `size` by `size` pixels
    pub png: Vec<u8>,
    /// Dimensions of the decoded icon before scaling
    pub source_dimensions: (u32, u32),
}

/// Composite `data` onto a transparent `size`×`size` canvas and return the
/// PNG bytes.
pub fn composite(data: &[u8], kind: ImageKind, size: u32) -> Result<Vec<u8>, CompositeError> {
    render_thumbnail(data, kind, size).map(|thumbnail| thumbnail.png)
}

/// Like [`composite`], but also reports the source dimensions.
pub fn render_thumbnail(
    data: &[u8],
    kind: ImageKind,
    size: u32,
) -> Result<Thumbnail, CompositeError> {
    if size == 0 {
        return Err(CompositeError::InvalidSize(size));
    }

    let image = decode(data, kind)?;
    let source_dimensions = image.dimensions();
    log::debug!(
        "decoded {} icon: {}x{}",
        kind,
        source_dimensions.0,
        source_dimensions.1
    );

    let canvas = fit_to_canvas(&image, size)?;
    let png = encode_png(&canvas)?;
    Ok(Thumbnail {
        png,
        source_dimensions,
    })
}

/// Decode PNG or SVG bytes into RGBA8 pixels.
pub fn decode(data: &[u8], kind: ImageKind) -> Result<RgbaImage, CompositeError> {
    let image = match kind {
        ImageKind::Svg => rasterize_svg(data)?,
        ImageKind::Png => image::load_from_memory_with_format(data, ImageFormat::Png)
            .map_err(CompositeError::Decode)?
            .into_rgba8(),
    };

    if image.width() == 0 || image.height() == 0 {
        return Err(CompositeError::EmptyImage);
    }
    Ok(image)
}

/// Render an SVG (plain or gzip-compressed) at its intrinsic size, rounded
/// up to whole pixels.
pub fn rasterize_svg(data: &[u8]) -> Result<RgbaImage, CompositeError> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_data(data, &options)?;
    let intrinsic = tree.size().to_int_size();
    let (width, height) = (intrinsic.width(), intrinsic.height());

    // Huge documents are rendered scaled down instead of allocating gigabytes
    let longest = width.max(height);
    let (scale, width, height) = if longest > MAX_SVG_EDGE {
        let scale = MAX_SVG_EDGE as f32 / longest as f32;
        let (w, h) = scale_dimensions(width, height, MAX_SVG_EDGE);
        (scale, w, h)
    } else {
        (1.0, width, height)
    };

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or(CompositeError::SvgRaster { width, height })?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    // tiny-skia stores premultiplied alpha
    let mut image = RgbaImage::new(width, height);
    for (pixel, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        pixel.0 = [color.red(), color.green(), color.blue(), color.alpha()];
    }
    Ok(image)
}

/// Largest dimensions with the aspect ratio of `width`×`height` that fit in
/// a `size`×`size` square, never smaller than one pixel.
///
/// This is `floor(dim * min(size / width, size / height))`, computed in
/// integers so that the longer side always lands exactly on `size`.
pub fn scale_dimensions(width: u32, height: u32, size: u32) -> (u32, u32) {
    let (w, h, s) = (width.max(1) as u64, height.max(1) as u64, size as u64);
    let (new_w, new_h) = if w >= h { (s, h * s / w) } else { (w * s / h, s) };
    (new_w.clamp(1, s) as u32, new_h.clamp(1, s) as u32)
}

/// Top-left position that centers a `width`×`height` image on the canvas.
pub fn centered_offset(width: u32, height: u32, size: u32) -> (u32, u32) {
    (
        size.saturating_sub(width) / 2,
        size.saturating_sub(height) / 2,
    )
}

/// Scale `image` with Lanczos3 and paste it, centered, over a transparent
/// canvas. The pixels replace the canvas; nothing is blended.
pub fn fit_to_canvas(image: &RgbaImage, size: u32) -> Result<RgbaImage, CompositeError> {
    if size == 0 {
        return Err(CompositeError::InvalidSize(size));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(CompositeError::EmptyImage);
    }

    let (width, height) = scale_dimensions(image.width(), image.height(), size);
    let scaled = imageops::resize(image, width, height, FilterType::Lanczos3);
    let (x, y) = centered_offset(width, height, size);
    log::debug!(
        "scaled {}x{} -> {}x{} at ({}, {})",
        image.width(),
        image.height(),
        width,
        height,
        x,
        y
    );

    let mut canvas = RgbaImage::new(size, size);
    imageops::replace(&mut canvas, &scaled, x as i64, y as i64);
    Ok(canvas)
}

/// Encode RGBA pixels as PNG with maximum compression and adaptive filtering.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CompositeError> {
    let mut png = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut png, CompressionType::Best, PngFilterType::Adaptive);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(CompositeError::Encode)?;
    Ok(png)
}
