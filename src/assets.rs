//! Texture images for the demos
//!
//! Images are kept as `tiny_skia::Pixmap`s (premultiplied RGBA8) so they can
//! be uploaded to GL as `RGBA`/`UNSIGNED_BYTE` without conversion.

use anyhow::{bail, Context, Result};
use png::{BitDepth, ColorType, Transformations};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiny_skia::{
    Color, ColorU8, FillRule, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};

/// Transparent `width`x`height` pixmap
pub fn new_pixmap(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height).with_context(|| format!("Invalid image size {width}x{height}"))
}

/// Decodes a PNG file into a premultiplied pixmap
pub fn load_png<P: AsRef<Path>>(path: P) -> Result<Pixmap> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .with_context(|| format!("Failed to read PNG header of {}", path.display()))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let data = &buf[..frame.buffer_size()];

    if frame.bit_depth != BitDepth::Eight {
        bail!("Unsupported PNG bit depth {:?}", frame.bit_depth);
    }

    let rgba: Vec<ColorU8> = match frame.color_type {
        ColorType::Rgba => data
            .chunks_exact(4)
            .map(|p| ColorU8::from_rgba(p[0], p[1], p[2], p[3]))
            .collect(),
        ColorType::Rgb => data
            .chunks_exact(3)
            .map(|p| ColorU8::from_rgba(p[0], p[1], p[2], 255))
            .collect(),
        ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .map(|p| ColorU8::from_rgba(p[0], p[0], p[0], p[1]))
            .collect(),
        ColorType::Grayscale => data
            .iter()
            .map(|g| ColorU8::from_rgba(*g, *g, *g, 255))
            .collect(),
        other => bail!("Unsupported PNG color type {other:?}"),
    };

    let premultiplied: Vec<u8> = rgba
        .into_iter()
        .flat_map(|c| {
            let p = c.premultiply();
            [p.red(), p.green(), p.blue(), p.alpha()]
        })
        .collect();

    let size = IntSize::from_wh(frame.width, frame.height).context("PNG has zero size")?;
    Pixmap::from_vec(premultiplied, size).context("PNG data does not match its size")
}

/// Draws `image` at the origin of a transparent `width`x`height` canvas,
/// cropping or padding it
pub fn compose_canvas(image: &Pixmap, width: u32, height: u32) -> Result<Pixmap> {
    let mut canvas = new_pixmap(width, height)?;
    canvas.draw_pixmap(
        0,
        0,
        image.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(canvas)
}

/// Opaque white disc filling a `size`x`size` transparent square
pub fn circle_sprite(size: u32) -> Result<Pixmap> {
    let mut pixmap = new_pixmap(size, size)?;
    let radius = size as f32 / 2.0;
    let path = PathBuilder::from_circle(radius, radius, radius).context("Invalid circle")?;

    let mut paint = Paint::default();
    paint.set_color(Color::WHITE);
    paint.anti_alias = true;
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    Ok(pixmap)
}

/// Two-tone checker pattern used when a texture file is missing
pub fn checkerboard(size: u32, cell: u32) -> Result<Pixmap> {
    if cell == 0 {
        bail!("Checker cell size must be positive");
    }
    let mut pixmap = new_pixmap(size, size)?;
    pixmap.fill(Color::from_rgba8(40, 40, 40, 255));

    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(220, 120, 30, 255));

    for row in 0..size.div_ceil(cell) {
        for col in 0..size.div_ceil(cell) {
            if (row + col) % 2 == 1 {
                continue;
            }
            if let Some(rect) = Rect::from_xywh(
                (col * cell) as f32,
                (row * cell) as f32,
                cell as f32,
                cell as f32,
            ) {
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }
    }
    Ok(pixmap)
}

/// Draws `image` onto `canvas` with its top-left corner at `x`,`y`
pub fn blit(canvas: &mut Pixmap, image: &Pixmap, x: i32, y: i32) {
    canvas.draw_pixmap(
        x,
        y,
        image.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
}

/// Lit segments per digit, bits a..g from least significant
#[rustfmt::skip]
const SEGMENTS: [u8; 10] = [
    0b011_1111, 0b000_0110, 0b101_1011, 0b100_1111, 0b110_0110,
    0b110_1101, 0b111_1101, 0b000_0111, 0b111_1111, 0b110_1111,
];

/// Draws `digit` as a seven-segment glyph filling the `width`x`height` cell
/// at `x`,`y`. Values above 9 draw nothing.
pub fn draw_digit(
    canvas: &mut Pixmap,
    digit: u8,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    color: Color,
) {
    let Some(mask) = SEGMENTS.get(usize::from(digit)) else {
        return;
    };
    let t = (width / 5.0).max(1.0);
    let half = height / 2.0;
    let segments = [
        (x, y, width, t),
        (x + width - t, y, t, half),
        (x + width - t, y + half, t, half),
        (x, y + height - t, width, t),
        (x, y + half, t, half),
        (x, y, t, half),
        (x, y + half - t / 2.0, width, t),
    ];

    let mut paint = Paint::default();
    paint.set_color(color);
    for (bit, (sx, sy, sw, sh)) in segments.into_iter().enumerate() {
        if mask & (1 << bit) == 0 {
            continue;
        }
        if let Some(rect) = Rect::from_xywh(sx, sy, sw, sh) {
            canvas.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }
}

/// White decimal `value` on an opaque black `width`x`height` label, left
/// aligned; digits that do not fit are cut off on the right
pub fn number_label(value: u64, width: u32, height: u32) -> Result<Pixmap> {
    let mut label = new_pixmap(width, height)?;
    label.fill(Color::BLACK);

    let glyph_height = height as f32 / 2.0;
    let glyph_width = glyph_height / 2.0;
    let advance = glyph_width * 1.5;
    for (i, digit) in value.to_string().bytes().enumerate() {
        let x = 2.0 + i as f32 * advance;
        if x + glyph_width > width as f32 {
            break;
        }
        draw_digit(
            &mut label,
            digit - b'0',
            x,
            2.0,
            glyph_width,
            glyph_height,
            Color::WHITE,
        );
    }
    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn alpha(pixmap: &Pixmap, x: u32, y: u32) -> u8 {
        pixmap.pixel(x, y).map(|p| p.alpha()).unwrap_or(0)
    }

    #[test]
    fn test_circle_sprite_is_a_disc() {
        let sprite = circle_sprite(256).unwrap();
        assert_eq!((sprite.width(), sprite.height()), (256, 256));
        assert_eq!(alpha(&sprite, 128, 128), 255);
        assert_eq!(alpha(&sprite, 0, 0), 0);
        assert_eq!(alpha(&sprite, 255, 255), 0);
        assert_eq!(alpha(&sprite, 128, 2), 255);
    }

    #[test]
    fn test_zero_sized_images_are_errors() {
        assert!(circle_sprite(0).is_err());
        assert!(checkerboard(0, 8).is_err());
        assert!(checkerboard(64, 0).is_err());
    }

    #[test]
    fn test_checkerboard_alternates() {
        let checker = checkerboard(64, 16).unwrap();
        let a = checker.pixel(4, 4).unwrap();
        let b = checker.pixel(20, 4).unwrap();
        let c = checker.pixel(20, 20).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.alpha(), 255);
    }

    #[test]
    fn test_compose_canvas_pads_smaller_image() {
        let small = checkerboard(32, 8).unwrap();
        let canvas = compose_canvas(&small, 256, 256).unwrap();

        assert_eq!((canvas.width(), canvas.height()), (256, 256));
        assert_eq!(alpha(&canvas, 10, 10), 255);
        assert_eq!(alpha(&canvas, 100, 100), 0);
    }

    #[test]
    fn test_blit_places_image_at_offset() {
        let mut canvas = new_pixmap(64, 64).unwrap();
        let tile = checkerboard(8, 4).unwrap();
        blit(&mut canvas, &tile, 32, 16);

        assert_eq!(alpha(&canvas, 0, 0), 0);
        assert_eq!(alpha(&canvas, 33, 17), 255);
        assert_eq!(alpha(&canvas, 39, 23), 255);
        assert_eq!(alpha(&canvas, 40, 24), 0);
    }

    #[test]
    fn test_seven_segment_digits() {
        let mut eight = new_pixmap(10, 20).unwrap();
        draw_digit(&mut eight, 8, 0.0, 0.0, 10.0, 20.0, Color::WHITE);
        // top bar, left column and middle bar all lit
        assert_eq!(alpha(&eight, 5, 0), 255);
        assert_eq!(alpha(&eight, 0, 5), 255);
        assert_eq!(alpha(&eight, 5, 10), 255);

        let mut one = new_pixmap(10, 20).unwrap();
        draw_digit(&mut one, 1, 0.0, 0.0, 10.0, 20.0, Color::WHITE);
        assert_eq!(alpha(&one, 9, 5), 255);
        assert_eq!(alpha(&one, 0, 5), 0);
        assert_eq!(alpha(&one, 5, 10), 0);

        let mut blank = new_pixmap(10, 20).unwrap();
        draw_digit(&mut blank, 12, 0.0, 0.0, 10.0, 20.0, Color::WHITE);
        assert!(blank.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn test_number_label_is_opaque_and_clipped() {
        let label = number_label(7, 64, 64).unwrap();
        assert!(label.pixels().iter().all(|p| p.alpha() == 255));
        // second glyph position stays dark for a one-digit value
        let second = label.pixel(2 + 24 + 8, 10).unwrap();
        assert_eq!((second.red(), second.green()), (0, 0));

        let long = number_label(u64::MAX, 64, 64).unwrap();
        assert_eq!(long.width(), 64);
    }

    #[test]
    fn test_load_png_rgb() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("back.png");
        {
            let file = File::create(&path)?;
            let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), 2, 1);
            encoder.set_color(ColorType::Rgb);
            encoder.set_depth(BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&[255, 0, 0, 0, 0, 255])?;
        }

        let image = load_png(&path)?;
        assert_eq!((image.width(), image.height()), (2, 1));
        let left = image.pixel(0, 0).unwrap();
        let right = image.pixel(1, 0).unwrap();
        assert_eq!((left.red(), left.blue(), left.alpha()), (255, 0, 255));
        assert_eq!((right.red(), right.blue(), right.alpha()), (0, 255, 255));
        Ok(())
    }

    #[test]
    fn test_load_png_premultiplies_alpha() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("half.png");
        {
            let file = File::create(&path)?;
            let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), 1, 1);
            encoder.set_color(ColorType::Rgba);
            encoder.set_depth(BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&[255, 255, 255, 0])?;
        }

        let image = load_png(&path)?;
        let pixel = image.pixel(0, 0).unwrap();
        assert_eq!((pixel.red(), pixel.alpha()), (0, 0));
        Ok(())
    }

    #[test]
    fn test_load_missing_png() {
        let err = load_png("/nonexistent/back.png").unwrap_err();
        assert!(err.to_string().contains("back.png"));
    }
}
