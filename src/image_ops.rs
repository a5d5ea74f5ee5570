//! Image kernel (spec §4.B): turning an arbitrary source buffer into the
//! square `S x S` frame the optimizer works in, and projecting a finished
//! assignment back into an image.
//!
//! Grounded in the teacher's `calculate::util::get_images`/`load_target`,
//! which resize with `image::imageops::resize` and `FilterType::Lanczos3`;
//! generalized here to take explicit [`CropScale`] parameters for both the
//! source and target instead of assuming the target is a fixed embedded
//! asset.

use image::{ImageBuffer, Rgb, RgbImage, imageops::FilterType};

use crate::preset::CropScale;

pub type RgbPixel = (u8, u8, u8);

/// Crops `src` to a centered-and-panned square per `params`, then resamples
/// it to `sidelen x sidelen` (spec §4.B steps 1-4).
pub fn crop_and_scale(src: &RgbImage, sidelen: u32, params: CropScale) -> RgbImage {
    let (w, h) = (src.width(), src.height());
    let base = w.min(h) as f64;
    let scale = params.scale.max(1.0);
    let crop_side = (base / scale).clamp(1.0, w.min(h) as f64).floor() as u32;

    let max_off_x = w.saturating_sub(crop_side);
    let max_off_y = h.saturating_sub(crop_side);

    let xn = params.x.clamp(-1.0, 1.0) * 0.5 + 0.5;
    let yn = params.y.clamp(-1.0, 1.0) * 0.5 + 0.5;

    let x0 = (xn * max_off_x as f64).floor() as u32;
    let y0 = (yn * max_off_y as f64).floor() as u32;

    let cropped = image::imageops::crop_imm(src, x0, y0, crop_side, crop_side).to_image();
    image::imageops::resize(&cropped, sidelen, sidelen, FilterType::Lanczos3)
}

/// Row-major flattening of an `S x S` RGB image into one RGB triple per
/// linear pixel position (spec §3 "Pixel palette").
pub fn extract_palette(img: &RgbImage) -> Vec<RgbPixel> {
    img.pixels().map(|p| (p[0], p[1], p[2])).collect()
}

/// Reads a grayscale-ish weight image's red channel as the per-target-pixel
/// color weight (spec §3 "Weight map"); callers typically feed this the
/// same cropped-and-scaled dimensions as the target palette.
pub fn extract_weights(img: &RgbImage) -> Vec<i64> {
    img.pixels().map(|p| p[0] as i64).collect()
}

/// Uniform weight map (all 255) used when no custom target/weights were
/// supplied (spec §3: "For custom targets, weights are uniformly 255").
pub fn uniform_weights(n: usize) -> Vec<i64> {
    vec![255; n]
}

/// Builds the image a permutation would render as a still frame: for each
/// target position `t` in row-major order, write `palette[assignments[t]]`
/// (spec §4.B "Assignment -> image").
pub fn assignments_to_image(palette: &[RgbPixel], assignments: &[usize], sidelen: u32) -> RgbImage {
    let mut img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(sidelen, sidelen);
    for (t, &s) in assignments.iter().enumerate() {
        let x = (t as u32) % sidelen;
        let y = (t as u32) / sidelen;
        let (r, g, b) = palette[s];
        img.put_pixel(x, y, Rgb([r, g, b]));
    }
    img
}
