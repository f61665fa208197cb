//! Luminance equalization for feature extraction.
//!
//! Converts RGB to BT.601 YCbCr, histogram-equalizes the Y channel only, and
//! converts back. The result feeds the face encoder; it is never written to
//! disk or drawn on.

use image::RgbImage;

const LEVELS: usize = 256;

/// Equalize the luminance histogram of an image, leaving chrominance intact.
///
/// Pure function of the input pixels: dimensions and channel count are
/// preserved, and a constant-luminance image maps to itself.
pub fn equalize_luminance(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();

    // Luminance plane + histogram in one pass.
    let mut luma = vec![0u8; (width as usize) * (height as usize)];
    let mut histogram = [0u64; LEVELS];
    for (i, px) in image.pixels().enumerate() {
        let y = rgb_to_y(px.0[0], px.0[1], px.0[2]);
        luma[i] = y;
        histogram[y as usize] += 1;
    }

    let lut = equalization_lut(&histogram);

    // Recombine: equalized Y with the original Cb/Cr of each pixel.
    let mut out = RgbImage::new(width, height);
    for (i, (src, dst)) in image.pixels().zip(out.pixels_mut()).enumerate() {
        let [r, g, b] = src.0;
        let rf = r as f32;
        let gf = g as f32;
        let bf = b as f32;
        let cb = 128.0 - 0.168_736 * rf - 0.331_264 * gf + 0.5 * bf;
        let cr = 128.0 + 0.5 * rf - 0.418_688 * gf - 0.081_312 * bf;
        let y_eq = lut[luma[i] as usize] as f32;

        dst.0 = ycbcr_to_rgb(y_eq, cb, cr);
    }

    out
}

fn rgb_to_y(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> [u8; 3] {
    let r = y + 1.402 * (cr - 128.0);
    let g = y - 0.344_136 * (cb - 128.0) - 0.714_136 * (cr - 128.0);
    let b = y + 1.772 * (cb - 128.0);
    [
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    ]
}

/// Build the cumulative-distribution lookup table.
///
/// Maps the lowest occupied luminance level to 0 and the highest to 255.
/// A single-level histogram gets the identity mapping so flat images pass
/// through unchanged.
fn equalization_lut(histogram: &[u64; LEVELS]) -> [u8; LEVELS] {
    let total: u64 = histogram.iter().sum();
    let cdf_min = histogram
        .iter()
        .scan(0u64, |acc, &count| {
            *acc += count;
            Some(*acc)
        })
        .find(|&c| c > 0)
        .unwrap_or(0);

    let mut lut = [0u8; LEVELS];
    if total == 0 || total == cdf_min {
        // Empty or single-level image: identity.
        for (v, slot) in lut.iter_mut().enumerate() {
            *slot = v as u8;
        }
        return lut;
    }

    let denom = (total - cdf_min) as f32;
    let mut cdf = 0u64;
    for (v, slot) in lut.iter_mut().enumerate() {
        cdf += histogram[v];
        let scaled = ((cdf.saturating_sub(cdf_min)) as f32 / denom) * 255.0;
        *slot = scaled.round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_preserves_dimensions() {
        let img = RgbImage::from_pixel(37, 21, Rgb([90, 140, 200]));
        let out = equalize_luminance(&img);
        assert_eq!(out.dimensions(), (37, 21));
    }

    #[test]
    fn test_constant_image_unchanged() {
        // Flat luminance must map through the identity LUT.
        let img = RgbImage::from_pixel(16, 16, Rgb([100, 100, 100]));
        let out = equalize_luminance(&img);
        for (a, b) in img.pixels().zip(out.pixels()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_two_level_image_spreads_to_full_range() {
        // Half dark gray, half light gray: equalization should push the
        // levels to the extremes of the range.
        let mut img = RgbImage::new(10, 2);
        for x in 0..10 {
            img.put_pixel(x, 0, Rgb([100, 100, 100]));
            img.put_pixel(x, 1, Rgb([150, 150, 150]));
        }
        let out = equalize_luminance(&img);
        let dark = rgb_to_y(out.get_pixel(0, 0).0[0], out.get_pixel(0, 0).0[1], out.get_pixel(0, 0).0[2]);
        let light = rgb_to_y(out.get_pixel(0, 1).0[0], out.get_pixel(0, 1).0[1], out.get_pixel(0, 1).0[2]);
        assert!(dark <= 2, "lowest level maps near 0, got {dark}");
        assert!(light >= 253, "highest level maps near 255, got {light}");
    }

    #[test]
    fn test_luminance_order_preserved() {
        // Equalization is monotone in luminance.
        let mut img = RgbImage::new(4, 1);
        for (x, v) in [30u8, 80, 130, 220].iter().enumerate() {
            img.put_pixel(x as u32, 0, Rgb([*v, *v, *v]));
        }
        let out = equalize_luminance(&img);
        let levels: Vec<u8> = (0..4)
            .map(|x| {
                let p = out.get_pixel(x, 0).0;
                rgb_to_y(p[0], p[1], p[2])
            })
            .collect();
        assert!(levels.windows(2).all(|w| w[0] <= w[1]), "order broken: {levels:?}");
    }

    #[test]
    fn test_lut_identity_for_empty_histogram() {
        let histogram = [0u64; LEVELS];
        let lut = equalization_lut(&histogram);
        assert_eq!(lut[0], 0);
        assert_eq!(lut[128], 128);
        assert_eq!(lut[255], 255);
    }
}
