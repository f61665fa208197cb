//! Box drawing and output-name derivation.
//!
//! Rectangles are drawn on the ORIGINAL image, never the normalized variant.

use crate::types::FaceBox;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::Path;

/// Box color for a face matching the target.
pub const MATCH_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Box color for a non-matching face. The original tool drew BGR (255, 0, 0).
pub const NO_MATCH_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

const THICKNESS_DIVISOR: u32 = 200;

/// Line thickness scaled to the image's shorter dimension so annotation stays
/// visible on both thumbnails and large photos.
pub fn box_thickness(image_width: u32, image_height: u32) -> u32 {
    (image_width.min(image_height) / THICKNESS_DIVISOR).max(1)
}

/// Draw one color-coded rectangle per face onto `image`.
///
/// Thickness is achieved by nesting hollow rectangles inward; rings that
/// would collapse to zero size are skipped.
pub fn draw_face_boxes(image: &mut RgbImage, faces: &[(FaceBox, bool)]) {
    let thickness = box_thickness(image.width(), image.height());

    for &(face, matched) in faces {
        let color = if matched { MATCH_COLOR } else { NO_MATCH_COLOR };
        for ring in 0..thickness {
            let inset = ring * 2;
            if face.width() <= inset || face.height() <= inset {
                break;
            }
            let rect = Rect::at((face.x_min + ring) as i32, (face.y_min + ring) as i32)
                .of_size(face.width() - inset, face.height() - inset);
            draw_hollow_rect_mut(image, rect, color);
        }
    }
}

/// Derive the exported file name from the source file name.
///
/// `green_detected_<stem><ext>` when any face matched the target, otherwise
/// `detected_<stem><ext>`.
pub fn output_file_name(source: &Path, any_match: bool) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let prefix = if any_match { "green_detected_" } else { "detected_" };
    format!("{prefix}{stem}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_thickness_small_image() {
        // 100x80 → 80/200 = 0, floored to the 1px minimum
        assert_eq!(box_thickness(100, 80), 1);
    }

    #[test]
    fn test_thickness_large_image() {
        assert_eq!(box_thickness(4000, 3000), 15);
        assert_eq!(box_thickness(3000, 4000), 15);
    }

    #[test]
    fn test_output_file_name_no_match() {
        let p = PathBuf::from("/photos/holiday.JPG");
        assert_eq!(output_file_name(&p, false), "detected_holiday.JPG");
    }

    #[test]
    fn test_output_file_name_match() {
        let p = PathBuf::from("group shot.png");
        assert_eq!(output_file_name(&p, true), "green_detected_group shot.png");
    }

    #[test]
    fn test_output_file_name_without_extension() {
        let p = PathBuf::from("photo");
        assert_eq!(output_file_name(&p, false), "detected_photo");
    }

    #[test]
    fn test_draw_colors_by_match_status() {
        let mut img = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let matched = FaceBox { x_min: 10, y_min: 10, x_max: 30, y_max: 30 };
        let other = FaceBox { x_min: 50, y_min: 50, x_max: 70, y_max: 70 };
        draw_face_boxes(&mut img, &[(matched, true), (other, false)]);

        assert_eq!(*img.get_pixel(10, 10), MATCH_COLOR);
        assert_eq!(*img.get_pixel(50, 50), NO_MATCH_COLOR);
        // Interior untouched
        assert_eq!(*img.get_pixel(20, 20), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(60, 60), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_thickness_rings() {
        // 600x600 image → thickness 3: three nested rings per box.
        let mut img = RgbImage::from_pixel(600, 600, Rgb([0, 0, 0]));
        let face = FaceBox { x_min: 100, y_min: 100, x_max: 200, y_max: 200 };
        draw_face_boxes(&mut img, &[(face, false)]);

        for ring in 0..3 {
            assert_eq!(
                *img.get_pixel(100 + ring, 100 + ring),
                NO_MATCH_COLOR,
                "ring {ring} missing"
            );
        }
        assert_eq!(*img.get_pixel(103, 103), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_tiny_box_does_not_panic() {
        let mut img = RgbImage::from_pixel(600, 600, Rgb([0, 0, 0]));
        // 2x2 box on an image whose thickness (3) exceeds what fits.
        let face = FaceBox { x_min: 0, y_min: 0, x_max: 2, y_max: 2 };
        draw_face_boxes(&mut img, &[(face, true)]);
        assert_eq!(*img.get_pixel(0, 0), MATCH_COLOR);
    }
}
