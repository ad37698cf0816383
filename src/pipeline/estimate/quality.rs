//! Photo quality gate for uploaded face photos.
//!
//! Advisory only: issues are shown to the user as retake hints but never
//! block analysis. Checks run on a 128×128 downscale so cost does not grow
//! with camera resolution.

use image::imageops::FilterType;
use image::{GenericImageView, RgbImage};
use serde::Serialize;

/// Minimum accepted photo size (width × height).
const MIN_WIDTH: u32 = 600;
const MIN_HEIGHT: u32 = 800;

/// Side of the square the photo is stretched to before measuring.
const PROBE_SIZE: u32 = 128;

/// Mean luma bounds (0-255).
const DARK_LUMA: f64 = 55.0;
const BRIGHT_LUMA: f64 = 205.0;

/// Mean Sobel gradient magnitude below which the photo reads as blurred.
const BLUR_THRESHOLD: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    LowResolution,
    TooDark,
    Overexposed,
    Blurry,
}

impl QualityIssue {
    /// Retake hint shown next to the photo slot.
    pub fn hint(&self) -> &'static str {
        match self {
            QualityIssue::LowResolution => {
                "Low resolution - aim for at least 800×1000px in good light."
            }
            QualityIssue::TooDark => "Too dark - retake near a window or increase brightness.",
            QualityIssue::Overexposed => "Overexposed - reduce harsh light; avoid flash.",
            QualityIssue::Blurry => "Hazy/blurred - hold steady, clean lens, retake.",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub issues: Vec<QualityIssue>,
    /// Source dimensions, when the bytes decoded.
    pub dimensions: Option<(u32, u32)>,
    pub mean_luma: Option<f64>,
    pub sharpness: Option<f64>,
}

impl QualityReport {
    pub fn is_acceptable(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn hints(&self) -> Vec<&'static str> {
        self.issues.iter().map(QualityIssue::hint).collect()
    }
}

/// Rec. 709 luma.
fn luma(rgb: &image::Rgb<u8>) -> f64 {
    let [r, g, b] = rgb.0;
    f64::from(r) * 0.2126 + f64::from(g) * 0.7152 + f64::from(b) * 0.0722
}

fn mean_luma(img: &RgbImage) -> f64 {
    let count = (img.width() * img.height()).max(1) as f64;
    img.pixels().map(luma).sum::<f64>() / count
}

/// Mean Sobel gradient magnitude over the interior pixels.
fn sobel_sharpness(img: &RgbImage) -> f64 {
    let (w, h) = img.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let l = |x: u32, y: u32| luma(img.get_pixel(x, y));

    let mut total = 0.0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = -l(x - 1, y - 1) - 2.0 * l(x - 1, y) - l(x - 1, y + 1)
                + l(x + 1, y - 1)
                + 2.0 * l(x + 1, y)
                + l(x + 1, y + 1);
            let gy = -l(x - 1, y - 1) - 2.0 * l(x, y - 1) - l(x + 1, y - 1)
                + l(x - 1, y + 1)
                + 2.0 * l(x, y + 1)
                + l(x + 1, y + 1);
            total += (gx * gx + gy * gy).sqrt();
        }
    }
    total / f64::from((w - 2) * (h - 2))
}

/// Assess one photo. Bytes that do not decode produce an empty report.
pub fn assess_photo_quality(bytes: &[u8]) -> QualityReport {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            tracing::debug!(error = %e, size = bytes.len(), "Photo did not decode; skipping quality checks");
            return QualityReport::default();
        }
    };

    let (width, height) = img.dimensions();
    let mut report = QualityReport {
        dimensions: Some((width, height)),
        ..QualityReport::default()
    };

    if width < MIN_WIDTH || height < MIN_HEIGHT {
        report.issues.push(QualityIssue::LowResolution);
    }

    let probe = img
        .resize_exact(PROBE_SIZE, PROBE_SIZE, FilterType::Triangle)
        .to_rgb8();

    let mean = mean_luma(&probe);
    if mean < DARK_LUMA {
        report.issues.push(QualityIssue::TooDark);
    }
    if mean > BRIGHT_LUMA {
        report.issues.push(QualityIssue::Overexposed);
    }

    let sharpness = sobel_sharpness(&probe);
    if sharpness < BLUR_THRESHOLD {
        report.issues.push(QualityIssue::Blurry);
    }

    report.mean_luma = Some(mean);
    report.sharpness = Some(sharpness);

    tracing::debug!(
        width,
        height,
        mean_luma = mean,
        sharpness,
        issues = report.issues.len(),
        "Photo quality assessed"
    );

    report
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageOutputFormat, Rgb};

    use super::*;

    fn encode_png(img: RgbImage) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn solid(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        encode_png(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    /// Black and white vertical stripes, 60px wide.
    fn striped(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if (x / 60) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        encode_png(img)
    }

    #[test]
    fn undecodable_bytes_give_empty_report() {
        let report = assess_photo_quality(&[1, 2, 3]);
        assert!(report.is_acceptable());
        assert_eq!(report.dimensions, None);
    }

    #[test]
    fn small_photo_flags_low_resolution() {
        let report = assess_photo_quality(&striped(300, 400));
        assert!(report.issues.contains(&QualityIssue::LowResolution));
        assert_eq!(report.dimensions, Some((300, 400)));
    }

    #[test]
    fn dark_photo_flags_too_dark() {
        let report = assess_photo_quality(&solid(640, 800, [10, 10, 10]));
        assert!(report.issues.contains(&QualityIssue::TooDark));
        assert!(!report.issues.contains(&QualityIssue::Overexposed));
    }

    #[test]
    fn bright_photo_flags_overexposed() {
        let report = assess_photo_quality(&solid(640, 800, [250, 250, 250]));
        assert!(report.issues.contains(&QualityIssue::Overexposed));
    }

    #[test]
    fn flat_photo_reads_as_blurry() {
        let report = assess_photo_quality(&solid(640, 800, [128, 128, 128]));
        assert_eq!(report.issues, vec![QualityIssue::Blurry]);
        assert!(report.sharpness.unwrap() < 1e-6);
    }

    #[test]
    fn sharp_well_lit_photo_passes() {
        let report = assess_photo_quality(&striped(640, 800));
        assert!(report.is_acceptable(), "issues: {:?}", report.issues);
        assert!(report.sharpness.unwrap() > BLUR_THRESHOLD);
    }

    #[test]
    fn hints_follow_issue_order() {
        let report = assess_photo_quality(&solid(100, 100, [5, 5, 5]));
        let hints = report.hints();
        assert_eq!(hints.len(), 3);
        assert!(hints[0].starts_with("Low resolution"));
        assert!(hints[1].starts_with("Too dark"));
        assert!(hints[2].starts_with("Hazy"));
    }

    #[test]
    fn hints_keep_user_facing_copy() {
        assert_eq!(
            QualityIssue::Overexposed.hint(),
            "Overexposed - reduce harsh light; avoid flash."
        );
        assert_eq!(
            QualityIssue::Blurry.hint(),
            "Hazy/blurred - hold steady, clean lens, retake."
        );
        assert_eq!(
            QualityIssue::LowResolution.hint(),
            "Low resolution - aim for at least 800×1000px in good light."
        );
        assert_eq!(
            QualityIssue::TooDark.hint(),
            "Too dark - retake near a window or increase brightness."
        );
    }
}
