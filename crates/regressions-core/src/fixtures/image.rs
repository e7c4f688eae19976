use super::switch_setters;
use crate::capability::Backend;
use crate::domain::{RegressionError, RegressionResult};
use crate::protocol::{CheckOutcome, SnapshotStrategy, SnapshotTarget};
use crate::regression::{Regression, Switches};
use std::fs;
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSION: &str = ".png";
/// Percent of the maximum possible pixel difference.
pub const DEFAULT_DIFF_THRESHOLD: f64 = 0.1;
const FIXTURE: &str = "image";

#[derive(Debug, Clone, PartialEq)]
pub struct ImageCheck {
    pub basename: Option<String>,
    pub fullpath: Option<PathBuf>,
    pub diff_threshold: f64,
    /// When false the check passes only if the images differ by more than
    /// `diff_threshold`.
    pub expect_equal: bool,
}

impl Default for ImageCheck {
    fn default() -> Self {
        Self {
            basename: None,
            fullpath: None,
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            expect_equal: true,
        }
    }
}

pub struct ImageRegression<'a> {
    regression: &'a Regression,
    switches: Switches,
}

impl<'a> ImageRegression<'a> {
    pub(crate) fn new(regression: &'a Regression) -> Self {
        Self {
            regression,
            switches: Switches::default(),
        }
    }

    switch_setters!();

    /// Checks encoded image bytes in any format the decoder understands.
    pub fn check(&self, image: &[u8]) -> RegressionResult<CheckOutcome> {
        self.check_with(image, ImageCheck::default())
    }

    pub fn check_with(&self, image: &[u8], options: ImageCheck) -> RegressionResult<CheckOutcome> {
        Backend::Image.require(FIXTURE)?;
        let snapshot = ImageSnapshot {
            png: encode_png(image)?,
            diff_threshold: options.diff_threshold,
            expect_equal: options.expect_equal,
        };
        let target = SnapshotTarget {
            basename: options.basename,
            fullpath: options.fullpath,
            obtained_filename: None,
        };
        self.regression
            .run(&target, IMAGE_EXTENSION, self.switches, &snapshot)
    }
}

struct ImageSnapshot {
    png: Vec<u8>,
    diff_threshold: f64,
    expect_equal: bool,
}

impl SnapshotStrategy for ImageSnapshot {
    fn dump(&self, path: &Path) -> RegressionResult<()> {
        fs::write(path, &self.png).map_err(|source| RegressionError::io("write", path, source))
    }

    fn compare(&self, obtained: &Path, expected: &Path) -> RegressionResult<()> {
        compare_image_files(obtained, expected, self.diff_threshold, self.expect_equal)
    }
}

pub fn diff_image_path(obtained: &Path) -> PathBuf {
    obtained.with_extension("diff.png")
}

#[cfg(feature = "image")]
pub use codec::{compare_image_files, encode_png, image_distance};

#[cfg(not(feature = "image"))]
pub fn encode_png(_image: &[u8]) -> RegressionResult<Vec<u8>> {
    Err(Backend::Image.unavailable(FIXTURE))
}

#[cfg(not(feature = "image"))]
pub fn compare_image_files(
    _obtained: &Path,
    _expected: &Path,
    _diff_threshold: f64,
    _expect_equal: bool,
) -> RegressionResult<()> {
    Err(Backend::Image.unavailable(FIXTURE))
}

#[cfg(feature = "image")]
mod codec {
    use super::diff_image_path;
    use crate::comparator::MismatchError;
    use crate::domain::{RegressionError, RegressionResult};
    use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, load_from_memory};
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;
    use tracing::{debug, warn};

    /// Decodes `image` and re-encodes it as PNG.
    pub fn encode_png(image: &[u8]) -> RegressionResult<Vec<u8>> {
        let decoded = load_from_memory(image).map_err(|error| {
            RegressionError::InvalidInput(format!("image data could not be decoded: {error}"))
        })?;
        let decoded = match decoded {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                DynamicImage::ImageRgba8(decoded.to_rgba8())
            }
            other => other,
        };
        let mut png = Vec::new();
        decoded
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|error| RegressionError::Serialization(error.to_string()))?;
        Ok(png)
    }

    pub fn compare_image_files(
        obtained: &Path,
        expected: &Path,
        diff_threshold: f64,
        expect_equal: bool,
    ) -> RegressionResult<()> {
        let obtained_image = load(obtained)?;
        let expected_image = load(expected)?;
        let distance = image_distance(&obtained_image, &expected_image);
        debug!(distance, diff_threshold, expect_equal, "compared images");

        let failed = if expect_equal {
            distance > diff_threshold
        } else {
            distance <= diff_threshold
        };
        if !failed {
            return Ok(());
        }

        if expect_equal {
            let diff_path = diff_image_path(obtained);
            if let Err(error) = write_diff_image(&diff_path, &obtained_image, &expected_image) {
                warn!(path = %diff_path.display(), %error, "difference image was not written");
            }
        }
        Err(MismatchError::Image {
            distance,
            expect_equal,
            obtained: obtained.to_path_buf(),
            expected: expected.to_path_buf(),
        }
        .into())
    }

    fn load(path: &Path) -> RegressionResult<DynamicImage> {
        let bytes = fs::read(path).map_err(|source| RegressionError::io("read", path, source))?;
        load_from_memory(&bytes).map_err(|error| RegressionError::corrupt(path, error))
    }

    /// Pixel buffers in a shared mode: grayscale only when both are grayscale.
    fn common_pixels(a: &DynamicImage, b: &DynamicImage) -> (usize, Vec<u8>, Vec<u8>) {
        match (a, b) {
            (DynamicImage::ImageLuma8(a), DynamicImage::ImageLuma8(b)) => {
                (1, a.as_raw().clone(), b.as_raw().clone())
            }
            _ => (3, a.to_rgb8().into_raw(), b.to_rgb8().into_raw()),
        }
    }

    /// Manhattan distance as a percentage of the largest possible one.
    pub fn image_distance(obtained: &DynamicImage, expected: &DynamicImage) -> f64 {
        if obtained.width() != expected.width() || obtained.height() != expected.height() {
            return 100.0;
        }
        let (channels, a, b) = common_pixels(obtained, expected);
        if a.is_empty() {
            return 0.0;
        }
        let total: u64 = a
            .iter()
            .zip(&b)
            .map(|(x, y)| u64::from(x.abs_diff(*y)))
            .sum();
        let pixels = a.len() / channels;
        100.0 * total as f64 / (channels * pixels * 255) as f64
    }

    fn write_diff_image(
        path: &Path,
        obtained: &DynamicImage,
        expected: &DynamicImage,
    ) -> Result<(), String> {
        if obtained.width() != expected.width() || obtained.height() != expected.height() {
            return Err("image sizes differ".to_string());
        }
        let (width, height) = (obtained.width(), obtained.height());
        let (channels, a, b) = common_pixels(obtained, expected);
        let delta: Vec<u8> = a.iter().zip(&b).map(|(x, y)| x.abs_diff(*y)).collect();
        let saved = if channels == 1 {
            GrayImage::from_raw(width, height, delta).map(|diff| diff.save(path))
        } else {
            RgbImage::from_raw(width, height, delta).map(|diff| diff.save(path))
        };
        match saved {
            Some(result) => result.map_err(|error| error.to_string()),
            None => Err("pixel buffer does not match image size".to_string()),
        }
    }
}

#[cfg(all(test, feature = "image"))]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

    fn rgb(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| Rgb(pixel(x, y))))
    }

    #[test]
    fn identical_images_have_zero_distance() {
        let image = rgb(4, 4, |x, y| [x as u8 * 10, y as u8 * 10, 7]);
        assert_eq!(image_distance(&image, &image.clone()), 0.0);
    }

    #[test]
    fn one_saturated_channel_is_proportional() {
        let base = rgb(2, 2, |_, _| [0, 0, 0]);
        let changed = rgb(2, 2, |x, y| if (x, y) == (0, 0) { [255, 0, 0] } else { [0, 0, 0] });
        let distance = image_distance(&changed, &base);
        assert!((distance - 100.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn different_sizes_are_maximally_different() {
        let small = rgb(2, 2, |_, _| [1, 2, 3]);
        let large = rgb(3, 2, |_, _| [1, 2, 3]);
        assert_eq!(image_distance(&small, &large), 100.0);
    }

    #[test]
    fn grayscale_and_rgb_compare_in_rgb() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_fn(2, 2, |_, _| Luma([128])));
        let color = rgb(2, 2, |_, _| [128, 128, 128]);
        assert_eq!(image_distance(&gray, &color), 0.0);
    }

    #[test]
    fn reencoding_produces_png_signature() {
        let image = rgb(3, 3, |x, _| [x as u8, 0, 0]);
        let mut encoded = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
            .expect("png should encode");
        let png = encode_png(&encoded).expect("png should re-encode");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let error = encode_png(b"definitely not an image").expect_err("garbage should fail");
        assert_eq!(error.category(), crate::domain::RegressionErrorCategory::InvalidInput);
    }
}
