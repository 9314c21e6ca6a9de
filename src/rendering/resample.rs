//! Resampling strategies used to scale tiles for high-density displays.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Scales a square tile to a new edge length.
pub trait Resampler: Send + Sync {
    fn resample(&self, tile: &RgbaImage, size: u32) -> RgbaImage;
}

/// Built-in filters, from fastest to smoothest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl ResampleFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl Resampler for ResampleFilter {
    fn resample(&self, tile: &RgbaImage, size: u32) -> RgbaImage {
        imageops::resize(tile, size, size, self.filter_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_resample_scales_to_requested_size() {
        let tile = RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 255]));
        for filter in [ResampleFilter::Nearest, ResampleFilter::Lanczos3] {
            let scaled = filter.resample(&tile, 16);
            assert_eq!(scaled.dimensions(), (16, 16));
            let Rgba([r, g, b, a]) = *scaled.get_pixel(7, 7);
            for (got, want) in [(r, 200u8), (g, 100), (b, 50), (a, 255)] {
                assert!(got.abs_diff(want) <= 1, "{:?} -> {}", filter, got);
            }
        }
    }

    #[test]
    fn test_filter_names_round_trip_through_serde() {
        let json = serde_json::to_string(&ResampleFilter::CatmullRom).unwrap();
        assert_eq!(json, "\"catmull_rom\"");
        let parsed: ResampleFilter = serde_json::from_str("\"nearest\"").unwrap();
        assert_eq!(parsed, ResampleFilter::Nearest);
    }
}
