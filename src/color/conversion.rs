//! Color space helpers shared by the metric evaluator and the report
//!
//! - Hue angle of an RGB triple (HSV hue, degrees)
//! - 8-bit channel means to sRGB and hexadecimal representation

use palette::{Hsv, IntoColor, Srgb};

/// Hue of an RGB triple in degrees, in `[0, 360)`.
///
/// Channels are given on the 0–255 scale (channel means may be fractional).
/// Achromatic input (all channels equal) has hue 0.
pub fn hue_angle(r: f64, g: f64, b: f64) -> f64 {
    let (r, g, b) = (r / 255.0, g / 255.0, b / 255.0);
    let c_max = r.max(g).max(b);
    let c_min = r.min(g).min(b);
    let delta = c_max - c_min;

    if delta == 0.0 {
        return 0.0;
    }

    let hue = if c_max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if c_max == g {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };

    if hue < 0.0 {
        hue + 360.0
    } else {
        hue
    }
}

/// Convert 0–255 channel values to an sRGB color, clamped to gamut
pub fn channels_to_srgb(r: f64, g: f64, b: f64) -> Srgb {
    Srgb::new(
        (r / 255.0).clamp(0.0, 1.0) as f32,
        (g / 255.0).clamp(0.0, 1.0) as f32,
        (b / 255.0).clamp(0.0, 1.0) as f32,
    )
}

/// Convert sRGB to hexadecimal color string (e.g. "#FF0000")
pub fn srgb_to_hex(srgb: Srgb) -> String {
    let rgb: Srgb<u8> = srgb.into_format();
    format!("#{:02X}{:02X}{:02X}", rgb.red, rgb.green, rgb.blue)
}

/// HSV representation used for diagnostics
pub fn srgb_to_hsv(srgb: Srgb) -> Hsv {
    srgb.into_color()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hue_angle_primaries() {
        assert_eq!(hue_angle(255.0, 0.0, 0.0), 0.0);
        assert_eq!(hue_angle(0.0, 255.0, 0.0), 120.0);
        assert_eq!(hue_angle(0.0, 0.0, 255.0), 240.0);
    }

    #[test]
    fn test_hue_angle_grayscale() {
        assert_eq!(hue_angle(128.0, 128.0, 128.0), 0.0);
        assert_eq!(hue_angle(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_hue_angle_wraps_red_side() {
        // magenta-ish red: g < b with r max lands just under 360
        let hue = hue_angle(255.0, 0.0, 51.0);
        assert!(hue > 340.0 && hue < 360.0, "hue = {}", hue);
    }

    #[test]
    fn test_hue_angle_secondaries() {
        assert!((hue_angle(255.0, 255.0, 0.0) - 60.0).abs() < 1e-9);
        assert!((hue_angle(0.0, 255.0, 255.0) - 180.0).abs() < 1e-9);
        assert!((hue_angle(255.0, 0.0, 255.0) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_hue_angle_agrees_with_palette() {
        for (r, g, b) in [(200.0, 50.0, 50.0), (30.0, 180.0, 90.0), (10.0, 20.0, 240.0)] {
            let hsv = srgb_to_hsv(channels_to_srgb(r, g, b));
            let expected = hsv.hue.into_positive_degrees() as f64;
            assert!((hue_angle(r, g, b) - expected).abs() < 0.01);
        }
    }

    #[test]
    fn test_srgb_to_hex() {
        assert_eq!(srgb_to_hex(Srgb::new(1.0, 0.0, 0.0)), "#FF0000");
        assert_eq!(srgb_to_hex(channels_to_srgb(200.0, 50.0, 50.0)), "#C83232");
    }

    #[test]
    fn test_channels_to_srgb_clamps() {
        let srgb = channels_to_srgb(300.0, -5.0, 127.5);
        assert_eq!(srgb.red, 1.0);
        assert_eq!(srgb.green, 0.0);
        assert!((srgb.blue - 0.5).abs() < 1e-6);
    }
}
