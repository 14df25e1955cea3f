//! World-to-radar coordinate translation.
//!
//! Pure functions over a validated [`MapCalibration`]. The radar image's
//! Y axis points down while the world's points up, so Y is flipped
//! around the calibration origin. No rounding happens here; quantizing
//! to whole pixels is up to whoever draws the image.

use radar_types::{MapCalibration, PixelPosition, WorldPosition};

/// Translate a world position to origin-relative image coordinates,
/// still in world units.
pub fn translate(pos: WorldPosition, cal: &MapCalibration) -> PixelPosition {
    PixelPosition::new(pos.x - cal.origin_x(), cal.origin_y() - pos.y)
}

/// Translate and scale a world position to radar-image pixels.
///
/// Division is safe because [`MapCalibration`] guarantees `scale > 0`.
pub fn translate_scaled(pos: WorldPosition, cal: &MapCalibration) -> PixelPosition {
    let unscaled = translate(pos, cal);
    PixelPosition::new(unscaled.x / cal.scale(), unscaled.y / cal.scale())
}

/// Inverse of [`translate`].
pub fn untranslate(pixel: PixelPosition, cal: &MapCalibration) -> WorldPosition {
    WorldPosition::new(pixel.x + cal.origin_x(), cal.origin_y() - pixel.y)
}

/// Inverse of [`translate_scaled`].
pub fn untranslate_scaled(pixel: PixelPosition, cal: &MapCalibration) -> WorldPosition {
    untranslate(
        PixelPosition::new(pixel.x * cal.scale(), pixel.y * cal.scale()),
        cal,
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;

    fn dust2() -> MapCalibration {
        MapCalibration::new("de_dust2", -2476.0, 3239.0, 4.4).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn translates_known_point() {
        let pixel = translate(WorldPosition::new(100.0, 200.0), &dust2());
        assert_eq!(pixel, PixelPosition::new(2576.0, 3039.0));
    }

    #[test]
    fn translates_and_scales_known_point() {
        let pixel = translate_scaled(WorldPosition::new(100.0, 200.0), &dust2());
        assert!(close(pixel.x, 2576.0 / 4.4));
        assert!(close(pixel.y, 3039.0 / 4.4));
        assert!((pixel.x - 585.454_545).abs() < 1e-5);
        assert!((pixel.y - 690.681_818).abs() < 1e-5);
    }

    #[test]
    fn translation_is_bit_identical_across_calls() {
        let cal = dust2();
        let pos = WorldPosition::new(-1234.567, 89.012_3);
        let a = translate_scaled(pos, &cal);
        let b = translate_scaled(pos, &cal);
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
    }

    #[test]
    fn round_trips_within_epsilon() {
        let cal = dust2();
        let samples = [
            WorldPosition::new(0.0, 0.0),
            WorldPosition::new(100.0, 200.0),
            WorldPosition::new(-2476.0, 3239.0),
            WorldPosition::new(1753.25, -1120.5),
        ];
        for pos in samples {
            let back = untranslate(translate(pos, &cal), &cal);
            assert!(close(back.x, pos.x) && close(back.y, pos.y), "{pos:?} -> {back:?}");

            let back = untranslate_scaled(translate_scaled(pos, &cal), &cal);
            assert!(close(back.x, pos.x) && close(back.y, pos.y), "{pos:?} -> {back:?}");
        }
    }

    #[test]
    fn higher_world_y_is_higher_on_image() {
        let cal = dust2();
        let low = translate_scaled(WorldPosition::new(10.0, 100.0), &cal);
        let high = translate_scaled(WorldPosition::new(10.0, 150.0), &cal);
        assert!(high.y < low.y);
        assert_eq!(high.x, low.x);
    }

    #[test]
    fn doubling_scale_halves_output() {
        let pos = WorldPosition::new(321.0, -654.0);
        let base = MapCalibration::new("de_dust2", -2476.0, 3239.0, 2.0).unwrap();
        let doubled = MapCalibration::new("de_dust2", -2476.0, 3239.0, 4.0).unwrap();

        let a = translate_scaled(pos, &base);
        let b = translate_scaled(pos, &doubled);
        assert!(close(b.x, a.x / 2.0));
        assert!(close(b.y, a.y / 2.0));
    }
}
