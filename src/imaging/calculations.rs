//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::DimensionSpec;

/// Resolve the requested target dimensions for a source image.
///
/// A nonzero, positive `pct_scale` always wins over explicit width/height.
/// Otherwise the explicit values are returned as-is, where `0` means "infer
/// from the other dimension" (see [`plan_resize`]). Negative or non-finite
/// scales are treated as unset.
///
/// # Examples
/// ```
/// # use imgtool::imaging::{DimensionSpec, resolve_dimensions};
/// let spec = DimensionSpec { pct_scale: 0.5, width: 10, ..Default::default() };
/// assert_eq!(resolve_dimensions((1000, 800), &spec), (500, 400));
/// ```
pub fn resolve_dimensions(source: (u32, u32), spec: &DimensionSpec) -> (u32, u32) {
    let (src_w, src_h) = source;
    let pct = spec.pct_scale;

    if pct.is_finite() && pct > 0.0 {
        let scale = |v: u32| ((v as f64 * pct).round() as u32).max(1);
        return (scale(src_w), scale(src_h));
    }

    (spec.width, spec.height)
}

/// Turn resolved target dimensions into a concrete resize, if one is needed.
///
/// - `(0, 0)` → no resize.
/// - One side `0` → inferred from the other, preserving the source aspect ratio.
/// - Both set → exact, aspect ratio not preserved.
///
/// Returns `None` when the result equals the source size.
pub fn plan_resize(source: (u32, u32), target: (u32, u32)) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    let planned = match target {
        (0, 0) => return None,
        (w, 0) => (w, (w as f64 * src_h as f64 / src_w as f64).round() as u32),
        (0, h) => ((h as f64 * src_w as f64 / src_h as f64).round() as u32, h),
        (w, h) => (w, h),
    };
    let planned = (planned.0.max(1), planned.1.max(1));

    (planned != source).then_some(planned)
}

/// Number of tiles needed along one axis to fully cover `extent`.
///
/// One extra tile beyond the ceiling guarantees coverage even when the
/// extent is an exact multiple of the tile size.
pub fn tile_count(extent: u32, tile: u32) -> u32 {
    extent.div_ceil(tile.max(1)) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(width: u32, height: u32, pct_scale: f64) -> DimensionSpec {
        DimensionSpec {
            width,
            height,
            pct_scale,
            ..Default::default()
        }
    }

    // =========================================================================
    // resolve_dimensions tests
    // =========================================================================

    #[test]
    fn pct_scale_halves_dimensions() {
        assert_eq!(resolve_dimensions((1000, 800), &spec(0, 0, 0.5)), (500, 400));
    }

    #[test]
    fn pct_scale_overrides_explicit_dimensions() {
        assert_eq!(
            resolve_dimensions((1000, 800), &spec(300, 200, 0.5)),
            (500, 400)
        );
    }

    #[test]
    fn pct_scale_rounds_to_nearest() {
        // 333 * 0.5 = 166.5 → 167; 101 * 0.5 = 50.5 → 51
        assert_eq!(resolve_dimensions((333, 101), &spec(0, 0, 0.5)), (167, 51));
    }

    #[test]
    fn pct_scale_matches_rounding_over_unit_interval() {
        let source = (1237, 641);
        for step in 1..=100 {
            let p = step as f64 / 100.0;
            let expected = (
                ((source.0 as f64 * p).round() as u32).max(1),
                ((source.1 as f64 * p).round() as u32).max(1),
            );
            assert_eq!(resolve_dimensions(source, &spec(0, 0, p)), expected, "p={p}");
        }
    }

    #[test]
    fn pct_scale_never_yields_zero() {
        assert_eq!(resolve_dimensions((3, 3), &spec(0, 0, 0.01)), (1, 1));
    }

    #[test]
    fn negative_pct_scale_is_unset() {
        assert_eq!(
            resolve_dimensions((1000, 800), &spec(640, 0, -0.5)),
            (640, 0)
        );
    }

    #[test]
    fn nan_pct_scale_is_unset() {
        assert_eq!(
            resolve_dimensions((1000, 800), &spec(0, 480, f64::NAN)),
            (0, 480)
        );
    }

    #[test]
    fn explicit_dimensions_pass_through() {
        assert_eq!(
            resolve_dimensions((1000, 800), &spec(640, 480, 0.0)),
            (640, 480)
        );
        assert_eq!(resolve_dimensions((1000, 800), &spec(0, 0, 0.0)), (0, 0));
    }

    // =========================================================================
    // plan_resize tests
    // =========================================================================

    #[test]
    fn plan_no_target_means_no_resize() {
        assert_eq!(plan_resize((1000, 800), (0, 0)), None);
    }

    #[test]
    fn plan_infers_height_from_width() {
        // 1000x800 → width 500 → height 400
        assert_eq!(plan_resize((1000, 800), (500, 0)), Some((500, 400)));
    }

    #[test]
    fn plan_infers_width_from_height() {
        // 1000x800 → height 200 → width 250
        assert_eq!(plan_resize((1000, 800), (0, 200)), Some((250, 200)));
    }

    #[test]
    fn plan_both_set_ignores_aspect() {
        assert_eq!(plan_resize((1000, 800), (100, 100)), Some((100, 100)));
    }

    #[test]
    fn plan_same_size_is_skipped() {
        assert_eq!(plan_resize((1000, 800), (1000, 800)), None);
        assert_eq!(plan_resize((1000, 800), (1000, 0)), None);
    }

    #[test]
    fn plan_inferred_side_is_at_least_one_pixel() {
        assert_eq!(plan_resize((1000, 10), (10, 0)), Some((10, 1)));
    }

    // =========================================================================
    // tile_count tests
    // =========================================================================

    #[test]
    fn tile_count_adds_one_beyond_ceiling() {
        assert_eq!(tile_count(100, 30), 5); // ceil(3.33) + 1
        assert_eq!(tile_count(90, 30), 4); // exact multiple still gets a spare
        assert_eq!(tile_count(10, 30), 2);
    }
}
