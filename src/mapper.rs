//! Conversions between stage space (percent of the logical stage) and
//! bitmap space (pixels of a concrete image). Pure math: callers
//! guarantee nonzero image dimensions, nothing here rounds until the
//! final pixel write.

use crate::core::{BitmapPoint, PixelSize, StagePoint, StageSize};

/// The rectangle a base image occupies inside the logical stage under
/// the contain fit rule. Derived on demand, never stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageGeometry {
    pub stage: StageSize,
    pub render_width: f64,
    pub render_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Fits `image` inside `container` without cropping: the largest
/// rectangle with the image's aspect ratio, centered, letterboxed on
/// the constrained axis.
///
/// When `image_ratio > container_ratio` the image spans the full
/// container width and is letterboxed vertically; otherwise it spans
/// the full height and is letterboxed horizontally.
pub fn fit_contain(container: StageSize, image: PixelSize) -> StageGeometry {
    let image_ratio = image.aspect_ratio();
    let container_ratio = container.aspect_ratio();

    let (render_width, render_height) = if image_ratio > container_ratio {
        (container.width, container.width / image_ratio)
    } else {
        (container.height * image_ratio, container.height)
    };

    StageGeometry {
        stage: container,
        render_width,
        render_height,
        offset_x: (container.width - render_width) / 2.0,
        offset_y: (container.height - render_height) / 2.0,
    }
}

/// Maps a stage-percent position onto a target bitmap:
/// `((pct/100 * stage_size) - letterbox_offset) / fitted_size * target_size`.
///
/// The intermediate hop through the fitted rectangle is what keeps
/// interactive placement and export agreed when the stage and the
/// target bitmap differ in absolute size.
pub fn stage_to_bitmap(p: StagePoint, geom: &StageGeometry, target: PixelSize) -> BitmapPoint {
    let stage_x = p.x / 100.0 * geom.stage.width;
    let stage_y = p.y / 100.0 * geom.stage.height;
    BitmapPoint::new(
        (stage_x - geom.offset_x) / geom.render_width * f64::from(target.width),
        (stage_y - geom.offset_y) / geom.render_height * f64::from(target.height),
    )
}

/// Inverse of [`stage_to_bitmap`].
pub fn bitmap_to_stage(p: BitmapPoint, geom: &StageGeometry, target: PixelSize) -> StagePoint {
    let stage_x = p.x / f64::from(target.width) * geom.render_width + geom.offset_x;
    let stage_y = p.y / f64::from(target.height) * geom.render_height + geom.offset_y;
    StagePoint::new(
        stage_x / geom.stage.width * 100.0,
        stage_y / geom.stage.height * 100.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tall_image_is_width_constrained() {
        // 800x1000 (ratio 0.8) inside 600x800 (ratio 0.75).
        let geom = fit_contain(
            StageSize::REFERENCE,
            PixelSize {
                width: 800,
                height: 1000,
            },
        );
        assert_eq!(geom.render_width, 600.0);
        assert_eq!(geom.render_height, 750.0);
        assert_eq!(geom.offset_x, 0.0);
        assert_eq!(geom.offset_y, 25.0);
    }

    #[test]
    fn narrow_image_is_height_constrained() {
        let geom = fit_contain(
            StageSize::REFERENCE,
            PixelSize {
                width: 300,
                height: 800,
            },
        );
        assert_eq!(geom.render_width, 300.0);
        assert_eq!(geom.render_height, 800.0);
        assert_eq!(geom.offset_x, 150.0);
        assert_eq!(geom.offset_y, 0.0);
    }

    #[test]
    fn fit_contain_is_deterministic() {
        let image = PixelSize {
            width: 1280,
            height: 720,
        };
        let a = fit_contain(StageSize::REFERENCE, image);
        let b = fit_contain(StageSize::REFERENCE, image);
        assert_eq!(a, b);
    }

    #[test]
    fn center_maps_to_bitmap_center() {
        let target = PixelSize {
            width: 1000,
            height: 1000,
        };
        let geom = fit_contain(StageSize::REFERENCE, target);
        let p = stage_to_bitmap(StagePoint::new(50.0, 50.0), &geom, target);
        assert_eq!(p, BitmapPoint::new(500.0, 500.0));
    }

    #[test]
    fn stage_bitmap_roundtrip_is_exact_within_tolerance() {
        let target = PixelSize {
            width: 1432,
            height: 1887,
        };
        let geom = fit_contain(StageSize::REFERENCE, target);
        for &(x, y) in &[(0.0, 0.0), (12.5, 88.25), (50.0, 50.0), (100.0, 100.0)] {
            let there = stage_to_bitmap(StagePoint::new(x, y), &geom, target);
            let back = bitmap_to_stage(there, &geom, target);
            assert!((back.x - x).abs() < 1e-6, "x drifted: {} -> {}", x, back.x);
            assert!((back.y - y).abs() < 1e-6, "y drifted: {} -> {}", y, back.y);
        }
    }
}
