//! Face-mesh indices used by the extractors, plus the guarded ratio they share.

pub const NOSE_TIP: usize = 1;
pub const FOREHEAD: usize = 10;
pub const CHIN: usize = 152;
/// Face outline at cheek height, image-left and image-right
pub const FACE_LEFT: usize = 234;
pub const FACE_RIGHT: usize = 454;

/// Corners, upper lid and lower lid of one eye, plus its six-point contour
/// and iris center.
#[derive(Debug, Clone, Copy)]
pub struct EyeIndices {
    pub corner_a: usize,
    pub corner_b: usize,
    pub lid_top: usize,
    pub lid_bottom: usize,
    pub contour: [usize; 6],
    pub iris_center: usize,
}

pub const LEFT_EYE: EyeIndices = EyeIndices {
    corner_a: 33,
    corner_b: 133,
    lid_top: 159,
    lid_bottom: 145,
    contour: [33, 160, 158, 133, 153, 144],
    iris_center: 468,
};

pub const RIGHT_EYE: EyeIndices = EyeIndices {
    corner_a: 362,
    corner_b: 263,
    lid_top: 386,
    lid_bottom: 374,
    contour: [362, 385, 387, 263, 373, 380],
    iris_center: 473,
};

/// Iris ring points following each center
pub const LEFT_IRIS_RING: [usize; 4] = [469, 470, 471, 472];
pub const RIGHT_IRIS_RING: [usize; 4] = [474, 475, 476, 477];

/// Returned for a ratio whose span collapsed
pub const NEUTRAL_RATIO: f32 = 0.5;

const EPSILON: f32 = 1e-6;
const DEGENERATE_SPAN: f32 = 1e-4;

/// `numerator / denominator`, never infinite or NaN.
pub fn guarded_ratio(numerator: f32, denominator: f32) -> f32 {
    if !numerator.is_finite() || !denominator.is_finite() || denominator.abs() < DEGENERATE_SPAN {
        return NEUTRAL_RATIO;
    }
    numerator / (denominator + EPSILON.copysign(denominator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapsed_span_is_neutral() {
        assert_eq!(guarded_ratio(0.3, 0.0), NEUTRAL_RATIO);
        assert_eq!(guarded_ratio(0.3, 1e-7), NEUTRAL_RATIO);
        assert_eq!(guarded_ratio(f32::INFINITY, 0.2), NEUTRAL_RATIO);
    }

    #[test]
    fn regular_span_divides() {
        assert!((guarded_ratio(0.01, 0.02) - 0.5).abs() < 1e-3);
        assert!((guarded_ratio(-0.03, -0.02) - 1.5).abs() < 1e-3);
    }
}
