//! Head pose from the mesh outline.

use super::landmarks::{guarded_ratio, CHIN, FACE_LEFT, FACE_RIGHT, FOREHEAD, NOSE_TIP};
use crate::types::{HeadPoseMetrics, LandmarkFrame};

pub fn analyze_head_pose(landmarks: &LandmarkFrame) -> HeadPoseMetrics {
    let nose = landmarks[NOSE_TIP];
    let chin = landmarks[CHIN];
    let forehead = landmarks[FOREHEAD];
    let left = landmarks[FACE_LEFT];
    let right = landmarks[FACE_RIGHT];

    HeadPoseMetrics {
        nose_y: nose.y,
        face_ratio: guarded_ratio(chin.y - nose.y, nose.y - forehead.y),
        horizontal_rotation: guarded_ratio(nose.x - left.x, right.x - left.x),
        face_center_x: (left.x + right.x) / 2.0,
        face_center_y: (forehead.y + chin.y) / 2.0,
    }
}
