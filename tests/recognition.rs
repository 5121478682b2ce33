use std::sync::Arc;

use nalgebra::Vector3;
use pairvote::{
    RecognitionError, RecognitionMode, RecognitionSettings, Recognizer, RigidTransform,
    SurfaceNormal, SurfacePoint,
};

/// An asymmetric wavy patch, dense enough to voxelize cleanly.
fn bracket_cloud() -> (Vec<SurfacePoint>, Vec<SurfaceNormal>) {
    let mut points = Vec::new();
    let mut normals = Vec::new();
    let step = 0.04;
    for i in 0..=50 {
        for j in 0..=37 {
            let x = i as f64 * step;
            let y = j as f64 * step;
            let z = 0.3 * (2.0 * x).sin() + 0.2 * (3.0 * y).cos();
            points.push(SurfacePoint::new(x, y, z));
            // Upward-facing normal of z = f(x, y).
            normals.push(
                SurfaceNormal::new(-0.6 * (2.0 * x).cos(), 0.6 * (3.0 * y).sin(), 1.0).normalize(),
            );
        }
    }
    (points, normals)
}

fn bracket_settings() -> RecognitionSettings {
    let mut settings = RecognitionSettings::new(0.5, 0.08);
    settings.seed = Some(7);
    settings
}

fn apply(transform: &RigidTransform, points: &[SurfacePoint], normals: &[SurfaceNormal]) -> (Vec<SurfacePoint>, Vec<SurfaceNormal>) {
    let moved_points = points.iter().map(|p| transform.transform_point(p)).collect();
    let moved_normals = normals.iter().map(|n| transform.rotate_vector(n)).collect();
    (moved_points, moved_normals)
}

#[test]
fn duplicate_model_names_are_rejected() {
    let (points, normals) = bracket_cloud();
    let mut recognizer = Recognizer::new(bracket_settings());
    recognizer.add_model(&points, &normals, "cup", None).unwrap();
    let result = recognizer.add_model(&points, &normals, "cup", None);
    assert!(matches!(
        result,
        Err(RecognitionError::DuplicateModelName(name)) if name == "cup"
    ));
    assert!(recognizer.model("cup").is_some());
}

#[test]
fn recognizing_with_no_models_succeeds_with_no_outputs() {
    let (points, normals) = bracket_cloud();
    let mut recognizer = Recognizer::new(bracket_settings());
    let outputs = recognizer.recognize(&points, &normals, 0.99).unwrap();
    assert!(outputs.is_empty());
}

#[test]
fn sample_pairs_only_exposes_pairs_at_the_pair_width() {
    let (points, normals) = bracket_cloud();
    let mut settings = bracket_settings();
    settings.mode = RecognitionMode::SamplePairsOnly;
    let pair_width = settings.pair_width;
    let slack = settings.voxel_size * 3f64.sqrt();

    let mut recognizer = Recognizer::new(settings);
    recognizer.add_model(&points, &normals, "bracket", None).unwrap();
    let outputs = recognizer.recognize(&points, &normals, 0.99).unwrap();
    assert!(outputs.is_empty());
    assert!(!recognizer.sampled_pairs().is_empty());
    for pair in recognizer.sampled_pairs() {
        let d = (pair.p2 - pair.p1).norm();
        assert!(
            (d - pair_width).abs() <= slack,
            "pair separation {} too far from {}",
            d,
            pair_width
        );
    }
}

#[test]
fn recognizes_a_rigidly_moved_instance() {
    let (points, normals) = bracket_cloud();
    let truth = RigidTransform::from_axis_angle(
        Vector3::new(0.2, 0.3, 0.9).normalize() * 0.35,
        Vector3::new(0.4, -0.3, 0.25),
    );
    let (scene_points, scene_normals) = apply(&truth, &points, &normals);

    let mut recognizer = Recognizer::new(bracket_settings());
    recognizer
        .add_model(&points, &normals, "bracket", Some(Arc::new(7usize)))
        .unwrap();
    let outputs = recognizer
        .recognize(&scene_points, &scene_normals, 0.99)
        .unwrap();

    assert_eq!(outputs.len(), 1, "expected a single surviving instance");
    let hit = &outputs[0];
    assert_eq!(hit.object_name, "bracket");
    assert!(hit.confidence > 0.5, "confidence {}", hit.confidence);

    // Pose accuracy is limited by the pose-space cell widths.
    let relative_rotation = truth.rotation.transpose() * hit.transform.rotation;
    let rotation_error = RigidTransform::new(relative_rotation, Vector3::zeros())
        .axis_angle()
        .norm();
    assert!(rotation_error < 0.15, "rotation error {}", rotation_error);
    let translation_error = (hit.transform.translation - truth.translation).norm();
    assert!(
        translation_error < 0.35,
        "translation error {}",
        translation_error
    );

    let tag = hit
        .user_data
        .as_ref()
        .and_then(|d| d.downcast_ref::<usize>())
        .copied();
    assert_eq!(tag, Some(7));
}
