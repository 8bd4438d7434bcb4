//! End-to-end tests of the pipeline crate chain: features -> stack ->
//! classify -> denoise, and a full batch run from LAS files to the
//! tile index.

use std::fs;
use std::io::Write;
use std::path::Path;

use las::{Builder, Write as LasWrite, Writer};

use classification::{RandomForestModel, StackedFeatures};
use kernel_features::{EdgeMode, FeatureKind};
use pipeline::config::RunConfig;
use pipeline::ops::{classify_stack, feature_bands};
use pipeline::runner;
use raster_io::RasterSource;
use surf_common::BoundingBox;
use surf_test_utils::{amplitude_grid, synthetic_ground_points};

// ============================================================================
// Feature chain on a full-size tile
// ============================================================================

/// One tree, four features (raw + mean + var + diffmean of one band),
/// splitting on the raw band.
fn four_feature_model(dir: &Path) -> RandomForestModel {
    let json = r#"{
        "n_features": 4,
        "classes": [1, 2],
        "trees": [
            {"nodes": [
                {"feature": 0, "threshold": 100.0, "left": 1, "right": 2},
                {"class": 0},
                {"class": 1}
            ]}
        ]
    }"#;
    let path = dir.join("model.json");
    fs::write(&path, json).unwrap();
    RandomForestModel::from_path(&path).unwrap()
}

#[test]
fn test_feature_stack_classify_denoise_chain() {
    let dir = tempfile::tempdir().unwrap();
    // 250x250 amplitude tile at 4 m, origin (727000, 6172000).
    let raw = amplitude_grid(250, 250);

    let bands = feature_bands(
        &raw,
        &[FeatureKind::Mean, FeatureKind::Var, FeatureKind::DiffMean],
        5,
        EdgeMode::Crop,
    )
    .unwrap();
    assert_eq!(bands.len(), 4);
    assert_eq!(bands[0].shape(), (246, 246));
    assert_eq!(bands[0].origin(), (727008.0, 6171992.0));

    let stacked = StackedFeatures::stack(&bands).unwrap();
    assert_eq!(stacked.valid_cell_count(), 246 * 246);

    let model = four_feature_model(dir.path());
    let result = classify_stack(&model, &stacked, true).unwrap();
    assert_eq!(result.classes.shape(), (246, 246));
    assert!(result.classes.data().iter().all(|c| *c == 1 || *c == 2));

    // Single tree: every vote is unanimous.
    let confidence = result.confidence.unwrap();
    assert!(confidence.data().iter().all(|c| *c == 1.0));

    let dense = denoise::denoise(&result.classes).unwrap();
    assert_eq!(dense.shape(), (246, 246));
    assert_eq!(dense.masked_count(), 0);
    assert!(dense.data().iter().all(|c| *c == 1 || *c == 2));
}

#[test]
fn test_classify_rejects_wrong_band_count() {
    let dir = tempfile::tempdir().unwrap();
    let raw = amplitude_grid(20, 20);
    // Only raw + mean: two bands against a four-feature model.
    let bands = feature_bands(&raw, &[FeatureKind::Mean], 5, EdgeMode::Crop).unwrap();
    let stacked = StackedFeatures::stack(&bands).unwrap();
    let model = four_feature_model(dir.path());
    assert!(classify_stack(&model, &stacked, false).is_err());
}

// ============================================================================
// Batch run from LAS to tileindex.json
// ============================================================================

fn write_las_tile(path: &Path, bbox: &BoundingBox) {
    let mut builder = Builder::from((1, 2));
    builder.transforms = las::Vector {
        x: las::Transform {
            scale: 0.01,
            offset: bbox.min_x,
        },
        y: las::Transform {
            scale: 0.01,
            offset: bbox.min_y,
        },
        z: las::Transform {
            scale: 0.01,
            offset: 0.0,
        },
    };
    let header = builder.into_header().unwrap();
    let mut writer = Writer::from_path(path, header).unwrap();
    for p in synthetic_ground_points(bbox, 4.0, 2, 99) {
        let mut point = las::Point {
            x: p.x,
            y: p.y,
            z: p.z,
            scan_angle: p.scan_angle.round(),
            ..Default::default()
        };
        point.classification = las::point::Classification::Ground;
        writer.write(point).unwrap();
    }
}

#[test]
fn test_run_processes_tiles_and_writes_index() {
    let dir = tempfile::tempdir().unwrap();
    let lasdir = dir.path().join("las");
    let outdir = dir.path().join("out");
    fs::create_dir_all(&lasdir).unwrap();

    // One 40x40 m tile: a 10x10 grid at 4 m.
    let bbox = BoundingBox::new(727000.0, 6171960.0, 727040.0, 6172000.0);
    write_las_tile(&lasdir.join("tile.las"), &bbox);

    // dimensions [Z] x (raw + mean) = 2 model features.
    let model_path = dir.path().join("model.json");
    fs::write(
        &model_path,
        r#"{
            "n_features": 2,
            "classes": [1, 2],
            "trees": [
                {"nodes": [
                    {"feature": 0, "threshold": 40.2, "left": 1, "right": 2},
                    {"class": 0},
                    {"class": 1}
                ]}
            ]
        }"#,
    )
    .unwrap();

    let config_path = dir.path().join("run.yaml");
    let mut config_file = fs::File::create(&config_path).unwrap();
    write!(
        config_file,
        r#"
outdir: {outdir}
lasdir: {lasdir}
resolution: 4.0
model: {model}
neighborhood: 3
edge_mode: crop
dimensions: [Z]
features: [mean]
prob: true
tiles:
  - name: t1
    bbox: "727000,6171960,727040,6172000"
"#,
        outdir = outdir.display(),
        lasdir = lasdir.display(),
        model = model_path.display(),
    )
    .unwrap();

    let config = RunConfig::from_path(&config_path).unwrap();
    let report = runner::run(&config).unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.outputs.len(), 1);

    // 10x10 grid cropped by n=3 -> 8x8, denoised to dense labels.
    let classes = RasterSource::open(&report.outputs[0].classification).unwrap();
    assert_eq!(classes.shape(), (8, 8));
    let grid = classes.read::<u8>().unwrap();
    assert!(grid.data().iter().all(|c| *c == 1 || *c == 2));

    let confidence_path = report.outputs[0].confidence.as_ref().unwrap();
    assert!(confidence_path.exists());

    let index: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report.index_path).unwrap()).unwrap();
    assert_eq!(index["resolution"], 4.0);
    assert_eq!(index["tiles"][0]["name"], "t1");
    assert_eq!(
        index["tiles"][0]["path"],
        "t1_classification.tif"
    );
}

#[test]
fn test_run_reports_model_band_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let lasdir = dir.path().join("las");
    let outdir = dir.path().join("out");
    fs::create_dir_all(&lasdir).unwrap();
    let bbox = BoundingBox::new(727000.0, 6171960.0, 727040.0, 6172000.0);
    write_las_tile(&lasdir.join("tile.las"), &bbox);

    let model_path = dir.path().join("model.json");
    fs::write(
        &model_path,
        r#"{"n_features": 7, "classes": [1], "trees": [{"nodes": [{"class": 0}]}]}"#,
    )
    .unwrap();

    let config_path = dir.path().join("run.yaml");
    let mut config_file = fs::File::create(&config_path).unwrap();
    write!(
        config_file,
        r#"
outdir: {outdir}
lasdir: {lasdir}
resolution: 4.0
model: {model}
neighborhood: 3
edge_mode: crop
dimensions: [Z]
features: [mean]
tiles:
  - name: t1
    bbox: "727000,6171960,727040,6172000"
"#,
        outdir = outdir.display(),
        lasdir = lasdir.display(),
        model = model_path.display(),
    )
    .unwrap();

    let config = RunConfig::from_path(&config_path).unwrap();
    let err = runner::run(&config).unwrap_err();
    assert!(err.to_string().contains("model expects 7"));
}
