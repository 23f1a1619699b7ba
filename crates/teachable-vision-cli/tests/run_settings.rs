//! Settings resolution and an end-to-end replay through the capture loop.

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, Rgb, RgbImage};
use serde_json::Value;

use teachable_vision::{
    bind, Classifier, EmbeddingEngine, JsonLinesPresenter, Label, Mode, ModeCell, Preprocess,
    VisionError, YieldScheduler,
};
use teachable_vision_cli::config::{
    frame_source_for, ConfigError, FrameSourceSpec, OutputFormat,
};
use teachable_vision_cli::RunArgs;

// ─────────────────────── helpers ───────────────────────

fn write_frames(dir: &Path, colors: &[[u8; 3]]) {
    for (i, color) in colors.iter().enumerate() {
        let img = RgbImage::from_pixel(24, 24, Rgb(*color));
        DynamicImage::ImageRgb8(img)
            .save(dir.join(format!("frame_{i:03}.png")))
            .unwrap();
    }
}

fn args_for(dir: &Path) -> RunArgs {
    RunArgs {
        frames: Some(dir.display().to_string()),
        model: Some("/nonexistent/model.onnx".to_string()),
        no_input: true,
        ..RunArgs::default()
    }
}

// ─────────────────────── settings ───────────────────────

#[test]
fn defaults_match_the_demo() {
    let dir = tempfile::tempdir().unwrap();
    let settings = RunArgs {
        frames: Some(dir.path().display().to_string()),
        model: Some("/nonexistent/model.onnx".to_string()),
        ..RunArgs::default()
    }
    .into_settings()
    .unwrap();

    assert_eq!(settings.loop_config.num_classes, 5);
    assert_eq!(settings.loop_config.top_k, 30);
    assert_eq!(settings.loop_config.frame_rate, 60);
    assert_eq!(settings.loop_config.max_frames, None);
    assert_eq!(settings.output, OutputFormat::Text);
    assert!(settings.thumbnails);
    assert!(settings.interactive);
}

#[test]
fn no_frames_dir_means_synthetic_frames() {
    assert_eq!(
        frame_source_for(None),
        FrameSourceSpec::Synthetic {
            width: 500,
            height: 500,
            frames_per_scene: 90,
        }
    );
    assert!(frame_source_for(None).open().is_ok());
}

#[test]
fn explicit_frames_dir_selects_directory_source() {
    let dir = tempfile::tempdir().unwrap();
    write_frames(dir.path(), &[[10, 20, 30]]);

    let settings = args_for(dir.path()).into_settings().unwrap();
    assert_eq!(
        settings.source,
        FrameSourceSpec::Directory {
            path: dir.path().to_path_buf()
        }
    );
    assert_eq!(settings.model_path.as_deref(), Some("/nonexistent/model.onnx"));
    assert!(!settings.interactive);
    assert!(settings.source.open().is_ok());
}

#[tokio::test]
async fn missing_frames_dir_is_capture_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let settings = args_for(&dir.path().join("nope")).into_settings().unwrap();

    let source = settings.source.clone();
    let result = bind(
        settings.loop_config.clone(),
        Arc::new(ModeCell::new()),
        JsonLinesPresenter::new(Vec::new()),
        async { EmbeddingEngine::new(Some("/nonexistent/model.onnx"), Preprocess::MobileNet) },
        async move { source.open() },
    )
    .await;

    assert!(matches!(result, Err(VisionError::CaptureUnavailable(_))));
}

#[test]
fn class_count_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    for classes in [0, 10] {
        let err = RunArgs {
            classes,
            ..args_for(dir.path())
        }
        .into_settings()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}

#[test]
fn settings_serialize_for_info() {
    let dir = tempfile::tempdir().unwrap();
    let settings = RunArgs {
        top_k: 7,
        output: OutputFormat::Json,
        ..args_for(dir.path())
    }
    .into_settings()
    .unwrap();

    let json: Value = serde_json::to_value(&settings).unwrap();
    assert_eq!(json["loop"]["top_k"], 7);
    assert_eq!(json["source"]["type"], "directory");
    assert_eq!(json["output"], "json");
    assert_eq!(json["preprocess"], "mobile_net");
}

#[test]
fn empty_frames_dir_fails_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let settings = args_for(dir.path()).into_settings().unwrap();
    assert!(settings.source.open().is_err());
}

// ─────────────────────── end to end ───────────────────────

#[tokio::test]
async fn replayed_frames_train_and_predict() {
    let dir = tempfile::tempdir().unwrap();
    write_frames(dir.path(), &[[230, 20, 20], [225, 30, 25], [20, 20, 230]]);

    let settings = RunArgs {
        max_frames: Some(6),
        output: OutputFormat::Json,
        no_thumbnails: true,
        ..args_for(dir.path())
    }
    .into_settings()
    .unwrap();

    let mode = Arc::new(ModeCell::new());
    let model_path = settings.model_path.clone();
    let source = settings.source.clone();
    let mut capture = bind(
        settings.loop_config.clone(),
        Arc::clone(&mode),
        JsonLinesPresenter::new(Vec::new()).with_thumbnails(settings.thumbnails),
        async move { EmbeddingEngine::new(model_path.as_deref(), Preprocess::MobileNet) },
        async move { source.open() },
    )
    .await
    .unwrap();

    // Teach the two red frames as class 1, leave the blue one idle.
    mode.set(Mode::Training(Label(0)));
    capture.step().await.unwrap();
    capture.step().await.unwrap();
    mode.set(Mode::Idle);

    let frames = capture.run(&mut YieldScheduler).await.unwrap();
    assert_eq!(frames, 6);
    assert_eq!(capture.classifier().total_examples(), 2);

    let output = String::from_utf8(capture.presenter().get_ref().clone()).unwrap();
    let events: Vec<Value> = output
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let examples = events.iter().filter(|e| e["event"] == "example").count();
    let predictions: Vec<&Value> = events.iter().filter(|e| e["event"] == "prediction").collect();
    assert_eq!(examples, 2);
    assert_eq!(predictions.len(), 8);
    assert!(predictions
        .iter()
        .all(|p| p["top_label"] == 0 && p["classes"].as_array().unwrap().len() == 5));
}
