//! Upload pipeline integration tests.
//!
//! Run with: `cargo test -p vitrine-processing --test pipeline_test`

mod helpers;

use helpers::fixtures;
use helpers::{
    bounded_profile, pipeline, png_file, profile, CountingPrompt, GatedPrompt, RecordingSink,
};
use std::sync::Arc;
use vitrine_core::{
    CropCancelPolicy, CropSettings, ErrorMetadata, OutputFormat, PipelineConfig, ProfileId,
    QualityPolicy, SourceFile, UploadError, ValidationFailure,
};
use vitrine_processing::{CenteredCrop, DeclineCrop, Finalized, FixedCrop, UploadPipeline};

#[tokio::test]
async fn test_oversized_file_rejected_before_decode() {
    let prompt = Arc::new(CountingPrompt::default());
    let mut pipeline = pipeline(profile(ProfileId::Product), prompt.clone());

    let data = fixtures::create_oversized_jpeg(6 * 1024 * 1024);
    let report = pipeline
        .process_files(vec![SourceFile::new("huge.jpg", "image/jpeg", data)])
        .await
        .unwrap();

    let err = report.outcomes[0].result.as_ref().unwrap_err();
    assert_eq!(
        err.validation_failures(),
        &[ValidationFailure::FileTooLarge {
            size: 6 * 1024 * 1024,
            max: 5 * 1024 * 1024
        }]
    );
    assert_eq!(err.error_code(), "VALIDATION_FAILED");
    assert_eq!(prompt.calls(), 0);
}

#[tokio::test]
async fn test_landscape_fits_into_square_bounds() {
    let mut pipeline = pipeline(bounded_profile(800, 800), Arc::new(DeclineCrop));

    let report = pipeline
        .process_files(vec![png_file("wide.png", 3000, 2000)])
        .await
        .unwrap();

    let processed = report.successes().next().unwrap();
    assert_eq!((processed.result.width, processed.result.height), (800, 533));
    assert_eq!(processed.content_type(), "image/jpeg");
}

#[tokio::test]
async fn test_never_upscales() {
    let mut pipeline = pipeline(profile(ProfileId::Gallery), Arc::new(DeclineCrop));

    let report = pipeline
        .process_files(vec![png_file("small.png", 300, 200)])
        .await
        .unwrap();

    let processed = report.successes().next().unwrap();
    assert_eq!((processed.result.width, processed.result.height), (300, 200));
    assert_eq!(processed.result.format, OutputFormat::WebP);
}

#[tokio::test]
async fn test_required_crop_cancelled_yields_crop_incomplete() {
    let mut pipeline = pipeline(profile(ProfileId::Avatar), Arc::new(DeclineCrop));

    let ids = pipeline
        .add_files(vec![png_file("me.png", 500, 400)])
        .unwrap();
    let report = pipeline.process_all().await;

    assert!(matches!(
        report.outcomes[0].result,
        Err(UploadError::CropIncomplete)
    ));
    let pending = pipeline.get(ids[0]).unwrap();
    assert!(!pending.is_processed());
    assert!(pending.result().is_none());
    assert!(pending.output_url().is_none());
}

#[tokio::test]
async fn test_explicit_crop_recovers_from_crop_incomplete() {
    let mut pipeline = pipeline(profile(ProfileId::Avatar), Arc::new(DeclineCrop));

    let ids = pipeline
        .add_files(vec![png_file("me.png", 1500, 1000)])
        .unwrap();
    assert!(pipeline.process_all().await.outcomes[0].result.is_err());

    pipeline
        .set_crop(ids[0], CropSettings::new(250, 0, 1000, 1000))
        .unwrap();
    let report = pipeline.process_all().await;

    let processed = report.successes().next().unwrap();
    assert_eq!((processed.result.width, processed.result.height), (400, 400));
    assert_eq!(processed.crop, Some(CropSettings::new(250, 0, 1000, 1000)));
}

#[tokio::test]
async fn test_prompted_crop_is_applied_and_recorded() {
    let crop = CropSettings::new(100, 50, 800, 800);
    let mut pipeline = pipeline(profile(ProfileId::Product), Arc::new(FixedCrop(crop)));

    let report = pipeline
        .process_files(vec![png_file("shoe.png", 1600, 1000)])
        .await
        .unwrap();

    let processed = report.successes().next().unwrap();
    assert_eq!(processed.crop, Some(crop));
    assert_eq!((processed.result.width, processed.result.height), (800, 800));
}

#[tokio::test]
async fn test_optional_crop_cancel_policies() {
    let mut fallback = pipeline(profile(ProfileId::Product), Arc::new(DeclineCrop));
    let report = fallback
        .process_files(vec![png_file("shoe.png", 1600, 800)])
        .await
        .unwrap();
    let processed = report.successes().next().unwrap();
    assert_eq!((processed.result.width, processed.result.height), (1200, 600));
    assert_eq!(processed.crop, None);

    let config = PipelineConfig {
        crop_cancel: CropCancelPolicy::Discard,
        ..PipelineConfig::default()
    };
    let mut discard =
        UploadPipeline::new(profile(ProfileId::Product), config, Arc::new(DeclineCrop));
    let report = discard
        .process_files(vec![png_file("shoe.png", 1600, 800)])
        .await
        .unwrap();
    assert!(matches!(
        report.outcomes[0].result,
        Err(UploadError::CropIncomplete)
    ));
}

#[tokio::test]
async fn test_batch_isolates_failures_in_submission_order() {
    let mut pipeline = pipeline(profile(ProfileId::Gallery), Arc::new(DeclineCrop));

    let files = vec![
        png_file("1.png", 40, 40),
        png_file("2.png", 40, 40),
        SourceFile::new("3.bmp", "image/bmp", vec![b'B', b'M', 0, 0, 0, 0]),
        png_file("4.png", 40, 40),
        png_file("5.png", 40, 40),
    ];
    let report = pipeline.process_files(files).await.unwrap();

    assert_eq!(report.len(), 5);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.failed(), 1);

    let names: Vec<&str> = report.outcomes.iter().map(|o| o.file_name.as_str()).collect();
    assert_eq!(names, ["1.png", "2.png", "3.bmp", "4.png", "5.png"]);

    let (failed, err) = report.failures().next().unwrap();
    assert_eq!(failed.file_name, "3.bmp");
    assert!(matches!(
        err.validation_failures()[0],
        ValidationFailure::UnsupportedFormat { .. }
    ));
}

#[tokio::test]
async fn test_photo_compression_shrinks_and_reports_ratio() {
    let mut pipeline = pipeline(profile(ProfileId::Product), Arc::new(CenteredCrop));

    let data = fixtures::create_noisy_photo_png(600, 600);
    let original = data.len() as u64;
    let report = pipeline
        .process_files(vec![SourceFile::new("photo.png", "image/png", data)])
        .await
        .unwrap();

    let processed = report.successes().next().unwrap();
    let stats = processed.result.stats;
    assert_eq!(stats.original_size, original);
    assert_eq!(stats.compressed_size, processed.result.data.len() as u64);
    assert!(stats.compressed_size < stats.original_size);
    let expected = (original as f64 - stats.compressed_size as f64) / original as f64;
    assert!((stats.compression_ratio - expected).abs() < 1e-9);
    assert_eq!(processed.result.quality, 85);
}

#[tokio::test]
async fn test_size_heuristic_quality_policy() {
    let config = PipelineConfig {
        quality_policy: QualityPolicy::SizeHeuristic,
        ..PipelineConfig::default()
    };
    let mut pipeline =
        UploadPipeline::new(profile(ProfileId::Default), config, Arc::new(DeclineCrop));

    let report = pipeline
        .process_files(vec![png_file("small.png", 64, 64)])
        .await
        .unwrap();
    assert_eq!(report.successes().next().unwrap().result.quality, 90);
}

#[tokio::test]
async fn test_logo_auto_format_keeps_transparency() {
    let mut pipeline = pipeline(profile(ProfileId::Logo), Arc::new(DeclineCrop));

    let report = pipeline
        .process_files(vec![SourceFile::new(
            "logo.png",
            "image/png",
            fixtures::create_transparent_png(1024, 256),
        )])
        .await
        .unwrap();

    let processed = report.successes().next().unwrap();
    assert_eq!(processed.result.format, OutputFormat::Png);
    assert_eq!((processed.result.width, processed.result.height), (512, 128));
    assert!(processed.data_url().starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_exif_orientation_applied_before_crop() {
    let prompt = Arc::new(CountingPrompt::default());
    let mut pipeline = pipeline(profile(ProfileId::Product), prompt.clone());

    let data = fixtures::create_jpeg_with_orientation(400, 200, 6);
    let report = pipeline
        .process_files(vec![SourceFile::new("phone.jpg", "image/jpeg", data)])
        .await
        .unwrap();

    let processed = report.successes().next().unwrap();
    // Upright image is 200x400; the centered square covers its full width
    assert_eq!(processed.crop, Some(CropSettings::new(0, 100, 200, 200)));
    assert_eq!((processed.result.width, processed.result.height), (200, 200));
    assert_eq!(prompt.calls(), 1);
}

#[tokio::test]
async fn test_object_urls_follow_processed_images() {
    let mut pipeline = pipeline(profile(ProfileId::Gallery), Arc::new(DeclineCrop));

    let report = pipeline
        .process_files(vec![png_file("a.png", 20, 20), png_file("b.png", 20, 20)])
        .await
        .unwrap();

    let tracker = pipeline.tracker().clone();
    for processed in report.successes() {
        let blob = tracker.resolve(&processed.object_url).unwrap();
        assert_eq!(blob.content_type, "image/webp");
        assert_eq!(blob.data, processed.result.data);
    }
    assert_eq!(tracker.live_count(), 4);

    pipeline.remove(report.outcomes[0].id).unwrap();
    assert_eq!(tracker.live_count(), 2);

    assert_eq!(tracker.revoke_all(), 2);
    assert_eq!(tracker.revoke_all(), 0);
    assert_eq!(tracker.revoked_total(), 4);
}

#[tokio::test]
async fn test_teardown_discards_in_flight_results() {
    let prompt = Arc::new(GatedPrompt::default());
    let mut pipeline = pipeline(profile(ProfileId::Product), prompt.clone());
    pipeline
        .add_files(vec![png_file("slow.png", 300, 300)])
        .unwrap();

    let handle = pipeline.teardown_handle();
    let tracker = pipeline.tracker().clone();

    let (report, released) = tokio::join!(pipeline.process_all(), async {
        prompt.asked.notified().await;
        let released = handle.teardown();
        prompt.release.notify_one();
        released
    });

    assert_eq!(released, 1);
    assert!(matches!(
        report.outcomes[0].result,
        Err(UploadError::Cancelled)
    ));
    assert_eq!(tracker.live_count(), 0);
    assert!(pipeline.pending().is_empty());
    assert!(!handle.is_live());
}

#[tokio::test]
async fn test_finalize_single_profile() {
    let mut pipeline = pipeline(profile(ProfileId::Avatar), Arc::new(CenteredCrop));
    pipeline
        .add_files(vec![png_file("me.png", 900, 600)])
        .unwrap();

    let sink = RecordingSink::default();
    pipeline.finalize(&sink).await.unwrap();

    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    match &delivered[0] {
        (ProfileId::Avatar, Finalized::Single(outcome)) => {
            let processed = outcome.result.as_ref().unwrap();
            assert_eq!((processed.result.width, processed.result.height), (400, 400));
        }
        other => panic!("unexpected delivery: {:?}", other),
    }
}

#[tokio::test]
async fn test_finalize_single_profile_reports_file_error() {
    let mut pipeline = pipeline(profile(ProfileId::Banner), Arc::new(DeclineCrop));
    pipeline
        .add_files(vec![png_file("hero.png", 1920, 1080)])
        .unwrap();

    let sink = RecordingSink::default();
    pipeline.finalize(&sink).await.unwrap();

    let delivered = sink.delivered.lock().unwrap();
    match &delivered[0].1 {
        Finalized::Single(outcome) => {
            assert!(matches!(outcome.result, Err(UploadError::CropIncomplete)));
        }
        other => panic!("unexpected delivery: {:?}", other),
    }
}

#[tokio::test]
async fn test_finalize_batch_profile() {
    let mut pipeline = pipeline(profile(ProfileId::Gallery), Arc::new(DeclineCrop));
    pipeline
        .add_files(vec![png_file("a.png", 30, 30), png_file("b.png", 30, 30)])
        .unwrap();

    let sink = RecordingSink::default();
    pipeline.finalize(&sink).await.unwrap();

    let delivered = sink.delivered.lock().unwrap();
    match &delivered[0].1 {
        Finalized::Batch(report) => assert_eq!(report.succeeded(), 2),
        other => panic!("unexpected delivery: {:?}", other),
    }
}

#[tokio::test]
async fn test_finalize_batch_delivers_successes_and_failures() {
    let mut pipeline = pipeline(profile(ProfileId::Gallery), Arc::new(DeclineCrop));
    pipeline
        .add_files(vec![
            png_file("1.png", 30, 30),
            png_file("2.png", 30, 30),
            png_file("3.png", 30, 30),
            SourceFile::new("4.bmp", "image/bmp", vec![b'B', b'M', 0, 0, 0, 0]),
            png_file("5.png", 30, 30),
        ])
        .unwrap();

    let sink = RecordingSink::default();
    pipeline.finalize(&sink).await.unwrap();

    let delivered = sink.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    let (profile_id, upload) = &delivered[0];
    assert_eq!(*profile_id, ProfileId::Gallery);
    match upload {
        Finalized::Batch(report) => {
            assert_eq!(report.len(), 5);
            assert_eq!(report.succeeded(), 4);
            assert_eq!(report.failed(), 1);
            let (failed, err) = report.failures().next().unwrap();
            assert_eq!(failed.file_name, "4.bmp");
            assert_eq!(err.error_code(), "VALIDATION_FAILED");
            assert!(report.outcomes[3].result.is_err());
        }
        other => panic!("unexpected delivery: {:?}", other),
    }
}

#[tokio::test]
async fn test_finalize_without_files_fails_for_single_profile() {
    let mut pipeline = pipeline(profile(ProfileId::Avatar), Arc::new(CenteredCrop));
    let sink = RecordingSink::default();

    assert!(pipeline.finalize(&sink).await.is_err());
    assert!(sink.delivered.lock().unwrap().is_empty());
}
