//! Orchestrator behaviour against in-process fake adapters

mod common;

use std::sync::Arc;

use common::{bare_request, garment, request, MultiOutputAdapter, SingleOutputAdapter, IMAGE_EDGE};
use fidelity::FidelityScorer;
use orchestrator::{GenerationOrchestrator, WorkerPool};
use shared::{ChannelSink, GarmentCategory, Strategy};
use tokio_test::assert_ok;

#[tokio::test]
async fn test_multi_output_adapter_returns_requested_count() {
    for count in 1..=4u8 {
        // Arrange
        let adapter = Arc::new(MultiOutputAdapter::default());
        let orchestrator = GenerationOrchestrator::new(adapter.clone());

        // Act
        let result = orchestrator.run(&bare_request(count)).await.unwrap();

        // Assert
        assert_eq!(result.images.len(), count as usize);
        assert_eq!(adapter.calls(), 1);
        assert_eq!(result.metadata.strategy, Strategy::Native);
    }
}

#[tokio::test]
async fn test_single_output_adapter_is_called_once_per_image() {
    for count in 1..=4u8 {
        // Arrange
        let adapter = Arc::new(SingleOutputAdapter::new());
        let orchestrator = GenerationOrchestrator::new(adapter.clone()).with_pool(WorkerPool::new(2));

        // Act
        let result = orchestrator.run(&bare_request(count)).await.unwrap();

        // Assert
        assert_eq!(adapter.calls(), count as usize);
        assert!(adapter.counts_seen().iter().all(|c| *c == 1));
        assert!(result.images.len() <= count as usize);
        assert_eq!(result.metadata.outcomes.len(), count as usize);
        assert_eq!(result.metadata.strategy, Strategy::FanOut);
    }
}

#[tokio::test]
async fn test_two_garments_three_images_end_to_end() {
    // Arrange
    let temp = tempfile::tempdir().unwrap();
    let garments = vec![
        garment(temp.path(), "shirt.png", GarmentCategory::Top),
        garment(temp.path(), "jeans.png", GarmentCategory::Bottom),
    ];
    let orchestrator = GenerationOrchestrator::new(Arc::new(MultiOutputAdapter::default()));

    // Act
    let result = assert_ok!(orchestrator.run(&request(garments, 3)).await);

    // Assert
    assert_eq!(result.images.len(), 3);
    assert_eq!(result.metadata.total_images, 3);
    assert_eq!(result.metadata.requested_images, 3);
    assert!(result
        .images
        .iter()
        .all(|img| img.width() == IMAGE_EDGE && img.height() == IMAGE_EDGE));
}

#[tokio::test]
async fn test_failing_second_call_is_a_partial_failure() {
    // Arrange
    let adapter = Arc::new(SingleOutputAdapter::failing_on(&[2]));
    let orchestrator = GenerationOrchestrator::new(adapter.clone());

    // Act
    let result = orchestrator.run(&bare_request(2)).await.unwrap();

    // Assert
    assert_eq!(adapter.calls(), 2);
    assert_eq!(result.images.len(), 1);
    assert_eq!(result.metadata.total_images, 1);
    assert_eq!(result.metadata.partial_failures(), 1);
    let failed = result.metadata.outcomes.iter().find(|o| !o.is_success()).unwrap();
    assert!(failed.error.as_deref().unwrap().contains("rejected"));
}

#[tokio::test]
async fn test_progress_is_monotonic_and_finishes_at_100() {
    // Arrange
    let (sink, mut events) = ChannelSink::channel();
    let orchestrator =
        GenerationOrchestrator::new(Arc::new(SingleOutputAdapter::failing_on(&[3]))).with_progress(Arc::new(sink));

    // Act
    orchestrator.run(&bare_request(4)).await.unwrap();

    // Assert
    let mut percents = Vec::new();
    while let Ok(event) = events.try_recv() {
        percents.push(event.percent);
    }
    assert_eq!(percents.first(), Some(&5));
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_native_progress_includes_adapter_updates() {
    let (sink, mut events) = ChannelSink::channel();
    let orchestrator =
        GenerationOrchestrator::new(Arc::new(MultiOutputAdapter::default())).with_progress(Arc::new(sink));

    orchestrator.run(&bare_request(2)).await.unwrap();

    let mut percents = Vec::new();
    while let Ok(event) = events.try_recv() {
        percents.push(event.percent);
    }
    assert_eq!(percents, vec![5, 10, 15, 20, 50, 95, 100]);
}

#[tokio::test]
async fn test_fidelity_gate_drops_flat_outputs() {
    // Arrange
    let temp = tempfile::tempdir().unwrap();
    let garments = vec![garment(temp.path(), "shirt.png", GarmentCategory::Top)];
    let (sink, mut events) = ChannelSink::channel();
    let orchestrator = GenerationOrchestrator::new(Arc::new(MultiOutputAdapter::default()))
        .with_fidelity(FidelityScorer::new())
        .with_progress(Arc::new(sink));

    // Act
    let result = orchestrator.run(&request(garments, 2)).await.unwrap();

    // Assert
    // Flat fake outputs have no keypoints, so nothing passes
    assert!(result.images.is_empty());
    assert_eq!(result.metadata.total_images, 0);
    assert_eq!(result.metadata.requested_images, 2);
    assert_eq!(result.metadata.diagnostics["fidelity_rejected"], 2);
    let mut percents = Vec::new();
    while let Ok(event) = events.try_recv() {
        percents.push(event.percent);
    }
    assert_eq!(percents, vec![5, 10, 15, 20, 50, 95, 97, 100]);
}
