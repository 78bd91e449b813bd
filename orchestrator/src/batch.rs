//! Batch processing over garment groups
//!
//! Groups run one after another through a [`GenerationRunner`]. A failed
//! group never stops the batch; cancellation stops it between groups.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, warn};

use shared::logging::{self, Component};
use shared::{
    component_info, CancellationToken, GarmentCategory, GarmentRef, GenerationRequest, GenerationResult,
    OutputConfig, ProgressReporter, ProgressSink, SubjectAttributes,
};

use crate::orchestrator::GenerationRunner;

/// Extensions picked up by [`scan_directory`], compared case-insensitively
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// What happened to one group
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Completed(GenerationResult),
    Failed { error: String },
    Cancelled,
}

impl BatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, BatchOutcome::Completed(_))
    }

    pub fn images(&self) -> &[DynamicImage] {
        match self {
            BatchOutcome::Completed(result) => &result.images,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub images: usize,
}

impl From<&[BatchOutcome]> for BatchSummary {
    fn from(outcomes: &[BatchOutcome]) -> Self {
        outcomes.iter().fold(BatchSummary::default(), |mut summary, outcome| {
            match outcome {
                BatchOutcome::Completed(result) => {
                    summary.completed += 1;
                    summary.images += result.images.len();
                }
                BatchOutcome::Failed { .. } => summary.failed += 1,
                BatchOutcome::Cancelled => summary.cancelled += 1,
            }
            summary
        })
    }
}

/// Runs a list of requests in order
pub struct BatchCoordinator<R: GenerationRunner + ?Sized> {
    runner: Arc<R>,
    progress: ProgressReporter,
}

impl<R: GenerationRunner + ?Sized> BatchCoordinator<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self {
            runner,
            progress: ProgressReporter::silent(),
        }
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = ProgressReporter::new(sink);
        self
    }

    /// Process every request. The returned list always has one entry per
    /// request; groups not started because of cancellation are `Cancelled`.
    pub async fn process(&self, requests: &[GenerationRequest], cancel: &CancellationToken) -> Vec<BatchOutcome> {
        let progress = self.progress.fresh();
        let total = requests.len();
        component_info!(Component::Orchestrator, "🚀 Batch of {} group(s)", total);

        let mut outcomes = Vec::with_capacity(total);
        for (i, request) in requests.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Batch cancelled, skipping {} remaining group(s)", total - i);
                outcomes.resize_with(total, || BatchOutcome::Cancelled);
                break;
            }

            progress.report(&format!("Group {}/{}", i + 1, total), (100 * i / total) as u8);
            let outcome = match self.runner.run(request).await {
                Ok(result) => {
                    debug!("Group {} produced {} image(s)", i + 1, result.images.len());
                    BatchOutcome::Completed(result)
                }
                Err(e) => {
                    logging::log_partial_failure(&Component::Orchestrator, &format!("Group {}", i + 1), &e);
                    BatchOutcome::Failed { error: e.to_string() }
                }
            };
            outcomes.push(outcome);
        }

        progress.report("Batch complete", 100);
        let summary = BatchSummary::from(outcomes.as_slice());
        logging::log_success(
            &Component::Orchestrator,
            &format!(
                "Batch finished: {} completed, {} failed, {} cancelled, {} image(s)",
                summary.completed, summary.failed, summary.cancelled, summary.images
            ),
        );
        outcomes
    }
}

/// One request per garment group, sharing subject and output settings
pub fn requests_from_groups(
    groups: Vec<Vec<GarmentRef>>,
    subject: &SubjectAttributes,
    config: &OutputConfig,
) -> Vec<GenerationRequest> {
    groups
        .into_iter()
        .map(|garments| GenerationRequest::new(garments, subject.clone(), config.clone()))
        .collect()
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
}

/// Garment images directly inside `dir`, sorted by path. A missing or
/// unreadable directory yields an empty list.
pub fn scan_directory(dir: &Path, category: GarmentCategory) -> Vec<GarmentRef> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot scan garment directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    paths.sort();

    let garments: Vec<GarmentRef> = paths
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            match GarmentRef::new(path.clone(), category) {
                Ok(garment) => Some(garment.with_description(format!(
                    "{} garment from {}",
                    category.as_str().to_lowercase(),
                    name
                ))),
                Err(e) => {
                    warn!("Skipping {}: {}", name, e);
                    None
                }
            }
        })
        .collect();

    debug!("Loaded {} garment(s) from {}", garments.len(), dir.display());
    garments
}

/// Every top paired with every bottom, tops in the outer loop
pub fn combinations(tops: &[GarmentRef], bottoms: &[GarmentRef]) -> Vec<Vec<GarmentRef>> {
    tops.iter()
        .flat_map(|top| bottoms.iter().map(move |bottom| vec![top.clone(), bottom.clone()]))
        .collect()
}
