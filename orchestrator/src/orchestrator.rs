//! Generation orchestrator
//!
//! Runs one [`GenerationRequest`] against an injected [`ProviderAdapter`].
//! Adapters that return several images per call get a single native
//! request; all others are fanned out into one single-image task per
//! requested output, bounded by the [`WorkerPool`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use fidelity::FidelityScorer;
use futures_util::stream::{FuturesUnordered, StreamExt};
use image::DynamicImage;
use tokio::task::JoinHandle;
use tracing::debug;

use providers::{ProviderAdapter, ProviderResult};
use shared::logging::{self, Component};
use shared::{
    component_info, GenerationMetadata, GenerationRequest, GenerationResult, OutputCount, ProgressReporter,
    ProgressSink, Strategy, TaskOutcome,
};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::fidelity_gate::validate_fidelity;
use crate::pool::WorkerPool;

/// Anything that can turn one request into a result. Coordinators depend
/// on this rather than on the concrete orchestrator.
#[mockall::automock]
#[async_trait]
pub trait GenerationRunner: Send + Sync {
    async fn run(&self, request: &GenerationRequest) -> OrchestratorResult<GenerationResult>;
}

/// Coordinates one provider adapter, a worker pool, an optional progress
/// sink and an optional fidelity gate
pub struct GenerationOrchestrator {
    adapter: Arc<dyn ProviderAdapter>,
    pool: WorkerPool,
    progress: ProgressReporter,
    fidelity: Option<FidelityScorer>,
}

impl GenerationOrchestrator {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            adapter,
            pool: WorkerPool::default(),
            progress: ProgressReporter::silent(),
            fidelity: None,
        }
    }

    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = ProgressReporter::new(sink);
        self
    }

    /// Drop generated images that fail fidelity against the request's garments
    pub fn with_fidelity(mut self, scorer: FidelityScorer) -> Self {
        self.fidelity = Some(scorer);
        self
    }

    pub fn adapter(&self) -> &Arc<dyn ProviderAdapter> {
        &self.adapter
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Execute the request and return every image that was produced.
    ///
    /// On the native branch adapter errors propagate. On the fan-out
    /// branch failed or panicked tasks are recorded in
    /// `metadata.outcomes` and the surviving images are returned.
    pub async fn run(&self, request: &GenerationRequest) -> OrchestratorResult<GenerationResult> {
        let progress = self.progress.fresh();
        let provider = self.adapter.name();
        let count = request.count();

        progress.report("Starting generation", 5);
        component_info!(
            Component::Orchestrator,
            "🚀 Generating {} image(s) with {} ({} garment(s))",
            count,
            provider,
            request.garments.len()
        );

        progress.report("Preparing garments", 10);
        progress.report("Checking provider", 15);
        progress.report("Preparing request", 20);

        let started = Instant::now();
        let mut result = if self.adapter.supports_multi_output() {
            self.run_native(request, &progress).await?
        } else {
            self.run_fan_out(request, &progress).await
        };

        progress.report("Processing images", 95);
        if let Some(scorer) = &self.fidelity {
            progress.report("Checking fidelity", 97);
            result = validate_fidelity(result, &request.garments, scorer).await?;
        }
        result.metadata.total_images = result.images.len();
        result.metadata.requested_images = count.as_usize();
        if result.metadata.seed.is_none() {
            result.metadata.seed = request.config.seed;
        }
        result.metadata.elapsed_ms = started.elapsed().as_millis() as u64;
        result
            .metadata
            .diagnostics
            .insert("estimated_cost_usd".to_string(), self.adapter.estimate_cost(&request.config).into());

        progress.report("Done", 100);
        logging::log_success(
            &Component::Orchestrator,
            &format!(
                "{} produced {}/{} image(s) via {}",
                provider,
                result.images.len(),
                count,
                result.metadata.strategy
            ),
        );
        Ok(result)
    }

    /// Run the whole call on the runtime so a UI thread never awaits
    /// provider I/O inline
    pub fn spawn_run(self: &Arc<Self>, request: GenerationRequest) -> JoinHandle<OrchestratorResult<GenerationResult>> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.run(&request).await })
    }

    async fn run_native(
        &self,
        request: &GenerationRequest,
        progress: &ProgressReporter,
    ) -> OrchestratorResult<GenerationResult> {
        debug!("Native multi-output request for {} image(s)", request.count());
        let adapter = Arc::clone(&self.adapter);
        let task_request = request.clone();
        let task_progress = progress.clone();

        let handle = self
            .pool
            .spawn(async move { adapter.generate(&task_request, &task_progress).await });
        let mut result = handle
            .await
            .map_err(|e| OrchestratorError::worker_join(0, &e))??;

        result.metadata.strategy = Strategy::Native;
        Ok(result)
    }

    async fn run_fan_out(&self, request: &GenerationRequest, progress: &ProgressReporter) -> GenerationResult {
        let count = request.count().as_usize();
        debug!("Fanning out {} single-image task(s)", count);
        let single = request.with_count(OutputCount::ONE);
        let started = Instant::now();

        let handles: Vec<JoinHandle<(ProviderResult<GenerationResult>, u64)>> = (0..count)
            .map(|_| {
                let adapter = Arc::clone(&self.adapter);
                let task_request = single.clone();
                self.pool.spawn(async move {
                    let task_started = Instant::now();
                    // Per-task adapter progress would interleave, so it is discarded
                    let result = adapter.generate(&task_request, &ProgressReporter::silent()).await;
                    (result, task_started.elapsed().as_millis() as u64)
                })
            })
            .collect();

        let mut pending: FuturesUnordered<_> = handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| async move { (index, handle.await) })
            .collect();

        let mut done = 0usize;
        let mut per_task: Vec<Vec<DynamicImage>> = vec![Vec::new(); count];
        let mut outcomes = Vec::with_capacity(count);

        while let Some((index, joined)) = pending.next().await {
            done += 1;
            progress.report(
                &format!("Generated {done}/{count}"),
                (10 + 85 * done / count.max(1)) as u8,
            );

            let outcome = match joined {
                Ok((Ok(result), elapsed_ms)) => {
                    let outcome = TaskOutcome::succeeded(index, result.images.len(), elapsed_ms);
                    per_task[index] = result.images;
                    outcome
                }
                Ok((Err(e), elapsed_ms)) => {
                    logging::log_partial_failure(&Component::Orchestrator, &format!("Task {}", index + 1), &e);
                    TaskOutcome::failed(index, e.to_string(), elapsed_ms)
                }
                Err(e) => {
                    let error = OrchestratorError::worker_join(index, &e);
                    logging::log_partial_failure(&Component::Orchestrator, &format!("Task {}", index + 1), &error);
                    TaskOutcome::failed(index, error.to_string(), started.elapsed().as_millis() as u64)
                }
            };
            outcomes.push(outcome);
        }

        outcomes.sort_by_key(|o| o.index);
        let images: Vec<DynamicImage> = per_task.into_iter().flatten().collect();

        let mut metadata = GenerationMetadata::new(self.adapter.name(), self.adapter.model());
        metadata.strategy = Strategy::FanOut;
        metadata.outcomes = outcomes;
        GenerationResult::new(images, metadata)
    }
}

#[async_trait]
impl GenerationRunner for GenerationOrchestrator {
    async fn run(&self, request: &GenerationRequest) -> OrchestratorResult<GenerationResult> {
        GenerationOrchestrator::run(self, request).await
    }
}
