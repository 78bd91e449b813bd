//! Main entry point for the orchestrator binary
//!
//! Wires settings, credentials and the selected provider adapter into the
//! orchestrator and coordinators, then writes results under the output
//! directory.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use fidelity::FidelityScorer;
use orchestrator::cli::{Args, Command, ConfigArgs, RequestArgs, SubjectArgs};
use orchestrator::{
    combinations, get_angles, requests_from_groups, scan_directory, AnglePreset, BatchCoordinator, BatchOutcome,
    BatchSummary, GenerationOrchestrator, MultiAngleCoordinator, OutputWriter, WorkerPool,
};
use providers::{build_adapter_with_timeout, ProviderAdapter, ProviderError, ProviderKind};
use shared::logging::{self, Component};
use shared::{
    CancellationToken, CredentialSource, EnvCredentials, FaithfulPromptBuilder, GarmentCategory, GenerationRequest,
    ProgressSink, Settings, StaticCredentials,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::from_env();
    if let Some(level) = &args.log_level {
        settings.log_level = level.clone();
    }
    if let Some(output) = &args.output {
        settings.output_dir = output.clone();
    }
    if let Some(max_parallel) = args.max_parallel {
        settings.max_parallel = max_parallel.max(1);
    }

    logging::init_tracing(Some(&settings.log_level));
    logging::log_startup(&Component::Cli, "orchestrator CLI");

    let result = run(args.command, &settings).await;
    if let Err(e) = &result {
        logging::log_error(&Component::Cli, "Command", e);
    }
    result
}

async fn run(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Generate(request) => generate(request, settings).await,
        Command::MultiAngle { request, angles, full } => multi_angle(request, angles, full, settings).await,
        Command::Batch {
            provider,
            tops,
            bottoms,
            category,
            subject,
            config,
            fidelity,
        } => batch(provider, &tops, bottoms.as_deref(), category, subject, config, fidelity, settings).await,
        Command::Score {
            source,
            generated,
            heatmap,
        } => score(&source, &generated, heatmap.as_deref()),
        Command::Status { provider } => status(provider, settings).await,
        Command::Cost { provider, config } => cost(provider, config),
    }
}

fn adapter_for(kind: ProviderKind, credentials: &dyn CredentialSource, settings: &Settings) -> Result<Arc<dyn ProviderAdapter>> {
    build_adapter_with_timeout(
        kind,
        credentials,
        Arc::new(FaithfulPromptBuilder::new()),
        settings.request_timeout,
    )
    .with_context(|| format!("cannot set up provider {kind}"))
}

/// Progress sink that logs each update
fn log_sink() -> Arc<dyn ProgressSink> {
    Arc::new(|message: &str, percent: u8| {
        logging::log_progress(&Component::Cli, &format!("{percent:>3}%"), message);
    })
}

fn orchestrator_for(kind: ProviderKind, settings: &Settings, fidelity: bool) -> Result<GenerationOrchestrator> {
    let adapter = adapter_for(kind, &EnvCredentials::new(), settings)?;
    let orchestrator = GenerationOrchestrator::new(adapter).with_pool(WorkerPool::new(settings.max_parallel));
    Ok(if fidelity {
        orchestrator.with_fidelity(FidelityScorer::new())
    } else {
        orchestrator
    })
}

fn build_request(request: &RequestArgs) -> Result<GenerationRequest> {
    let config = request.config.to_config()?;
    Ok(GenerationRequest::new(
        request.garments.clone(),
        request.subject.to_subject(),
        config,
    ))
}

async fn generate(args: RequestArgs, settings: &Settings) -> Result<()> {
    let request = build_request(&args)?;
    let orchestrator = Arc::new(orchestrator_for(args.provider, settings, args.fidelity)?.with_progress(log_sink()));

    let result = orchestrator
        .spawn_run(request)
        .await
        .context("generation task aborted")??;

    let writer = OutputWriter::new(&settings.output_dir);
    let dir = writer.create_run_dir(&format!("generate {}", args.provider)).await?;
    let paths = writer.save_images(&dir, "image", &result.images).await?;
    writer.write_json(&dir, "metadata.json", &result.metadata).await?;

    logging::log_success(
        &Component::Cli,
        &format!("Saved {} image(s) to {}", paths.len(), dir.display()),
    );
    println!("{}", serde_json::to_string_pretty(&result.metadata)?);
    Ok(())
}

async fn multi_angle(
    args: RequestArgs,
    angles: Vec<orchestrator::Angle>,
    full: bool,
    settings: &Settings,
) -> Result<()> {
    let request = build_request(&args)?;
    let angles = if full {
        AnglePreset::Full.angles()
    } else if angles.is_empty() {
        get_angles(request.count().as_usize())
    } else {
        angles
    };

    let runner = Arc::new(orchestrator_for(args.provider, settings, args.fidelity)?);
    let coordinator = MultiAngleCoordinator::new(runner).with_progress(log_sink());
    let result = coordinator.run(&request, &angles).await;

    let writer = OutputWriter::new(&settings.output_dir);
    let dir = writer.create_run_dir(&format!("multi angle {}", args.provider)).await?;
    let mut remaining = result.images.as_slice();
    for outcome in result.metadata.angles.iter().filter(|o| o.is_success()) {
        let take = outcome.image_count.min(remaining.len());
        let (images, rest) = remaining.split_at(take);
        writer.save_images(&dir, outcome.angle.pose_key(), images).await?;
        remaining = rest;
    }
    writer.write_json(&dir, "metadata.json", &result.metadata).await?;

    logging::log_success(
        &Component::Cli,
        &format!(
            "Saved {} image(s) for {}/{} angle(s) to {}",
            result.metadata.generated_images,
            result.succeeded_angles().len(),
            result.metadata.total_angles,
            dir.display()
        ),
    );
    println!("{}", serde_json::to_string_pretty(&result.metadata)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn batch(
    provider: ProviderKind,
    tops: &Path,
    bottoms: Option<&Path>,
    category: GarmentCategory,
    subject: SubjectArgs,
    config: ConfigArgs,
    fidelity: bool,
    settings: &Settings,
) -> Result<()> {
    let tops = scan_directory(tops, category);
    let groups = match bottoms {
        Some(dir) => combinations(&tops, &scan_directory(dir, GarmentCategory::Bottom)),
        None => tops.into_iter().map(|garment| vec![garment]).collect(),
    };
    if groups.is_empty() {
        anyhow::bail!("no garment images found");
    }
    let requests = requests_from_groups(groups, &subject.to_subject(), &config.to_config()?);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                logging::log_progress(&Component::Cli, "Cancel", "Ctrl+C received, finishing current group");
                on_signal.cancel();
            }
            Err(err) => logging::log_error(&Component::Cli, "Signal handling", &err),
        }
    });

    let runner = Arc::new(orchestrator_for(provider, settings, fidelity)?);
    let coordinator = BatchCoordinator::new(runner).with_progress(log_sink());
    let outcomes = coordinator.process(&requests, &cancel).await;

    let writer = OutputWriter::new(&settings.output_dir);
    let dir = writer.create_run_dir(&format!("batch {provider}")).await?;
    let mut report = Vec::with_capacity(outcomes.len());
    for (i, (outcome, request)) in outcomes.iter().zip(&requests).enumerate() {
        let garments: Vec<String> = request.garments.iter().map(|g| g.display_name()).collect();
        let entry = match outcome {
            BatchOutcome::Completed(result) => {
                writer
                    .save_images(&dir, &format!("group {}", i + 1), &result.images)
                    .await?;
                serde_json::json!({"group": i + 1, "garments": garments, "status": "completed", "metadata": result.metadata})
            }
            BatchOutcome::Failed { error } => {
                serde_json::json!({"group": i + 1, "garments": garments, "status": "failed", "error": error})
            }
            BatchOutcome::Cancelled => serde_json::json!({"group": i + 1, "garments": garments, "status": "cancelled"}),
        };
        report.push(entry);
    }

    let summary = BatchSummary::from(outcomes.as_slice());
    writer
        .write_json(&dir, "batch.json", &serde_json::json!({"summary": summary, "groups": report}))
        .await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn score(source: &Path, generated: &Path, heatmap: Option<&Path>) -> Result<()> {
    let generated_image =
        image::open(generated).with_context(|| format!("cannot read generated image {}", generated.display()))?;

    let scorer = FidelityScorer::new();
    let score = scorer.evaluate(source, &generated_image);
    let passed = scorer.pass(&score);
    logging::log_progress(
        &Component::Fidelity,
        if passed { "Pass" } else { "Below threshold" },
        &format!(
            "ssim={:.3} hist={:.3} keypoints={:.3}",
            score.ssim, score.color_hist_correlation, score.keypoint_match_ratio
        ),
    );

    if let Some(path) = heatmap {
        scorer
            .heatmap(source, &generated_image)
            .save(path)
            .with_context(|| format!("cannot write heatmap {}", path.display()))?;
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "score": score,
            "thresholds": scorer.thresholds(),
            "pass": passed,
        }))?
    );
    Ok(())
}

async fn status(provider: Option<ProviderKind>, settings: &Settings) -> Result<()> {
    let kinds = match provider {
        Some(kind) => vec![kind],
        None => ProviderKind::ALL.to_vec(),
    };

    let credentials = EnvCredentials::new();
    let mut report = serde_json::Map::new();
    for kind in kinds {
        let state = match adapter_for(kind, &credentials, settings) {
            Ok(adapter) => {
                if adapter.check_status().await {
                    "available"
                } else {
                    "unreachable"
                }
            }
            Err(e) if e.downcast_ref::<ProviderError>().is_some_and(|p| matches!(p, ProviderError::Configuration { .. })) => {
                "not configured"
            }
            Err(e) => return Err(e),
        };
        report.insert(kind.to_string(), state.into());
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cost(provider: ProviderKind, config: ConfigArgs) -> Result<()> {
    let config = config.to_config()?;
    // Estimation is offline, so any non-empty key will do
    let credentials = StaticCredentials::new().with_key(provider.as_str(), "offline");
    let adapter = adapter_for(provider, &credentials, &Settings::default())?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "provider": provider.as_str(),
            "model": adapter.model(),
            "count": config.count.get(),
            "estimated_cost_usd": adapter.estimate_cost(&config),
        }))?
    );
    Ok(())
}
