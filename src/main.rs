use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use repo_capture::config::PipelineConfig;
use repo_capture::driver::SessionDriver;
use repo_capture::kernel::event::{SessionEvent, TranscriptUpdate};
use repo_capture::kernel::scheduler::SideEffect;
use repo_capture::memory::commit::DualStoreCommit;
use repo_capture::memory::sqlite::SqlitePreferenceStore;
use repo_capture::memory::store::{InMemorySemanticStore, PreferenceStore, SemanticStore};
use repo_capture::memory::HttpSemanticStore;
use repo_capture::services::llm::ExtractionClient;
use repo_capture::services::trigger::PreferencePipeline;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("repo-capture booting...");

    let config = PipelineConfig::load().context("loading configuration")?;
    let owner_id = std::env::var("REPO_CAPTURE_OWNER").unwrap_or_else(|_| "local".to_string());

    // Stores
    let preferences: Arc<dyn PreferenceStore> = Arc::new(
        SqlitePreferenceStore::open(&config.storage.sqlite_path).context("opening preference store")?,
    );
    let semantic: Arc<dyn SemanticStore> = match &config.storage.semantic_url {
        Some(url) => Arc::new(HttpSemanticStore::new(
            url.clone(),
            config.storage.semantic_api_key.clone(),
            config.extraction.timeout(),
        )),
        None => {
            tracing::info!("no semantic endpoint configured, keeping notes in memory");
            Arc::new(InMemorySemanticStore::new())
        }
    };
    let (committer, reports) = DualStoreCommit::with_reports(semantic, Arc::clone(&preferences));

    // Pipeline + driver
    let extractor = ExtractionClient::llama(config.extraction.clone());
    let pipeline = PreferencePipeline::new(extractor, committer, &config);
    let (mut driver, events) = SessionDriver::new(&config, pipeline, Some(owner_id.clone()));
    driver = driver.with_reports(reports);
    let mut effects = driver.subscribe();

    let cancel = CancellationToken::new();
    let driver_task = tokio::spawn(driver.run(cancel.clone()));

    // Print confirmation items as they appear so ids can be typed back.
    tokio::spawn(async move {
        while let Some(effect) = effects.recv().await {
            match effect {
                SideEffect::Acknowledge(text) => println!("> {}", text),
                SideEffect::ItemSurfaced(view) => {
                    println!("[{:?}] {} ({}) id={}", view.state, view.fact.label(), view.fact.fact_type.slug(), view.id)
                }
                SideEffect::ItemRemoved { id, outcome } => println!("[{:?}] id={}", outcome, id),
                _ => {}
            }
        }
    });

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    tracing::info!("type to talk; /confirm <id>, /dismiss <id>, /list; Ctrl+C to stop");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            cancel.cancel();
            break;
        };
        if !handle_line(line.trim(), &events, preferences.as_ref(), &owner_id).await? {
            cancel.cancel();
            break;
        }
    }

    let session = driver_task.await.context("driver task panicked")?;
    let snapshot = session.telemetry.snapshot();
    tracing::info!(
        "session done: extractions={} commits={} failed_writes={} evicted_events={}",
        snapshot.extraction.requested,
        snapshot.storage.commits_validated + snapshot.storage.commits_unvalidated,
        snapshot.storage.failed_writes(),
        session.telemetry.evicted()
    );
    Ok(())
}

/// Returns false when the input channel is gone.
async fn handle_line(
    line: &str,
    events: &mpsc::Sender<SessionEvent>,
    preferences: &dyn PreferenceStore,
    owner_id: &str,
) -> Result<bool> {
    if line.is_empty() {
        return Ok(true);
    }

    let event = if let Some(id) = line.strip_prefix("/confirm ") {
        SessionEvent::Confirm(id.trim().to_string())
    } else if let Some(id) = line.strip_prefix("/dismiss ") {
        SessionEvent::Dismiss(id.trim().to_string())
    } else if line == "/list" {
        for (cluster, prefs) in preferences.list_grouped(owner_id).await? {
            println!("{}:", cluster);
            for pref in prefs {
                let mark = if pref.validated { "validated" } else { "inferred" };
                println!("  {} ({})", pref.label, mark);
            }
        }
        return Ok(true);
    } else {
        SessionEvent::Transcript(TranscriptUpdate::typed(line))
    };

    Ok(events.send(event).await.is_ok())
}
