use std::sync::Arc;

use pulseshrine::api::{self, AppState};
use pulseshrine::clock::{Clock, IdGen, SystemClock, UuidGen};
use pulseshrine::config::{Config, ConfigCache};
use pulseshrine::llm::LlmClient;
use pulseshrine::orchestrator::Orchestrator;
use pulseshrine::repository::{self, PulseRepository, AI_USAGE_TRACKING_DAYS, STOPPED_PULSES};
use pulseshrine::store::memory::MemoryStore;
use pulseshrine::store::Store;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .json()
        .init();

    let config = Config::load();
    ConfigCache::init(config.clone());

    let mut layout = repository::table_layout();
    layout.push((AI_USAGE_TRACKING_DAYS, vec![]));
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new(layout));

    let repo = Arc::new(PulseRepository::new(store.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let idgen: Arc<dyn IdGen> = Arc::new(UuidGen);

    spawn_enrichment_worker(store, repo.clone(), clock.clone(), idgen.clone(), config.clone());

    let state = Arc::new(AppState {
        repo,
        clock,
        idgen,
    });

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "pulseshrine listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Drives every `StoppedPulse` insert through the lifecycle orchestrator
/// off the request path. No concrete vendor LLM client ships with this
/// binary (the wire format to Bedrock/Anthropic/etc. is an external
/// collaborator); without one configured, accepted pulses simply fall
/// through to the rule path when their LLM attempt reports unavailable.
fn spawn_enrichment_worker(
    store: Arc<dyn Store>,
    repo: Arc<PulseRepository>,
    clock: Arc<dyn Clock>,
    idgen: Arc<dyn IdGen>,
    config: Config,
) {
    tokio::spawn(async move {
        let mut receiver = match store.subscribe(STOPPED_PULSES) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "enrichment worker could not subscribe to stopped_pulses stream");
                return;
            }
        };

        let llm_client: Option<Arc<dyn LlmClient>> = None;
        let mut rng = rand::thread_rng();

        loop {
            match receiver.recv().await {
                Ok(record) => {
                    let orchestrator = Orchestrator {
                        repo: &repo,
                        clock: clock.as_ref(),
                        idgen: idgen.as_ref(),
                        llm_client: llm_client.as_deref(),
                        config: &config,
                    };
                    if let Err(e) = orchestrator.handle_stream_record(&record, &mut rng).await {
                        tracing::warn!(error = %e, "failed to process stopped_pulses record, will be redelivered");
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "enrichment worker lagged behind the stopped_pulses stream");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    tracing::error!("stopped_pulses stream closed, enrichment worker exiting");
                    break;
                }
            }
        }
    });
}
