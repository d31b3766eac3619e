use std::sync::Arc;

use daysheet_events::{EventBus, EventLogSink};
use daysheet_records::{DailyFirings, Hierarchy, JsonDirectory};
use daysheet_store::{
    GoogleConfig, GoogleSession, GoogleStore, MemoryStore, ServiceAccount, ServiceAccountKey, StoreHandle,
};
use daysheet_worker::{FiringScheduler, GoogleCredentials, StoreBackend, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daysheet_worker=debug,daysheet_records=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();

    let cancel = CancellationToken::new();

    let store = match &config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; nothing will persist");
            StoreHandle::new(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Google(GoogleCredentials::AccessToken(token)) => {
            tracing::warn!("Using a fixed Google access token; it will not be refreshed");
            StoreHandle::new(Arc::new(
                GoogleStore::new(GoogleConfig::new(token.clone(), config.store_timeout))
                    .expect("Failed to build the Google store client"),
            ))
        }
        StoreBackend::Google(GoogleCredentials::ServiceAccount(path)) => {
            let key = ServiceAccountKey::load(path)
                .await
                .expect("Failed to read the service account key");
            let source = ServiceAccount::new(key, config.store_timeout).expect("Invalid service account key");
            let session = GoogleSession::new(Arc::new(source), config.store_timeout);
            let (google, expires_at) = session
                .connect()
                .await
                .expect("Failed to obtain a Google access token");
            let store = StoreHandle::new(Arc::new(google));
            tokio::spawn(session.run(store.clone(), expires_at, cancel.clone()));
            store
        }
    };

    let directory = Arc::new(
        JsonDirectory::open(&config.directory_path)
            .await
            .expect("Failed to load the employee directory"),
    );

    let events = Arc::new(EventBus::default());
    tokio::spawn(EventLogSink::run(events.subscribe()));

    let hierarchy = Arc::new(Hierarchy::new(store, config.root_container_name.clone()));
    let firings = DailyFirings::new(hierarchy, directory, events);
    let scheduler = FiringScheduler::new(firings, config.lock_at, config.aggregate_at);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    tracing::info!(
        root = %config.root_container_name,
        directory = %config.directory_path.display(),
        "Worker starting"
    );
    scheduler.run(cancel).await;
    tracing::info!("Worker stopped");
}
