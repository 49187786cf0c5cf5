//! Main application state and service coordination
//!
//! This module contains the production AppState that owns every service
//! component and the background tasks: the expiry sweeper, the periodic
//! taxonomy sync, and the HTTP server. There are no ambient singletons;
//! every component is constructed here and passed down by reference.

use crate::clients::{HttpIdentityClient, HttpQuestionClient, HttpRoomClient};
use crate::config::AppConfig;
use crate::error::Result;
use crate::http::server::{ApiState, HttpServer};
use crate::matching::engine::{MatchEngine, MatchEngineSettings};
use crate::metrics::MetricsCollector;
use crate::queue::store::{InMemoryQueueStore, QueueStore};
use crate::queue::sweeper::QueueSweeper;
use crate::taxonomy::TaxonomyCache;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,
    engine: Arc<MatchEngine>,
    store: Arc<dyn QueueStore>,
    taxonomy: Arc<TaxonomyCache>,
    metrics: Arc<MetricsCollector>,
    http_server: Arc<HttpServer>,
    sweeper: QueueSweeper,
    background_tasks: Vec<JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Construct every component from configuration. Nothing is started yet.
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing pairup matchmaking service");

        let metrics = Arc::new(MetricsCollector::new()?);
        let store: Arc<dyn QueueStore> = Arc::new(InMemoryQueueStore::new());

        let timeout = config.request_timeout();
        let question_client = Arc::new(HttpQuestionClient::new(
            config.endpoints.question_service_url.clone(),
            timeout,
        )?);
        let room_client = Arc::new(HttpRoomClient::new(
            config.endpoints.room_service_url.clone(),
            timeout,
        )?);
        let identity_client = Arc::new(HttpIdentityClient::new(
            config.endpoints.identity_service_url.clone(),
            timeout,
        )?);

        let taxonomy = Arc::new(TaxonomyCache::new(
            question_client.clone(),
            config.taxonomy_refresh_interval(),
            metrics.clone(),
        ));

        let engine = Arc::new(MatchEngine::new(
            store.clone(),
            taxonomy.clone(),
            question_client,
            room_client,
            metrics.clone(),
            MatchEngineSettings {
                queue_ttl: config.queue_ttl(),
                default_language: config.matchmaking.default_language.clone(),
            },
        ));

        let api_state = ApiState {
            engine: engine.clone(),
            identity: identity_client,
            store: store.clone(),
            metrics: metrics.clone(),
            service_name: config.service.name.clone(),
        };
        let http_server = Arc::new(HttpServer::new(
            config.service.bind_host.clone(),
            config.service.bind_port,
            api_state,
        ));

        let sweeper = QueueSweeper::new(store.clone(), config.sweep_interval(), metrics.clone());

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            engine,
            store,
            taxonomy,
            metrics,
            http_server,
            sweeper,
            background_tasks: Vec::new(),
            shutdown_tx,
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Start the background tasks and the HTTP server
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting service components");

        // Prime the taxonomy before serving; a failure here is tolerable,
        // the seeded defaults remain in effect.
        if let Err(e) = self.taxonomy.refresh().await {
            warn!("Initial taxonomy refresh failed, serving seed data: {}", e);
        }

        self.background_tasks.push(self.sweeper.spawn());
        self.background_tasks.push(self.spawn_taxonomy_sync());

        let http_server = self.http_server.clone();
        self.background_tasks.push(tokio::spawn(async move {
            if let Err(e) = http_server.start().await {
                error!("HTTP server exited with error: {}", e);
            }
        }));

        *self.is_running.write().await = true;
        info!(
            "Service started on {}:{}",
            self.config.service.bind_host, self.config.service.bind_port
        );
        Ok(())
    }

    /// Periodic taxonomy sync, independent of the stale-on-read trigger
    fn spawn_taxonomy_sync(&self) -> JoinHandle<()> {
        let taxonomy = self.taxonomy.clone();
        let interval = self.config.taxonomy_refresh_interval();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // immediate first tick; already primed

            info!("Taxonomy sync started (interval: {:?})", interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = taxonomy.refresh().await {
                            warn!("Scheduled taxonomy refresh failed: {}", e);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Taxonomy sync shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stop every background task and drain the HTTP server
    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping service components");

        *self.is_running.write().await = false;
        self.http_server.stop();
        self.sweeper.stop();
        let _ = self.shutdown_tx.send(());

        for task in self.background_tasks.drain(..) {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Background task ended abnormally: {}", e);
                }
            }
        }

        info!("Service stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn engine(&self) -> Arc<MatchEngine> {
        self.engine.clone()
    }

    pub fn store(&self) -> Arc<dyn QueueStore> {
        self.store.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }
}
