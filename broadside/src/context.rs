//! Application context: every component constructed once at process start.

use std::sync::Arc;

use axum::Router;
use broadside_analytics::{AnalyticsService, AnalyticsState};
use broadside_common::{Signal, config::Config};
use broadside_dispatch::{CancelToken, Dispatcher, JobQueue};
use broadside_store::{
    CampaignStore, LogStore, MemoryCampaignStore, MemoryLogStore,
};
use broadside_tracking::{TrackingLinks, TrackingState};
use broadside_transport::{HttpTransport, RetrySchedule, Transport};
use broadside_webhook::{Verification, WebhookIngestor, WebhookState, WebhookVerifier};
use tokio::{sync::broadcast, task::JoinHandle};

use crate::{AppError, routes};

/// Owns the component graph. Components receive `Arc`s from here and hold
/// no process-wide singletons of their own.
#[derive(Debug)]
pub struct AppContext {
    pub config: Config,
    pub log_store: Arc<dyn LogStore>,
    pub campaign_store: Arc<dyn CampaignStore>,
    pub links: TrackingLinks,
    pub dispatcher: Arc<Dispatcher>,
    pub ingestor: Arc<WebhookIngestor>,
    pub analytics: Arc<AnalyticsService>,
    pub jobs: JobQueue,
    pub cancel: CancelToken,
}

impl AppContext {
    /// Build the full context with the HTTP provider transport and
    /// in-memory stores.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
            config.provider.api_key.clone(),
            config.provider.endpoint.clone(),
            RetrySchedule::from(&config.retry),
        )?);
        Self::with_parts(
            config,
            Arc::new(MemoryLogStore::new()),
            Arc::new(MemoryCampaignStore::new()),
            transport,
        )
    }

    /// Build the context around caller-supplied stores and transport.
    pub fn with_parts(
        config: Config,
        log_store: Arc<dyn LogStore>,
        campaign_store: Arc<dyn CampaignStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, AppError> {
        let links = TrackingLinks::new(
            config.tracking.secret.clone(),
            config.tracking.public_base_url.clone(),
        );

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&transport),
            Arc::clone(&log_store),
            links.clone(),
            &config,
        ));

        let verification = if config.webhook.verify_signatures {
            match &config.webhook.public_key {
                Some(key) => Verification::Enabled(WebhookVerifier::from_key_material(key)?),
                None => Verification::MissingKey,
            }
        } else {
            Verification::Disabled
        };
        let ingestor = Arc::new(WebhookIngestor::new(
            Arc::clone(&log_store),
            Arc::clone(&campaign_store),
            verification,
        ));

        let analytics = Arc::new(AnalyticsService::new(Arc::clone(&log_store)));
        let jobs = JobQueue::new(config.workers.queue_depth);

        Ok(Self {
            config,
            log_store,
            campaign_store,
            links,
            dispatcher,
            ingestor,
            analytics,
            jobs,
            cancel: CancelToken::new(),
        })
    }

    /// Assemble the full HTTP surface.
    pub fn router(&self) -> Router {
        let tracking = broadside_tracking::router(Arc::new(TrackingState {
            links: self.links.clone(),
            store: Arc::clone(&self.log_store),
        }));
        let webhook = broadside_webhook::router(WebhookState {
            ingestor: Arc::clone(&self.ingestor),
        });
        let analytics = broadside_analytics::router(AnalyticsState {
            service: Arc::clone(&self.analytics),
        });
        let jobs = routes::router(routes::JobsState {
            jobs: self.jobs.clone(),
        });

        Router::new()
            .merge(tracking)
            .merge(webhook)
            .merge(analytics)
            .merge(jobs)
    }

    /// Spawn the send worker pool.
    pub fn spawn_workers(&self, shutdown: &broadcast::Sender<Signal>) -> Vec<JoinHandle<()>> {
        self.jobs.spawn_workers(
            self.config.workers.count,
            Arc::clone(&self.dispatcher),
            shutdown,
            self.cancel.clone(),
        )
    }
}
