//! Bulk send orchestration.

use std::{sync::Arc, time::Duration};

use broadside_common::{DeliveryStatus, config::Config};
use broadside_store::{DeliveryLogRecord, LogStore, SendOutcomeRecord};
use broadside_tracking::TrackingLinks;
use broadside_transport::{OutboundMessage, Transport};
use tokio::{sync::Semaphore, task::JoinSet, time::sleep};

use crate::{
    BulkResult, CampaignPayload, CancelToken, DispatchError, RatePacer, RecipientMessage,
    RecipientOutcome,
};

/// Bulk delivery engine.
///
/// Splits a campaign's recipient list into batches, runs one send task per
/// recipient gated by a concurrency semaphore and an aggregate rate pacer,
/// and writes each recipient's delivery log record as its send completes,
/// so partial progress survives a mid-run crash.
#[derive(Debug)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    store: Arc<dyn LogStore>,
    links: TrackingLinks,
    batch_size: usize,
    concurrency: usize,
    messages_per_second: f64,
    batch_pause: Duration,
    sender: Option<String>,
    reply_to: Option<String>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn LogStore>,
        links: TrackingLinks,
        config: &Config,
    ) -> Self {
        let sender = Some(config.provider.sender.clone()).filter(|s| !s.is_empty());
        Self {
            transport,
            store,
            links,
            batch_size: config.dispatch.batch_size.max(1),
            concurrency: config.dispatch.concurrency.max(1),
            messages_per_second: config.dispatch.messages_per_second,
            batch_pause: Duration::from_millis(config.dispatch.batch_pause_ms),
            sender,
            reply_to: config.provider.reply_to.clone(),
        }
    }

    /// Send a campaign to its full recipient list.
    ///
    /// A single recipient's failure never aborts the run; the run only
    /// fails wholesale on a configuration fault (missing sender address or
    /// provider credentials), reported before any send is attempted.
    pub async fn send_bulk(
        &self,
        payload: CampaignPayload,
        cancel: &CancelToken,
    ) -> Result<BulkResult, DispatchError> {
        let sender = payload
            .from_email
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| self.sender.clone())
            .ok_or(DispatchError::Configuration(
                "no sender address in payload or configuration",
            ))?;
        self.transport.preflight()?;

        let campaign_id = payload.campaign_id.clone();
        let total = payload.messages.len();
        tracing::info!(campaign = %campaign_id, total, "Bulk send started");

        let context = Arc::new(SendContext {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(&self.store),
            links: self.links.clone(),
            pacer: RatePacer::new(self.messages_per_second),
            semaphore: Semaphore::new(self.concurrency),
            campaign_id: campaign_id.clone(),
            default_subject: payload.subject.clone(),
            sender,
            reply_to: payload.reply_to.clone().or_else(|| self.reply_to.clone()),
        });

        let messages = payload.messages;
        let mut details: Vec<Option<RecipientOutcome>> = messages.iter().map(|_| None).collect();
        let mut batches = 0usize;

        let mut start = 0;
        while start < total {
            let end = (start + self.batch_size).min(total);
            batches += 1;
            tracing::debug!(
                campaign = %campaign_id,
                batch = batches,
                size = end - start,
                "Processing batch"
            );

            let mut join_set = JoinSet::new();
            for index in start..end {
                let message = messages[index].clone();
                let context = Arc::clone(&context);
                let cancel = cancel.clone();
                join_set
                    .spawn(async move { (index, send_one(&context, message, &cancel).await) });
            }
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((index, outcome)) => details[index] = Some(outcome),
                    Err(e) => tracing::error!(error = %e, "Send task failed to complete"),
                }
            }

            start = end;
            if start < total && !cancel.is_cancelled() {
                // Brief pause between batches to avoid provider burst
                // limits when batch size exceeds instantaneous concurrency.
                sleep(self.batch_pause).await;
            }
        }

        let details: Vec<RecipientOutcome> = details
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    skipped_outcome(messages[index].email.clone(), "send task failed")
                })
            })
            .collect();

        let sent = details.iter().filter(|outcome| outcome.success).count();
        let failed = total - sent;
        tracing::info!(
            campaign = %campaign_id,
            total,
            sent,
            failed,
            batches,
            "Bulk send finished"
        );

        Ok(BulkResult {
            campaign_id,
            total,
            sent,
            failed,
            batches,
            details,
        })
    }
}

struct SendContext {
    transport: Arc<dyn Transport>,
    store: Arc<dyn LogStore>,
    links: TrackingLinks,
    pacer: RatePacer,
    semaphore: Semaphore,
    campaign_id: String,
    default_subject: String,
    sender: String,
    reply_to: Option<String>,
}

/// One recipient's send: admission, pacing, pending pre-write, provider
/// call, finalize.
async fn send_one(
    context: &SendContext,
    message: RecipientMessage,
    cancel: &CancelToken,
) -> RecipientOutcome {
    let email = message.email.clone();

    let Ok(_permit) = context.semaphore.acquire().await else {
        return skipped_outcome(email, "concurrency limiter closed");
    };

    // Cancellation aborts sends that have not been admitted yet;
    // anything past this point completes and logs.
    if cancel.is_cancelled() {
        return skipped_outcome(email, "cancelled");
    }

    let subject = message
        .subject
        .clone()
        .unwrap_or_else(|| context.default_subject.clone());

    // Mint tracking links and pre-write the pending record, so a crash
    // between the provider call and the finalize leaves a visible pending
    // record instead of a silent gap.
    let instrumented = context.links.instrument_html(&message.html);
    let mut record =
        DeliveryLogRecord::pending(&context.campaign_id, &email, message.name.clone(), &subject);
    record.html_ref = Some(html_digest(&instrumented.html));
    record.tracking_token = Some(instrumented.tracking_token);
    record.click_map = instrumented.click_map;

    let record_id = match context.store.insert(record).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(email = %email, error = %e, "Failed to pre-write delivery log record");
            return skipped_outcome(email, "log store unavailable");
        }
    };

    context.pacer.acquire().await;

    let outbound = OutboundMessage {
        from: context.sender.clone(),
        to: email.clone(),
        to_name: message.name,
        subject,
        html: instrumented.html,
        reply_to: context.reply_to.clone(),
        campaign_tag: context.campaign_id.clone(),
    };

    match context.transport.send(&outbound).await {
        Ok(outcome) => {
            for attempt in &outcome.history {
                tracing::info!(
                    email = %email,
                    campaign = %context.campaign_id,
                    attempt = attempt.attempt,
                    status = ?attempt.status_code,
                    error = ?attempt.error,
                    "Delivery attempt"
                );
            }

            let status = if outcome.success {
                DeliveryStatus::Sent
            } else {
                DeliveryStatus::Failed
            };
            let finalize = SendOutcomeRecord {
                status,
                provider_status: outcome.status_code,
                attempts: outcome.attempts,
                attempt_history: outcome.history,
                body: outcome.body,
                error: outcome.error.clone(),
            };
            if let Err(e) = context.store.finalize_send(&record_id, finalize).await {
                tracing::error!(email = %email, error = %e, "Failed to finalize delivery log record");
            }

            if outcome.success {
                tracing::info!(email = %email, campaign = %context.campaign_id, "Message accepted by provider");
            } else {
                tracing::error!(
                    email = %email,
                    campaign = %context.campaign_id,
                    error = ?outcome.error,
                    "Message failed to send"
                );
            }

            RecipientOutcome {
                email,
                success: outcome.success,
                status_code: outcome.status_code,
                attempts: outcome.attempts,
                error: outcome.error,
            }
        }
        Err(e) => {
            let error = e.to_string();
            let finalize = SendOutcomeRecord {
                status: DeliveryStatus::Failed,
                provider_status: None,
                attempts: 0,
                attempt_history: Vec::new(),
                body: None,
                error: Some(error.clone()),
            };
            if let Err(store_err) = context.store.finalize_send(&record_id, finalize).await {
                tracing::error!(email = %email, error = %store_err, "Failed to finalize delivery log record");
            }
            RecipientOutcome {
                email,
                success: false,
                status_code: None,
                attempts: 0,
                error: Some(error),
            }
        }
    }
}

fn skipped_outcome(email: String, reason: &str) -> RecipientOutcome {
    RecipientOutcome {
        email,
        success: false,
        status_code: None,
        attempts: 0,
        error: Some(reason.to_string()),
    }
}

/// Content digest identifying the rendered HTML a recipient was sent.
fn html_digest(html: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(html.as_bytes());
    hex::encode(hasher.finalize())
}
