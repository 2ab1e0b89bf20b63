//! Aggregation queries over the delivery log store.

use std::collections::BTreeMap;
use std::sync::Arc;

use broadside_store::{DeliveryLogRecord, LogStore, StoreError};
use chrono::{DateTime, Utc};

use crate::{CampaignDetails, CampaignSummary, LogEntry, LogsPage};

/// Hard cap on activity-log page size.
const MAX_LOG_LIMIT: usize = 500;
const DEFAULT_LOG_LIMIT: usize = 50;

/// Read-side query service.
#[derive(Debug)]
pub struct AnalyticsService {
    store: Arc<dyn LogStore>,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Campaign summary: delivered counts, total/unique opens and clicks,
    /// and the derived rates.
    pub async fn summary(&self, campaign: &str) -> Result<CampaignSummary, StoreError> {
        let records = self.store.campaign_records(campaign).await?;
        Ok(summarize(&records))
    }

    /// Summary plus failed-delivery count, send window, mean attempts,
    /// and a status histogram.
    pub async fn details(&self, campaign: &str) -> Result<CampaignDetails, StoreError> {
        let records = self.store.campaign_records(campaign).await?;
        let summary = summarize(&records);

        let failed_count = records.iter().filter(|r| is_failed(r)).count();
        let first_sent = records.iter().map(|r| r.created_at).min();
        let last_sent = records.iter().map(|r| r.created_at).max();
        #[allow(clippy::cast_precision_loss)]
        let mean_attempts = if records.is_empty() {
            0.0
        } else {
            let total_attempts: u64 = records.iter().map(|r| u64::from(r.attempts)).sum();
            total_attempts as f64 / records.len() as f64
        };

        let mut status_breakdown = BTreeMap::new();
        for record in &records {
            *status_breakdown
                .entry(record.status.to_string())
                .or_insert(0) += 1;
        }

        Ok(CampaignDetails {
            summary,
            failed_count,
            first_sent,
            last_sent,
            mean_attempts,
            status_breakdown,
        })
    }

    /// Activity logs, newest first. `before` filters to records created
    /// strictly earlier, so pagination stays stable under concurrent
    /// inserts; `limit` is clamped to a hard maximum.
    pub async fn logs(
        &self,
        campaign: &str,
        limit: Option<usize>,
        before: Option<DateTime<Utc>>,
    ) -> Result<LogsPage, StoreError> {
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
        let records = self.store.recent_records(campaign, before, limit).await?;

        let items: Vec<LogEntry> = records.iter().map(LogEntry::from).collect();
        let next_cursor = if items.len() == limit {
            items.last().map(|entry| entry.created_at)
        } else {
            None
        };

        Ok(LogsPage {
            items,
            limit,
            next_cursor,
        })
    }
}

fn is_delivered(record: &DeliveryLogRecord) -> bool {
    record.status.is_delivered_equivalent()
        || record
            .provider_status
            .is_some_and(|code| (200..300).contains(&code))
}

fn is_failed(record: &DeliveryLogRecord) -> bool {
    record.status.is_failure_equivalent()
        || record
            .provider_status
            .is_some_and(|code| (400..600).contains(&code))
}

#[allow(clippy::cast_precision_loss)]
fn summarize(records: &[DeliveryLogRecord]) -> CampaignSummary {
    let total = records.len();
    let delivered_count = records.iter().filter(|r| is_delivered(r)).count();
    let total_opens: u64 = records.iter().map(|r| r.open_count).sum();
    let unique_opens = records.iter().filter(|r| r.open_count > 0).count();
    let total_clicks: u64 = records.iter().map(|r| r.click_count).sum();
    let unique_clicks = records.iter().filter(|r| r.click_count > 0).count();

    let rate = |unique: usize| {
        if delivered_count == 0 {
            0.0
        } else {
            unique as f64 / delivered_count as f64
        }
    };

    CampaignSummary {
        total,
        delivered_count,
        total_opens,
        unique_opens,
        total_clicks,
        unique_clicks,
        open_rate: rate(unique_opens),
        click_rate: rate(unique_clicks),
    }
}
