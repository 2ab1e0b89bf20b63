//! Aggregation result shapes.

use std::collections::BTreeMap;

use broadside_store::DeliveryLogRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Campaign-level engagement summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignSummary {
    pub total: usize,
    pub delivered_count: usize,
    pub total_opens: u64,
    pub unique_opens: usize,
    pub total_clicks: u64,
    pub unique_clicks: usize,
    /// unique_opens / delivered_count; 0 when nothing was delivered.
    pub open_rate: f64,
    /// unique_clicks / delivered_count; 0 when nothing was delivered.
    pub click_rate: f64,
}

/// Summary plus failure and timing breakdowns.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignDetails {
    #[serde(flatten)]
    pub summary: CampaignSummary,
    pub failed_count: usize,
    pub first_sent: Option<DateTime<Utc>>,
    pub last_sent: Option<DateTime<Utc>>,
    pub mean_attempts: f64,
    pub status_breakdown: BTreeMap<String, usize>,
}

/// One activity-log row. Provider response bodies are deliberately
/// omitted from listings.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub status: String,
    pub provider_status: Option<u16>,
    pub attempts: u32,
    pub open_count: u64,
    pub click_count: u64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&DeliveryLogRecord> for LogEntry {
    fn from(record: &DeliveryLogRecord) -> Self {
        Self {
            id: record.id.to_string(),
            email: record.email.clone(),
            name: record.name.clone(),
            status: record.status.to_string(),
            provider_status: record.provider_status,
            attempts: record.attempts,
            open_count: record.open_count,
            click_count: record.click_count,
            error: record.error.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// One page of activity logs, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct LogsPage {
    pub items: Vec<LogEntry>,
    pub limit: usize,
    /// Pass as `before` to fetch the next page; absent when this page was
    /// not full.
    pub next_cursor: Option<DateTime<Utc>>,
}
