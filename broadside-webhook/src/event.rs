//! Inbound engagement event model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five engagement event kinds the provider reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Open,
    Click,
    Bounce,
    Delivered,
    #[serde(rename = "spamreport")]
    SpamReport,
}

/// Category field: the provider sends either a single string or an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CategoryField {
    One(String),
    Many(Vec<String>),
}

impl CategoryField {
    fn first(&self) -> Option<&str> {
        match self {
            Self::One(value) => Some(value.as_str()),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }
}

/// One raw event as pushed by the provider. Transient: consumed and
/// discarded once folded into a delivery log record.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEngagementEvent {
    pub email: Option<String>,
    pub event: Option<EventKind>,
    /// Provider timestamp, unix seconds.
    pub timestamp: Option<i64>,
    pub campaign_id: Option<String>,
    pub custom_args: Option<HashMap<String, serde_json::Value>>,
    pub unique_args: Option<HashMap<String, serde_json::Value>>,
    pub category: Option<CategoryField>,
    /// Click destination, present on click events.
    pub url: Option<String>,
}

impl RawEngagementEvent {
    /// Resolve the campaign identifier using the fixed priority order:
    /// top-level `campaign_id`, then `custom_args.campaign_id`, then
    /// `unique_args.campaign_id`, then the first `category` entry.
    #[must_use]
    pub fn resolve_campaign_id(&self) -> Option<String> {
        if let Some(id) = &self.campaign_id {
            return Some(id.clone());
        }
        for args in [&self.custom_args, &self.unique_args] {
            if let Some(id) = args
                .as_ref()
                .and_then(|map| map.get("campaign_id"))
                .and_then(serde_json::Value::as_str)
            {
                return Some(id.to_string());
            }
        }
        self.category
            .as_ref()
            .and_then(CategoryField::first)
            .map(str::to_string)
    }

    /// Provider timestamp as a UTC datetime.
    #[must_use]
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}
