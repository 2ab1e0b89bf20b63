//! Persisted per-recipient delivery state and campaign counters.
//!
//! This crate provides:
//! - The [`DeliveryLogRecord`] shape: one record per (campaign, recipient)
//!   send attempt, mutated by the engagement pipeline afterwards
//! - The [`LogStore`] and [`CampaignStore`] traits all components write
//!   through
//! - In-memory backends whose per-record mutations are atomic at the
//!   storage layer

mod campaigns;
mod error;
mod memory;
mod record;
mod r#trait;

pub use campaigns::{CampaignRecord, CampaignStat, CampaignStats};
pub use error::{Result, StoreError};
pub use memory::{MemoryCampaignStore, MemoryLogStore};
pub use record::{DeliveryLogRecord, OpenEvent, RecordId, RecordKey, SendOutcomeRecord};
pub use r#trait::{CampaignStore, LogStore};
