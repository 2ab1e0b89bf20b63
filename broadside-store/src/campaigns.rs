//! Campaign registry types.

use serde::{Deserialize, Serialize};

/// Campaign-level running counters, bumped by the webhook ingestor as
/// engagement events resolve to a registered campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub opens: u64,
    pub clicks: u64,
    pub bounces: u64,
    pub spam_reports: u64,
}

/// Which counter an event bumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStat {
    Opens,
    Clicks,
    Bounces,
    SpamReports,
}

impl CampaignStats {
    pub fn bump(&mut self, stat: CampaignStat) {
        match stat {
            CampaignStat::Opens => self.opens += 1,
            CampaignStat::Clicks => self.clicks += 1,
            CampaignStat::Bounces => self.bounces += 1,
            CampaignStat::SpamReports => self.spam_reports += 1,
        }
    }
}

/// A registered campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRecord {
    /// Canonical identifier; new writes always use the raw string form.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stats: CampaignStats,
}

impl CampaignRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stats: CampaignStats::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_touches_only_the_named_counter() {
        let mut stats = CampaignStats::default();
        stats.bump(CampaignStat::Opens);
        stats.bump(CampaignStat::Opens);
        stats.bump(CampaignStat::SpamReports);
        assert_eq!(stats.opens, 2);
        assert_eq!(stats.clicks, 0);
        assert_eq!(stats.bounces, 0);
        assert_eq!(stats.spam_reports, 1);
    }
}
