//! Client-side view over the query endpoint.
//!
//! A [`Dashboard`] fetches the recent records once and keeps everything else
//! (headline stats, category mix, daily trend, filtered table) derived from
//! that in-memory set. Changing the filter never refetches.

pub mod client;
pub mod filter;
pub mod render;
pub mod stats;

pub use client::{ClientError, DashboardClient};
pub use filter::filter_records;
pub use render::render_text;
pub use stats::{CategoryCounts, DailyVolume, DashboardStats, category_counts, daily_volume};

use crate::models::EmailRecord;

/// How the one-shot fetch went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded,
    /// The fetch failed; the view stays empty and nothing is retried.
    LoadFailed,
}

/// Values recomputed whenever the record set changes.
#[derive(Debug, Clone, Default)]
struct Derived {
    stats: DashboardStats,
    categories: CategoryCounts,
    trend: Vec<DailyVolume>,
}

impl Derived {
    fn from_records(records: &[EmailRecord]) -> Self {
        Self {
            stats: DashboardStats::from_records(records),
            categories: category_counts(records),
            trend: daily_volume(records),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    state: LoadState,
    records: Vec<EmailRecord>,
    derived: Derived,
    query: String,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    /// A dashboard that has not received data yet.
    pub fn new() -> Self {
        Self {
            state: LoadState::Loading,
            records: Vec::new(),
            derived: Derived::default(),
            query: String::new(),
        }
    }

    /// Fetch once through `client` and settle into `Loaded` or `LoadFailed`.
    pub async fn load(client: &DashboardClient) -> Self {
        let mut dashboard = Self::new();
        dashboard.finish_loading(client.fetch_emails().await);
        dashboard
    }

    /// Apply the outcome of the fetch. Only the first outcome counts.
    pub fn finish_loading(&mut self, outcome: Result<Vec<EmailRecord>, ClientError>) {
        if self.state != LoadState::Loading {
            log::debug!("ignoring fetch outcome, dashboard already {:?}", self.state);
            return;
        }

        match outcome {
            Ok(records) => {
                log::info!("dashboard loaded {} records", records.len());
                self.set_records(records);
                self.state = LoadState::Loaded;
            }
            Err(err) => {
                log::warn!("dashboard failed to load emails: {}", err);
                self.set_records(Vec::new());
                self.state = LoadState::LoadFailed;
            }
        }
    }

    fn set_records(&mut self, records: Vec<EmailRecord>) {
        self.derived = Derived::from_records(&records);
        self.records = records;
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn records(&self) -> &[EmailRecord] {
        &self.records
    }

    pub fn stats(&self) -> DashboardStats {
        self.derived.stats
    }

    pub fn category_counts(&self) -> &CategoryCounts {
        &self.derived.categories
    }

    pub fn trend(&self) -> &[DailyVolume] {
        &self.derived.trend
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Records matching the current query, newest first as fetched.
    pub fn visible(&self) -> Vec<&EmailRecord> {
        filter_records(&self.records, &self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Priority, Sentiment, YesNo};
    use crate::test_support::sample_record;
    use reqwest::StatusCode;

    #[test]
    fn starts_loading_and_settles_on_success() {
        let mut dashboard = Dashboard::new();
        assert!(dashboard.is_loading());

        let mut record = sample_record("Budget review", "cfo@co.com");
        record.priority = Priority::High;
        record.category = Category::Finance;
        record.action_required = YesNo::Yes;
        record.sentiment = Sentiment::Negative;
        dashboard.finish_loading(Ok(vec![record]));

        assert_eq!(dashboard.state(), LoadState::Loaded);
        let stats = dashboard.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.high_priority, 1);
        assert_eq!(stats.action_needed, 1);
        assert_eq!(stats.positive_pct, 0);
        assert_eq!(dashboard.category_counts().get(&Category::Finance), Some(&1));
        assert_eq!(dashboard.trend().len(), 1);
    }

    #[test]
    fn failed_fetch_degrades_to_empty_view() {
        let mut dashboard = Dashboard::new();
        dashboard.finish_loading(Err(ClientError::Status {
            url: "http://localhost/api/emails".into(),
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        }));

        assert_eq!(dashboard.state(), LoadState::LoadFailed);
        assert!(dashboard.records().is_empty());
        assert!(dashboard.visible().is_empty());
        assert_eq!(dashboard.stats(), DashboardStats::default());
        assert!(dashboard.category_counts().is_empty());

        // A late success does not resurrect a failed load.
        dashboard.finish_loading(Ok(vec![sample_record("late", "x@y.z")]));
        assert_eq!(dashboard.state(), LoadState::LoadFailed);
        assert!(dashboard.records().is_empty());
    }

    #[test]
    fn query_filters_without_touching_stats() {
        let mut dashboard = Dashboard::new();
        dashboard.finish_loading(Ok(vec![
            sample_record("Lunch?", "Alice@Example.com"),
            sample_record("Invoice", "bob@example.com"),
        ]));

        dashboard.set_query("alice");
        let visible = dashboard.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].from, "Alice@Example.com");
        assert_eq!(dashboard.stats().total, 2);

        dashboard.set_query("");
        assert_eq!(dashboard.visible().len(), 2);
    }
}
