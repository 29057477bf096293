//! Plain-text rendering of a [`Dashboard`] for terminals.

use std::fmt::Write;

use super::stats::percentage;
use super::{Dashboard, LoadState};

/// Days of trend shown, most recent last.
pub const TREND_WINDOW_DAYS: usize = 10;

const SUBJECT_WIDTH: usize = 40;
const SENDER_WIDTH: usize = 28;

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub fn render_text(dashboard: &Dashboard) -> String {
    let mut out = String::new();

    match dashboard.state() {
        LoadState::Loading => {
            out.push_str("Analyzing inbox...\n");
            return out;
        }
        LoadState::LoadFailed => out.push_str("(emails could not be loaded)\n\n"),
        LoadState::Loaded => {}
    }

    let stats = dashboard.stats();
    let _ = writeln!(
        out,
        "Inbox volume: {}  High priority: {}  Action items: {}  Positive sentiment: {}%",
        stats.total, stats.high_priority, stats.action_needed, stats.positive_pct
    );

    out.push_str("\nCategory mix\n");
    for (category, count) in dashboard.category_counts() {
        let _ = writeln!(
            out,
            "  {:<10} {:>4}  {:>3}%",
            category.to_string(),
            count,
            percentage(*count, stats.total)
        );
    }

    out.push_str("\nTraffic per day\n");
    let trend = dashboard.trend();
    let start = trend.len().saturating_sub(TREND_WINDOW_DAYS);
    for point in &trend[start..] {
        let _ = writeln!(out, "  {}  {:>4}  {}", point.day, point.count, "#".repeat(point.count.min(50)));
    }

    let visible = dashboard.visible();
    if dashboard.query().is_empty() {
        let _ = writeln!(out, "\nRecent communication ({})", visible.len());
    } else {
        let _ = writeln!(
            out,
            "\nRecent communication matching '{}' ({})",
            dashboard.query(),
            visible.len()
        );
    }
    let _ = writeln!(
        out,
        "  {:<sw$}  {:<fw$}  {:<8}  {:<10}  {}",
        "Subject",
        "From",
        "Priority",
        "Category",
        "Action",
        sw = SUBJECT_WIDTH,
        fw = SENDER_WIDTH
    );
    for record in visible {
        let _ = writeln!(
            out,
            "  {:<sw$}  {:<fw$}  {:<8}  {:<10}  {}",
            truncate(&record.subject, SUBJECT_WIDTH),
            truncate(&record.from, SENDER_WIDTH),
            record.priority.to_string(),
            record.category.to_string(),
            record.action_required,
            sw = SUBJECT_WIDTH,
            fw = SENDER_WIDTH
        );
    }

    out
}
