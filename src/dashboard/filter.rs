//! Live text filter over the fetched records.

use crate::models::EmailRecord;

fn matches(record: &EmailRecord, needle: &str) -> bool {
    needle.is_empty()
        || record.subject.to_lowercase().contains(needle)
        || record.from.to_lowercase().contains(needle)
}

/// Records whose subject or sender contains `query`, ignoring case, in their
/// original order. The query is used as typed; an empty query keeps everything.
pub fn filter_records<'a>(records: &'a [EmailRecord], query: &str) -> Vec<&'a EmailRecord> {
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| matches(record, &needle))
        .collect()
}
