use chrono::{DateTime, Local};
use topchart_core::{strip_rank_prefix, ChartItem, MovieRecord, Result, ResultSet, MAX_ITEMS};
use tracing::{debug, info};

/// Resolve a lookup to its value, treating a failed lookup like a missing element.
pub(crate) fn best_effort<T>(r: Result<Option<T>>, rank: usize, lookup: &str) -> Option<T> {
    r.unwrap_or_else(|e| {
        debug!(rank, lookup, error = %e, "lookup failed; using sentinel");
        None
    })
}

/// Year and duration are the first two metadata sub-fields.
pub(crate) fn metadata_pair<I: ChartItem + ?Sized>(
    item: &I,
    rank: usize,
) -> (Option<String>, Option<String>) {
    let fields = best_effort(item.metadata_fields().map(Some), rank, "metadata").unwrap_or_default();
    let mut fields = fields.into_iter();
    (fields.next(), fields.next())
}

fn extract_record<I: ChartItem>(item: &I, rank: usize, scraped_at: DateTime<Local>) -> MovieRecord {
    let mut rec = MovieRecord::unresolved(rank, scraped_at);
    if let Some(t) = best_effort(item.heading_text(), rank, "heading") {
        rec.title = strip_rank_prefix(&t).to_string();
    }
    let (year, duration) = metadata_pair(item, rank);
    if let Some(y) = year {
        rec.year = y;
    }
    if let Some(d) = duration {
        rec.duration = d;
    }
    if let Some(r) = best_effort(item.rating_text(), rank, "rating") {
        rec.rating = r;
    }
    rec
}

/// Single pass over the list: one record per item (capped at [`MAX_ITEMS`]), ranked by position.
pub fn bulk_extract<I: ChartItem>(items: &[I], scraped_at: DateTime<Local>) -> ResultSet {
    let mut set = ResultSet::with_capacity(items.len().min(MAX_ITEMS));
    for (i, item) in items.iter().take(MAX_ITEMS).enumerate() {
        let rec = extract_record(item, i + 1, scraped_at);
        info!(
            "{:>3}. {} ({}) - {}",
            rec.rank, rec.title, rec.year, rec.rating
        );
        set.push(rec);
    }
    set
}
