//! Per-item repair pass.
//!
//! Runs only when the bulk pass left unresolved titles. Every item is revisited in list
//! order; its title goes through an ordered chain of strategies, and year/rating are looked
//! up once more. Results are merged back by position. A failure on one item is logged and
//! recorded, and the scan moves on.

use chrono::{DateTime, Local};
use topchart_core::{
    placeholder_title, strip_rank_prefix, ChartItem, Error, RepairedFields, Result, ResultSet,
    MAX_ITEMS, NO_RATING, RANK_DELIMITER, UNKNOWN,
};
use tracing::{debug, info, warn};

use crate::bulk::{best_effort, metadata_pair};

type TitleStrategy = fn(&dyn ChartItem, usize) -> Result<Option<String>>;

/// Tried in order; the first non-empty candidate wins.
const TITLE_STRATEGIES: &[(&str, TitleStrategy)] = &[
    ("heading", heading_title),
    ("anchor", anchor_title),
    ("text_scan", scanned_title),
];

/// Any of these, as a case-insensitive substring, marks a line as prose rather than metadata.
const FUNCTION_WORDS: [&str; 6] = ["the", "and", "of", "a", "in", "to"];

fn heading_title(item: &dyn ChartItem, rank: usize) -> Result<Option<String>> {
    Ok(best_effort(item.heading_text(), rank, "heading").map(|t| strip_rank_prefix(&t).to_string()))
}

fn anchor_title(item: &dyn ChartItem, rank: usize) -> Result<Option<String>> {
    Ok(best_effort(item.anchor_text(), rank, "anchor").map(|t| strip_rank_prefix(&t).to_string()))
}

fn scanned_title(item: &dyn ChartItem, _rank: usize) -> Result<Option<String>> {
    Ok(scan_title_lines(&item.visible_text()?))
}

fn is_numeric_ignoring_periods(line: &str) -> bool {
    let mut digits = line.chars().filter(|c| *c != '.').peekable();
    digits.peek().is_some() && digits.all(|c| c.is_ascii_digit())
}

fn looks_like_title(line: &str) -> bool {
    if line.chars().count() <= 10
        || is_numeric_ignoring_periods(line)
        || line.starts_with("Rate")
        || line.ends_with('m')
    {
        return false;
    }
    let lower = line.to_lowercase();
    FUNCTION_WORDS.iter().any(|w| lower.contains(w))
}

/// Pick a title out of an item's full visible text.
///
/// Lines are trimmed and blank ones dropped. The first line that passes [`looks_like_title`]
/// is used, minus any rank prefix, provided more than three characters remain; otherwise
/// the scan continues.
pub fn scan_title_lines(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| looks_like_title(l))
        .find_map(|line| {
            let candidate = match line.split_once(RANK_DELIMITER) {
                Some((_, rest)) => rest,
                None => line,
            };
            (candidate.chars().count() > 3).then(|| candidate.to_string())
        })
}

fn resolve_title(item: &dyn ChartItem, index: usize) -> Result<String> {
    let rank = index + 1;
    for (name, strategy) in TITLE_STRATEGIES {
        match strategy(item, rank)? {
            Some(t) if !t.is_empty() => {
                debug!(rank, strategy = *name, "title resolved");
                return Ok(t);
            }
            _ => debug!(rank, strategy = *name, "no title candidate"),
        }
    }
    Ok(placeholder_title(rank))
}

fn repair_item(item: &dyn ChartItem, index: usize) -> Result<RepairedFields> {
    let rank = index + 1;
    let title = resolve_title(item, index).map_err(|e| match e {
        Error::Item { .. } => e,
        other => Error::Item {
            index,
            message: other.to_string(),
        },
    })?;
    let (year, _) = metadata_pair(item, rank);
    let rating = best_effort(item.rating_text(), rank, "rating");
    Ok(RepairedFields {
        title,
        year: year.unwrap_or_else(|| UNKNOWN.to_string()),
        rating: rating.unwrap_or_else(|| NO_RATING.to_string()),
    })
}

#[derive(Debug, Default)]
pub struct RepairReport {
    pub repaired: usize,
    /// One `Error::Item` per position that could not be processed.
    pub failed: Vec<Error>,
}

/// Revisit up to [`MAX_ITEMS`] items and merge their recomputed fields into `set` by position.
pub fn repair_pass<I: ChartItem>(
    mut set: ResultSet,
    items: &[I],
    scraped_at: DateTime<Local>,
) -> (ResultSet, RepairReport) {
    info!("running per-item title repair");
    let mut report = RepairReport::default();
    for (index, item) in items.iter().take(MAX_ITEMS).enumerate() {
        match repair_item(item, index) {
            Ok(fields) => {
                info!(
                    "fixed: {:>3}. {} ({}) - {}",
                    index + 1,
                    fields.title,
                    fields.year,
                    fields.rating
                );
                set.merge_repaired(index, fields, scraped_at);
                report.repaired += 1;
            }
            Err(e) => {
                warn!(rank = index + 1, error = %e, "could not repair item; keeping bulk record");
                report.failed.push(e);
            }
        }
    }
    info!(
        repaired = report.repaired,
        failed = report.failed.len(),
        "title repair completed"
    );
    (set, report)
}
