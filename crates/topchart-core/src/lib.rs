use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize, Serializer};

/// The chart never lists more than this many entries; extra DOM items are ignored.
pub const MAX_ITEMS: usize = 250;
/// Sentinel for title/year/duration values that could not be recovered.
pub const UNKNOWN: &str = "Unknown";
/// Sentinel for a missing rating.
pub const NO_RATING: &str = "N/A";
/// Positional placeholder titles look like `#17`.
pub const PLACEHOLDER_PREFIX: char = '#';
/// Separator between the rank number and the title in heading text (`"12. The Matrix"`).
pub const RANK_DELIMITER: &str = ". ";
/// Display format for `scraped_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("page not ready: {0}")]
    PageNotReady(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("item {index} failed: {message}")]
    Item { index: usize, message: String },
    #[error("no records to save")]
    EmptyResult,
    #[error("output failed: {0}")]
    Output(String),
    #[error("invalid config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Drop a leading rank number from heading text.
///
/// Everything after the *first* `". "` is kept; text without the delimiter is returned as is.
/// Titles that contain `". "` themselves are cut too; the heading text gives no way to tell.
pub fn strip_rank_prefix(raw: &str) -> &str {
    match raw.split_once(RANK_DELIMITER) {
        Some((_, rest)) => rest,
        None => raw,
    }
}

pub fn placeholder_title(rank: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{rank}")
}

/// True for titles the bulk pass could not resolve (`"Unknown"` or a `#<rank>` placeholder).
pub fn is_unresolved_title(title: &str) -> bool {
    title == UNKNOWN || title.starts_with(PLACEHOLDER_PREFIX)
}

pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn serialize_timestamp<S: Serializer>(
    ts: &DateTime<Local>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(ts))
}

/// One ranked chart entry. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieRecord {
    pub rank: usize,
    pub title: String,
    pub year: String,
    pub duration: String,
    #[serde(rename = "imdb_rating")]
    pub rating: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub scraped_at: DateTime<Local>,
}

impl MovieRecord {
    /// A record with every field at its sentinel.
    pub fn unresolved(rank: usize, scraped_at: DateTime<Local>) -> Self {
        Self {
            rank,
            title: UNKNOWN.to_string(),
            year: UNKNOWN.to_string(),
            duration: UNKNOWN.to_string(),
            rating: NO_RATING.to_string(),
            scraped_at,
        }
    }

    pub fn has_proper_title(&self) -> bool {
        !is_unresolved_title(&self.title)
    }

    pub fn has_proper_year(&self) -> bool {
        self.year != UNKNOWN
    }
}

/// Fields recomputed for one position by the repair pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedFields {
    pub title: String,
    pub year: String,
    pub rating: String,
}

/// Ordered chart records; position `i` always holds rank `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    records: Vec<MovieRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            records: Vec::with_capacity(n),
        }
    }

    /// Append the next record. Its rank must match its position.
    pub fn push(&mut self, record: MovieRecord) {
        debug_assert_eq!(record.rank, self.records.len() + 1);
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MovieRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MovieRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[MovieRecord] {
        &self.records
    }

    pub fn unresolved_titles(&self) -> usize {
        self.records
            .iter()
            .filter(|r| is_unresolved_title(&r.title))
            .count()
    }

    pub fn proper_titles(&self) -> usize {
        self.records.iter().filter(|r| r.has_proper_title()).count()
    }

    pub fn proper_years(&self) -> usize {
        self.records.iter().filter(|r| r.has_proper_year()).count()
    }

    /// Positional merge of repaired fields into `index`.
    ///
    /// An existing record keeps its rank, duration and timestamp. A position past the end is
    /// appended; any gap before it is filled with placeholder records so ranks stay positional.
    pub fn merge_repaired(
        &mut self,
        index: usize,
        fields: RepairedFields,
        scraped_at: DateTime<Local>,
    ) {
        if let Some(rec) = self.records.get_mut(index) {
            rec.title = fields.title;
            rec.year = fields.year;
            rec.rating = fields.rating;
            return;
        }
        while self.records.len() < index {
            let rank = self.records.len() + 1;
            let mut gap = MovieRecord::unresolved(rank, scraped_at);
            gap.title = placeholder_title(rank);
            self.records.push(gap);
        }
        self.records.push(MovieRecord {
            rank: index + 1,
            title: fields.title,
            year: fields.year,
            duration: UNKNOWN.to_string(),
            rating: fields.rating,
            scraped_at,
        });
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a MovieRecord;
    type IntoIter = std::slice::Iter<'a, MovieRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// One entry of the chart list, as seen by the extraction passes.
///
/// `Ok(None)` means the sub-element is absent; `Err` means the lookup itself failed.
pub trait ChartItem {
    /// Text of the title heading, trimmed (still carries the rank prefix).
    fn heading_text(&self) -> Result<Option<String>>;
    /// Text content of the secondary title anchor, trimmed.
    fn anchor_text(&self) -> Result<Option<String>>;
    /// Trimmed texts of the metadata sub-fields (year, duration, certificate...).
    fn metadata_fields(&self) -> Result<Vec<String>>;
    /// Rating display text, trimmed.
    fn rating_text(&self) -> Result<Option<String>>;
    /// The whole rendered text of the item, one visual line per `\n`.
    fn visible_text(&self) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub url: String,
    pub headless: bool,
    /// How long to wait for the first list item to appear.
    pub wait_timeout_ms: u64,
    /// Extra settle delay after the list appears.
    pub settle_ms: u64,
    pub item_selector: String,
    pub max_items: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub final_url: String,
    pub status: Option<u16>,
    pub html: String,
    /// Rendered `innerText` of each list item, in list order (may be empty).
    pub item_texts: Vec<String>,
    pub elapsed_ms: u64,
    pub mode: String,
}

/// Produces a loaded chart page. Implementations own the browser and release it before returning.
#[async_trait::async_trait]
pub trait ChartRenderer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn render(&self, req: &RenderRequest) -> Result<RenderedChart>;
}
