use std::path::{Path, PathBuf};
use topchart_core::{format_timestamp, Error, MovieRecord, Result, ResultSet};
use tracing::{debug, info};

/// Output column order.
pub const COLUMNS: [&str; 6] = [
    "rank",
    "title",
    "year",
    "duration",
    "imdb_rating",
    "scraped_at",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSummary {
    pub path: PathBuf,
    pub total: usize,
    pub proper_titles: usize,
    pub proper_years: usize,
}

fn output_err(e: impl std::fmt::Display) -> Error {
    Error::Output(e.to_string())
}

/// Write `set` as CSV (header row, fixed columns) to `path`.
///
/// An empty set is `Error::EmptyResult` and leaves the filesystem untouched. Rows are
/// written to a temp file next to `path` and renamed into place, so a failed write never
/// leaves a partial file behind.
pub fn write_csv(set: &ResultSet, path: &Path) -> Result<SaveSummary> {
    if set.is_empty() {
        return Err(Error::EmptyResult);
    }
    debug!("exporting {} records to CSV: {}", set.len(), path.display());

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".topchart-")
        .suffix(".csv.tmp")
        .tempfile_in(dir)
        .map_err(output_err)?;
    {
        let mut wtr = csv::Writer::from_writer(tmp.as_file_mut());
        wtr.write_record(COLUMNS).map_err(output_err)?;
        for rec in set {
            wtr.write_record(row(rec)).map_err(output_err)?;
        }
        wtr.flush().map_err(output_err)?;
    }
    tmp.persist(path).map_err(|e| output_err(e.error))?;

    let summary = SaveSummary {
        path: path.to_path_buf(),
        total: set.len(),
        proper_titles: set.proper_titles(),
        proper_years: set.proper_years(),
    };
    info!("saved {} records to {}", summary.total, path.display());
    Ok(summary)
}

fn row(rec: &MovieRecord) -> [String; 6] {
    [
        rec.rank.to_string(),
        rec.title.clone(),
        rec.year.clone(),
        rec.duration.clone(),
        rec.rating.clone(),
        format_timestamp(&rec.scraped_at),
    ]
}

/// Fixed-width console rendering of `records` under the CSV column names.
pub fn preview_table(records: &[MovieRecord]) -> String {
    let rows: Vec<[String; 6]> = records.iter().map(row).collect();
    let mut widths = COLUMNS.map(str::len);
    for r in &rows {
        for (w, cell) in widths.iter_mut().zip(r.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    for cells in std::iter::once(header).chain(rows.into_iter().map(Vec::from)) {
        let line: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .enumerate()
            .map(|(i, (c, &w))| {
                if i == 0 {
                    format!("{c:>w$}")
                } else {
                    format!("{c:<w$}")
                }
            })
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}
