use chrono::{DateTime, Local};
use topchart_core::{ChartItem, ChartRenderer, Error, Result, ResultSet, MAX_ITEMS};
use tracing::info;

pub mod bulk;
pub mod config;
pub mod dom;
pub mod export;
pub mod render_playwright;
pub mod repair;
pub mod snapshot;
#[cfg(test)]
pub(crate) mod testutil;

pub use config::ScrapeConfig;
pub use dom::ChartDocument;
pub use render_playwright::PlaywrightRenderer;
pub use repair::RepairReport;
pub use snapshot::SnapshotRenderer;

/// Outcome of the bulk pass and, when it ran, the repair pass.
#[derive(Debug)]
pub struct PassReport {
    pub set: ResultSet,
    /// Unresolved titles left by the bulk pass; the repair pass runs only when this is non-zero.
    pub unresolved_after_bulk: usize,
    pub repair: Option<RepairReport>,
    pub scraped_at: DateTime<Local>,
}

/// Pick the renderer for `cfg`: a saved snapshot when configured, else a Playwright browser.
pub fn renderer_for(cfg: &ScrapeConfig) -> Box<dyn ChartRenderer> {
    match &cfg.snapshot_html {
        Some(p) => Box::new(SnapshotRenderer::new(p.clone())),
        None => Box::new(PlaywrightRenderer::from_env()),
    }
}

/// Bulk pass, quality gate, then the repair pass if any title is unresolved.
pub fn extract_chart<I: ChartItem>(items: &[I], scraped_at: DateTime<Local>) -> PassReport {
    let set = bulk::bulk_extract(items, scraped_at);
    info!("bulk pass extracted {} records", set.len());

    let unresolved = set.unresolved_titles();
    if unresolved == 0 {
        return PassReport {
            set,
            unresolved_after_bulk: 0,
            repair: None,
            scraped_at,
        };
    }

    info!("{unresolved} records have missing titles; running repair pass");
    let (set, report) = repair::repair_pass(set, items, scraped_at);
    PassReport {
        set,
        unresolved_after_bulk: unresolved,
        repair: Some(report),
        scraped_at,
    }
}

/// Load the chart with `renderer` and run both extraction passes over it.
///
/// A page without any list item is fatal (`Error::PageNotReady`).
pub async fn scrape_chart(renderer: &dyn ChartRenderer, cfg: &ScrapeConfig) -> Result<PassReport> {
    let req = cfg.render_request();
    info!(renderer = renderer.name(), url = %req.url, "loading chart page");
    let page = renderer.render(&req).await?;
    info!(
        elapsed_ms = page.elapsed_ms,
        mode = %page.mode,
        "page loaded; starting extraction"
    );

    let doc = ChartDocument::from_rendered(page)?;
    let items = doc.items(MAX_ITEMS);
    if items.is_empty() {
        return Err(Error::PageNotReady(format!(
            "no list items ({}) located",
            dom::ITEM_SELECTOR
        )));
    }
    // One timestamp for the whole run.
    let scraped_at = Local::now();
    Ok(extract_chart(&items, scraped_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeItem;
    use topchart_core::{RenderRequest, RenderedChart};

    #[test]
    fn clean_bulk_pass_skips_repair() {
        let items = vec![
            FakeItem::full(1, "The Shawshank Redemption", "1994", "2h 22m", "9.3"),
            FakeItem::full(2, "The Godfather", "1972", "2h 55m", "9.2"),
        ];
        let report = extract_chart(&items, Local::now());
        assert!(report.repair.is_none());
        assert_eq!(report.unresolved_after_bulk, 0);
        assert_eq!(report.set.len(), 2);
        assert!(items.iter().all(|i| i.repair_lookups() == 0));
    }

    #[test]
    fn unresolved_title_triggers_repair() {
        let mut missing = FakeItem::full(2, "x", "1972", "2h 55m", "9.2");
        missing.heading = None;
        missing.text = "The Godfather and Family".to_string();
        let items = vec![
            FakeItem::full(1, "The Shawshank Redemption", "1994", "2h 22m", "9.3"),
            missing,
        ];
        let report = extract_chart(&items, Local::now());
        assert_eq!(report.unresolved_after_bulk, 1);
        let repair = report.repair.expect("repair ran");
        assert_eq!(repair.repaired, 2);
        assert_eq!(report.set.get(1).unwrap().title, "The Godfather and Family");
    }

    #[test]
    fn empty_list_gives_empty_set() {
        let report = extract_chart::<FakeItem>(&[], Local::now());
        assert!(report.set.is_empty());
        assert!(report.repair.is_none());
    }

    struct StaticRenderer(&'static str);

    #[async_trait::async_trait]
    impl ChartRenderer for StaticRenderer {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn render(&self, req: &RenderRequest) -> Result<RenderedChart> {
            Ok(RenderedChart {
                final_url: req.url.clone(),
                status: Some(200),
                html: self.0.to_string(),
                item_texts: vec!["1. Ikiru\n1952\n2h 23m\n8.3".to_string()],
                elapsed_ms: 1,
                mode: "static".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn scrape_runs_passes_over_rendered_dom() {
        let html = r#"<ul>
          <li class="ipc-metadata-list-summary-item">
            <div class="cli-title-metadata"><span>1952</span><span>2h 23m</span></div>
            <span class="ipc-rating-star--rating">8.3</span>
          </li>
        </ul>"#;
        let report = scrape_chart(&StaticRenderer(html), &ScrapeConfig::default())
            .await
            .unwrap();
        // No heading or anchor, and "1. Ikiru" is too short for the text scan.
        let r = report.set.get(0).unwrap();
        assert_eq!(r.title, "#1");
        assert_eq!(r.year, "1952");
        assert_eq!(r.duration, "2h 23m");
        assert_eq!(r.rating, "8.3");
    }

    #[tokio::test]
    async fn page_without_items_is_fatal() {
        let err = scrape_chart(&StaticRenderer("<html><body></body></html>"), &ScrapeConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PageNotReady(_)));
    }
}
