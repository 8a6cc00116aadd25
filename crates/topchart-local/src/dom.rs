use html_scraper::{ElementRef, Html, Selector};
use topchart_core::{ChartItem, Error, RenderedChart, Result};

pub const ITEM_SELECTOR: &str = "li.ipc-metadata-list-summary-item";
pub const HEADING_SELECTOR: &str = "h3.ipc-title__text";
pub const ANCHOR_SELECTOR: &str = "a[data-testid]";
pub const METADATA_SELECTOR: &str = ".cli-title-metadata";
pub const METADATA_FIELD_SELECTOR: &str = "span";
pub const RATING_SELECTOR: &str = "span.ipc-rating-star--rating";

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| Error::Config(format!("bad selector {s:?}: {e}")))
}

#[derive(Debug)]
pub struct ChartSelectors {
    item: Selector,
    heading: Selector,
    anchor: Selector,
    metadata: Selector,
    metadata_field: Selector,
    rating: Selector,
}

impl ChartSelectors {
    pub fn new() -> Result<Self> {
        Ok(Self {
            item: selector(ITEM_SELECTOR)?,
            heading: selector(HEADING_SELECTOR)?,
            anchor: selector(ANCHOR_SELECTOR)?,
            metadata: selector(METADATA_SELECTOR)?,
            metadata_field: selector(METADATA_FIELD_SELECTOR)?,
            rating: selector(RATING_SELECTOR)?,
        })
    }
}

/// A parsed chart page plus the renderer's per-item visible text, when it captured any.
pub struct ChartDocument {
    html: Html,
    item_texts: Vec<String>,
    selectors: ChartSelectors,
}

impl ChartDocument {
    pub fn parse(html: &str, item_texts: Vec<String>) -> Result<Self> {
        Ok(Self {
            html: Html::parse_document(html),
            item_texts,
            selectors: ChartSelectors::new()?,
        })
    }

    pub fn from_rendered(page: RenderedChart) -> Result<Self> {
        Self::parse(&page.html, page.item_texts)
    }

    pub fn item_count(&self) -> usize {
        self.html.select(&self.selectors.item).count()
    }

    /// List items in document order, at most `max`.
    pub fn items(&self, max: usize) -> Vec<DomItem<'_>> {
        self.html
            .select(&self.selectors.item)
            .take(max)
            .enumerate()
            .map(|(i, el)| DomItem {
                el,
                selectors: &self.selectors,
                inner_text: self.item_texts.get(i).map(String::as_str),
            })
            .collect()
    }
}

pub struct DomItem<'a> {
    el: ElementRef<'a>,
    selectors: &'a ChartSelectors,
    inner_text: Option<&'a str>,
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

impl<'a> DomItem<'a> {
    fn first(&self, sel: &Selector) -> Option<ElementRef<'a>> {
        self.el.select(sel).next()
    }
}

impl ChartItem for DomItem<'_> {
    fn heading_text(&self) -> Result<Option<String>> {
        Ok(self.first(&self.selectors.heading).map(text_of))
    }

    fn anchor_text(&self) -> Result<Option<String>> {
        Ok(self.first(&self.selectors.anchor).map(text_of))
    }

    fn metadata_fields(&self) -> Result<Vec<String>> {
        let Some(meta) = self.first(&self.selectors.metadata) else {
            return Ok(Vec::new());
        };
        Ok(meta.select(&self.selectors.metadata_field).map(text_of).collect())
    }

    fn rating_text(&self) -> Result<Option<String>> {
        Ok(self.first(&self.selectors.rating).map(text_of))
    }

    fn visible_text(&self) -> Result<String> {
        if let Some(t) = self.inner_text.filter(|t| !t.trim().is_empty()) {
            return Ok(t.to_string());
        }
        // Static snapshot: one line per non-empty text node.
        let lines: Vec<&str> = self
            .el
            .text()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        Ok(lines.join("\n"))
    }
}
