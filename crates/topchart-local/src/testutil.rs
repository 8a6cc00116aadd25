use std::cell::Cell;
use topchart_core::{ChartItem, Error, Result};

/// Scriptable list item for pass-level tests.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeItem {
    pub heading: Option<String>,
    pub anchor: Option<String>,
    pub metadata: Vec<String>,
    pub rating: Option<String>,
    pub text: String,
    pub fail_heading: bool,
    pub fail_anchor: bool,
    pub fail_text: bool,
    pub anchor_calls: Cell<usize>,
    pub text_calls: Cell<usize>,
}

impl FakeItem {
    pub fn full(rank: usize, title: &str, year: &str, duration: &str, rating: &str) -> Self {
        Self {
            heading: Some(format!("{rank}. {title}")),
            metadata: vec![year.to_string(), duration.to_string()],
            rating: Some(rating.to_string()),
            ..Self::default()
        }
    }

    pub fn headless_item(text: &str) -> Self {
        Self {
            metadata: vec!["1966".to_string(), "2h 58m".to_string()],
            rating: Some("8.8".to_string()),
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn repair_lookups(&self) -> usize {
        self.anchor_calls.get() + self.text_calls.get()
    }
}

fn boom(what: &str) -> Error {
    Error::Render(format!("{what} lookup detached"))
}

impl ChartItem for FakeItem {
    fn heading_text(&self) -> Result<Option<String>> {
        if self.fail_heading {
            return Err(boom("heading"));
        }
        Ok(self.heading.clone())
    }

    fn anchor_text(&self) -> Result<Option<String>> {
        self.anchor_calls.set(self.anchor_calls.get() + 1);
        if self.fail_anchor {
            return Err(boom("anchor"));
        }
        Ok(self.anchor.clone())
    }

    fn metadata_fields(&self) -> Result<Vec<String>> {
        Ok(self.metadata.clone())
    }

    fn rating_text(&self) -> Result<Option<String>> {
        Ok(self.rating.clone())
    }

    fn visible_text(&self) -> Result<String> {
        self.text_calls.set(self.text_calls.get() + 1);
        if self.fail_text {
            return Err(boom("text"));
        }
        Ok(self.text.clone())
    }
}
