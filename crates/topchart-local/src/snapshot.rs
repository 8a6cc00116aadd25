use std::path::{Path, PathBuf};
use topchart_core::{ChartRenderer, Error, RenderRequest, RenderedChart, Result};

/// Serves a previously saved chart page from disk. No browser is involved, so there is no
/// per-item rendered text; the DOM adapter falls back to text nodes.
#[derive(Debug, Clone)]
pub struct SnapshotRenderer {
    path: PathBuf,
}

impl SnapshotRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl ChartRenderer for SnapshotRenderer {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    async fn render(&self, req: &RenderRequest) -> Result<RenderedChart> {
        let t0 = std::time::Instant::now();
        let html = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::NotConfigured(format!(
                "cannot read snapshot {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(RenderedChart {
            final_url: req.url.clone(),
            status: None,
            html,
            item_texts: Vec::new(),
            elapsed_ms: t0.elapsed().as_millis() as u64,
            mode: "snapshot".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrapeConfig;

    #[tokio::test]
    async fn reads_html_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("chart.html");
        std::fs::write(&p, "<html><body>chart</body></html>").unwrap();
        let page = SnapshotRenderer::new(&p)
            .render(&ScrapeConfig::default().render_request())
            .await
            .unwrap();
        assert_eq!(page.mode, "snapshot");
        assert!(page.html.contains("chart"));
        assert!(page.item_texts.is_empty());
    }

    #[tokio::test]
    async fn missing_snapshot_is_not_configured() {
        let err = SnapshotRenderer::new("/nonexistent/chart.html")
            .render(&ScrapeConfig::default().render_request())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }
}
