use std::time::Duration;
use tokio::io::AsyncWriteExt;
use topchart_core::{ChartRenderer, Error, RenderRequest, RenderedChart, Result};
use tracing::debug;

use crate::config::{env, env_truthy, env_u64};

/// Extra wall-clock allowance on top of the list wait (browser launch, navigation, settle).
const HARD_TIMEOUT_SLACK_MS: u64 = 30_000;
const DEFAULT_MAX_HTML_CHARS: u64 = 5_000_000;

fn node_path_candidates() -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    if let Some(home) = std::env::var_os("HOME").map(std::path::PathBuf::from) {
        out.push(
            home.join(".npm-global")
                .join("lib")
                .join("node_modules")
                .to_string_lossy()
                .to_string(),
        );
    }
    out.push("/opt/homebrew/lib/node_modules".to_string());
    out.push("/usr/local/lib/node_modules".to_string());
    out.push("/usr/lib/node_modules".to_string());
    out
}

fn has_playwright(root: &str) -> bool {
    root.split(':')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .any(|p| std::path::Path::new(p).join("playwright").is_dir())
}

fn npm_root_g() -> Option<String> {
    let out = std::process::Command::new("npm")
        .args(["root", "-g"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if !s.is_empty() && has_playwright(&s) {
        Some(s)
    } else {
        None
    }
}

/// NODE_PATH value that lets `require('playwright')` find a global install, if one is needed.
fn detect_node_path_for_playwright() -> Option<String> {
    if let Some(v) = env("TOPCHART_NODE_PATH") {
        return Some(v);
    }

    let existing = std::env::var("NODE_PATH").ok().unwrap_or_default();
    if has_playwright(&existing) {
        return None;
    }

    let found = npm_root_g().or_else(|| {
        node_path_candidates()
            .into_iter()
            .find(|root| has_playwright(root))
    })?;

    if existing.trim().is_empty() {
        Some(found)
    } else {
        Some(format!("{existing}:{found}"))
    }
}

// Expected setup: Node.js, the `playwright` npm package, and Chromium
// (`npx playwright install chromium`). stdout carries exactly one JSON object.
const JS: &str = r#"
const fs = require('fs');

function ok(obj) { process.stdout.write(JSON.stringify(obj)); }
function bad(code, message, hint) { ok({ ok: false, error: { code, message, hint } }); }

async function main() {
  let arg = '';
  try { arg = fs.readFileSync(0, 'utf8'); } catch (_) {}
  let req;
  try { req = JSON.parse(arg); } catch (e) { return bad('invalid_params', 'bad JSON args', 'Internal error: could not parse render args.'); }

  let pw;
  try { pw = require('playwright'); } catch (e) {
    return bad('not_configured',
      'Playwright is not installed for Node.js (require(\"playwright\") failed)',
      'Install Playwright (Node): `npm i -g playwright` and then `npx playwright install chromium`.');
  }

  const url = String(req.url || '').trim();
  if (!url) return bad('invalid_params', 'url must be non-empty', 'Set TOPCHART_URL to an absolute URL.');
  const itemSelector = String(req.item_selector || '').trim();
  if (!itemSelector) return bad('invalid_params', 'item_selector must be non-empty', 'Internal error: missing list item selector.');

  const waitMs = Number(req.wait_timeout_ms || 20000);
  const settleMs = Number(req.settle_ms || 0);
  const maxItems = Number(req.max_items || 250);
  const headless = req.headless !== false;

  const t0 = Date.now();
  let browser;
  try {
    browser = await pw.chromium.launch({
      headless,
      args: ['--no-sandbox', '--disable-dev-shm-usage', '--disable-blink-features=AutomationControlled'],
    });
    const contextOpts = { serviceWorkers: 'block' };
    if (req.user_agent) contextOpts.userAgent = String(req.user_agent);
    const context = await browser.newContext(contextOpts);
    const page = await context.newPage();
    try {
      await page.route('**/*', (route) => {
        const r = route.request();
        const rt = r && r.resourceType ? r.resourceType() : '';
        if (rt === 'image' || rt === 'media' || rt === 'font') return route.abort();
        return route.continue();
      });
    } catch (_) {}

    const resp = await page.goto(url, { waitUntil: 'domcontentloaded', timeout: waitMs });
    try {
      await page.waitForSelector(itemSelector, { state: 'attached', timeout: waitMs });
    } catch (e) {
      return bad('not_ready',
        'no list items (' + itemSelector + ') located within ' + waitMs + 'ms',
        'The chart layout may have changed, or the site is blocking automated browsers.');
    }
    if (settleMs > 0) { try { await page.waitForTimeout(settleMs); } catch (_) {} }

    const html = await page.content();
    const itemTexts = await page.$$eval(itemSelector,
      (els, n) => els.slice(0, n).map((e) => e.innerText || ''), maxItems);
    ok({
      ok: true,
      mode: headless ? 'headless' : 'headed',
      final_url: page.url(),
      status: resp ? resp.status() : null,
      html,
      item_texts: itemTexts,
      elapsed_ms: Date.now() - t0,
    });
  } catch (e) {
    bad('render_failed', String(e && e.message ? e.message : e), 'Playwright render failed. Try a longer TOPCHART_WAIT_TIMEOUT_MS.');
  } finally {
    try { if (browser) await browser.close(); } catch (_) {}
  }
}

main().catch((e) => bad('render_failed', String(e && e.message ? e.message : e), 'Playwright render failed.'));
"#;

/// Renders the chart in Chromium through a short-lived Node + Playwright child process.
///
/// The browser lives entirely inside the child: the script closes it in a `finally`, and the
/// child itself is killed if the Rust side times out or drops the future.
#[derive(Debug, Clone)]
pub struct PlaywrightRenderer {
    node_bin: String,
    hard_timeout_ms: Option<u64>,
    max_html_chars: usize,
    disabled: bool,
}

impl Default for PlaywrightRenderer {
    fn default() -> Self {
        Self {
            node_bin: "node".to_string(),
            hard_timeout_ms: None,
            max_html_chars: DEFAULT_MAX_HTML_CHARS as usize,
            disabled: false,
        }
    }
}

impl PlaywrightRenderer {
    pub fn from_env() -> Self {
        Self {
            node_bin: env("TOPCHART_NODE").unwrap_or_else(|| "node".to_string()),
            hard_timeout_ms: env("TOPCHART_RENDER_HARD_TIMEOUT_MS").and_then(|s| s.parse().ok()),
            max_html_chars: env_u64("TOPCHART_RENDER_MAX_HTML_CHARS", DEFAULT_MAX_HTML_CHARS)
                as usize,
            disabled: env_truthy("TOPCHART_RENDER_DISABLE"),
        }
    }

    fn hard_timeout(&self, req: &RenderRequest) -> Duration {
        let ms = self.hard_timeout_ms.unwrap_or_else(|| {
            req.wait_timeout_ms
                .saturating_add(req.settle_ms)
                .saturating_add(HARD_TIMEOUT_SLACK_MS)
        });
        Duration::from_millis(ms)
    }
}

#[async_trait::async_trait]
impl ChartRenderer for PlaywrightRenderer {
    fn name(&self) -> &'static str {
        "playwright"
    }

    async fn render(&self, req: &RenderRequest) -> Result<RenderedChart> {
        if self.disabled {
            return Err(Error::NotConfigured(
                "render backend disabled (TOPCHART_RENDER_DISABLE)".to_string(),
            ));
        }
        render_chart_playwright(self, req).await
    }
}

fn not_configured(e: std::io::Error) -> Error {
    Error::NotConfigured(format!(
        "Playwright render requires Node.js (`node`) and the Playwright npm package: {e}"
    ))
}

async fn render_chart_playwright(
    cfg: &PlaywrightRenderer,
    req: &RenderRequest,
) -> Result<RenderedChart> {
    let t0 = std::time::Instant::now();
    let args_json =
        serde_json::to_string(req).map_err(|e| Error::Render(format!("render args: {e}")))?;
    let hard_timeout = cfg.hard_timeout(req);

    let mut cmd = tokio::process::Command::new(&cfg.node_bin);
    if let Some(node_path) = detect_node_path_for_playwright() {
        debug!(node_path = %node_path, "using detected NODE_PATH");
        cmd.env("NODE_PATH", node_path);
    }
    let mut child = cmd
        .arg("-e")
        .arg(JS)
        .kill_on_drop(true)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(not_configured)?;

    if let Some(mut stdin) = child.stdin.take() {
        // A failed write surfaces as a JSON parse error from the script.
        let _ = stdin.write_all(args_json.as_bytes()).await;
        let _ = stdin.shutdown().await;
    }

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Render("Playwright render: missing stdout pipe".to_string()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Render("Playwright render: missing stderr pipe".to_string()))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = tokio::io::AsyncReadExt::read_to_end(&mut stdout, &mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = tokio::io::AsyncReadExt::read_to_end(&mut stderr, &mut buf).await;
        buf
    });

    match tokio::time::timeout(hard_timeout, child.wait()).await {
        Ok(r) => {
            r.map_err(not_configured)?;
        }
        Err(_) => {
            let _ = child.kill().await;
            let _ = child.wait().await;
            stdout_task.abort();
            stderr_task.abort();
            return Err(Error::Render(format!(
                "Playwright render hard timeout after {}ms",
                hard_timeout.as_millis()
            )));
        }
    }

    let out_stdout = stdout_task.await.unwrap_or_default();
    let out_stderr = stderr_task.await.unwrap_or_default();

    // Non-zero exits still print JSON on stdout.
    let stdout = String::from_utf8_lossy(&out_stdout).trim().to_string();
    let v: serde_json::Value = serde_json::from_str(&stdout).map_err(|e| {
        let stderr = String::from_utf8_lossy(&out_stderr).trim().to_string();
        if stderr.is_empty() {
            Error::Render(format!("Playwright render returned invalid JSON: {e}"))
        } else {
            Error::Render(format!(
                "Playwright render returned invalid JSON: {e}. stderr: {stderr}"
            ))
        }
    })?;

    if v.get("ok").and_then(|x| x.as_bool()) != Some(true) {
        return Err(script_error(&v));
    }

    parse_rendered(&v, &req.url, t0.elapsed().as_millis() as u64, cfg.max_html_chars)
}

fn script_error(v: &serde_json::Value) -> Error {
    let code = v
        .pointer("/error/code")
        .and_then(|x| x.as_str())
        .unwrap_or("render_failed");
    let message = v
        .pointer("/error/message")
        .and_then(|x| x.as_str())
        .unwrap_or("Playwright render failed");
    let hint = v
        .pointer("/error/hint")
        .and_then(|x| x.as_str())
        .unwrap_or("")
        .trim();
    let message = if hint.is_empty() {
        message.to_string()
    } else {
        format!("{message}. {hint}")
    };
    match code {
        "not_ready" => Error::PageNotReady(message),
        "not_configured" => Error::NotConfigured(message),
        "invalid_params" => Error::InvalidUrl(message),
        _ => Error::Render(message),
    }
}

fn parse_rendered(
    v: &serde_json::Value,
    url: &str,
    fallback_elapsed_ms: u64,
    max_html_chars: usize,
) -> Result<RenderedChart> {
    let html = v
        .get("html")
        .and_then(|x| x.as_str())
        .unwrap_or("")
        .to_string();
    if html.trim().is_empty() {
        return Err(Error::Render(
            "Playwright render returned empty HTML".to_string(),
        ));
    }
    if html.len() > max_html_chars {
        return Err(Error::Render(format!(
            "Playwright render HTML too large ({} chars > TOPCHART_RENDER_MAX_HTML_CHARS={})",
            html.len(),
            max_html_chars
        )));
    }
    let item_texts = v
        .get("item_texts")
        .and_then(|x| x.as_array())
        .map(|a| {
            a.iter()
                .map(|t| t.as_str().unwrap_or("").to_string())
                .collect()
        })
        .unwrap_or_default();

    Ok(RenderedChart {
        final_url: v
            .get("final_url")
            .and_then(|x| x.as_str())
            .unwrap_or(url)
            .to_string(),
        status: v.get("status").and_then(|x| x.as_u64()).map(|n| n as u16),
        html,
        item_texts,
        elapsed_ms: v
            .get("elapsed_ms")
            .and_then(|x| x.as_u64())
            .unwrap_or(fallback_elapsed_ms),
        mode: v
            .get("mode")
            .and_then(|x| x.as_str())
            .unwrap_or("headless")
            .to_string(),
    })
}
