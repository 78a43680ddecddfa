//! Capture rendered markup from a page with a headless browser
//!
//! The browser is asked to dump the DOM after letting the page's scripts run for a
//! virtual-time budget. The budget grows on every attempt until the selected element
//! shows up or the overall timeout runs out.

use crate::error::{CaptureError, TimelineResult};
use async_trait::async_trait;
use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const INITIAL_BUDGET_MS: u64 = 500;

/// Extracts the markup of a rendered element
#[async_trait]
pub trait RenderCapture: Send + Sync {
    /// Load `url` and return the outer markup of the first element matching `selector`
    async fn capture(&self, url: &str, selector: &str) -> TimelineResult<String>;
}

/// `#container-id` or `#container-id tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub container_id: String,
    pub tag: Option<String>,
}

impl Selector {
    pub fn parse(selector: &str) -> Result<Self, CaptureError> {
        let invalid = || CaptureError::InvalidSelector(selector.to_string());
        let mut parts = selector.split_whitespace();

        let container_id = parts
            .next()
            .and_then(|first| first.strip_prefix('#'))
            .filter(|id| !id.is_empty())
            .ok_or_else(invalid)?;
        let tag = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }
        if let Some(tag) = tag
            && !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(invalid());
        }

        Ok(Self {
            container_id: container_id.to_string(),
            tag: tag.map(str::to_ascii_lowercase),
        })
    }

    /// Outer markup of the first match in `html`, in document order.
    ///
    /// `html` is parsed into a full DOM, so comments, attribute values and unclosed tags
    /// are handled the way a browser would handle them.
    pub fn find(&self, html: &str) -> Option<String> {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
        let container = first_match(&dom.document, |data| {
            element_attr(data, "id").is_some_and(|id| id == self.container_id)
        })?;

        let target = match &self.tag {
            None => container,
            Some(tag) => container
                .children
                .borrow()
                .iter()
                .find_map(|child| first_match(child, |data| element_is(data, tag)))?,
        };
        outer_markup(&target)
    }
}

/// First element at or below `root`, in document order, whose data satisfies `matches`
fn first_match(root: &Handle, matches: impl Fn(&NodeData) -> bool) -> Option<Handle> {
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if matches(&node.data) {
            return Some(node);
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    None
}

fn element_is(data: &NodeData, tag: &str) -> bool {
    match data {
        NodeData::Element { name, .. } => (*name.local).eq_ignore_ascii_case(tag),
        _ => false,
    }
}

fn element_attr(data: &NodeData, attr: &str) -> Option<String> {
    let NodeData::Element { attrs, .. } = data else {
        return None;
    };
    attrs
        .borrow()
        .iter()
        .find(|a| (*a.name.local).eq_ignore_ascii_case(attr))
        .map(|a| a.value.to_string())
}

/// Serialize `node` with its own tags. `&nbsp;` is the one HTML-only entity the
/// serializer emits, so it is rewritten as a character reference XML also accepts.
fn outer_markup(node: &Handle) -> Option<String> {
    let mut bytes = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    serialize(&mut bytes, &SerializableHandle::from(node.clone()), opts).ok()?;
    let markup = String::from_utf8(bytes).ok()?;
    Some(markup.replace("&nbsp;", "&#160;"))
}

/// Add the SVG namespace to the root element when it is missing, so the markup stands
/// on its own as a file
pub fn ensure_svg_namespace(markup: &str) -> String {
    if markup.contains(&format!("xmlns=\"{}\"", SVG_NAMESPACE)) {
        markup.to_string()
    } else {
        markup.replacen("<svg", &format!("<svg xmlns=\"{}\"", SVG_NAMESPACE), 1)
    }
}

/// Headless Chromium driven through `--dump-dom`
#[derive(Debug, Clone)]
pub struct HeadlessBrowserCapture {
    browser: String,
    timeout: Duration,
    profile_dir: PathBuf,
}

impl Default for HeadlessBrowserCapture {
    fn default() -> Self {
        Self::new("chromium")
    }
}

impl HeadlessBrowserCapture {
    pub fn new(browser: impl Into<String>) -> Self {
        Self {
            browser: browser.into(),
            timeout: DEFAULT_TIMEOUT,
            profile_dir: crate::paths::PlatformPaths::browser_profile_dir(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile_dir = dir.into();
        self
    }

    async fn dump_dom(&self, url: &str, budget_ms: u64) -> Result<String, CaptureError> {
        let output = Command::new(&self.browser)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg(format!("--user-data-dir={}", self.profile_dir.display()))
            .arg(format!("--virtual-time-budget={}", budget_ms))
            .arg("--dump-dom")
            .arg(url)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CaptureError::LaunchFailed {
                browser: self.browser.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CaptureError::LaunchFailed {
                browser: self.browser.clone(),
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl RenderCapture for HeadlessBrowserCapture {
    async fn capture(&self, url: &str, selector: &str) -> TimelineResult<String> {
        let parsed = Selector::parse(selector)?;
        let not_found = || CaptureError::ElementNotFound {
            selector: selector.to_string(),
            timeout_ms: self.timeout.as_millis() as u64,
        };

        tracing::info!("Visiting {}...", url);
        let deadline = Instant::now() + self.timeout;
        let mut budget_ms = INITIAL_BUDGET_MS;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(not_found().into());
            }

            let dom = match tokio::time::timeout(remaining, self.dump_dom(url, budget_ms)).await {
                Ok(dom) => dom?,
                Err(_) => return Err(not_found().into()),
            };

            if let Some(markup) = parsed.find(&dom) {
                tracing::info!("Captured '{}' after a {} ms budget", selector, budget_ms);
                return Ok(ensure_svg_namespace(&markup));
            }

            tracing::debug!("'{}' not rendered within {} ms, retrying", selector, budget_ms);
            budget_ms = budget_ms.saturating_mul(2);
        }
    }
}
