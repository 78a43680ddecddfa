//! Self-contained HTML timeline
//!
//! The snapshot list is embedded as JSON in the page; a fixed script plays it back with
//! d3-graphviz, looping from the last snapshot to the first.

use crate::config::TimelineConfig;
use crate::error::TimelineResult;
use crate::types::Snapshot;
use serde::Serialize;

const D3_URL: &str = "https://d3js.org/d3.v7.min.js";
const WASM_URL: &str = "https://unpkg.com/@hpcc-js/wasm@2.20.0/dist/graphviz.umd.js";
const D3_GRAPHVIZ_URL: &str = "https://unpkg.com/d3-graphviz@5.6.0/build/d3-graphviz.js";

const STYLE: &str = r#"
    html, body { margin: 0; height: 100%; font-family: system-ui, sans-serif; background: #fff; }
    #header { display: flex; align-items: center; gap: 1.5em; padding: 0.5em 1em; border-bottom: 1px solid #ddd; }
    #title { font-weight: 600; }
    #date { font-variant-numeric: tabular-nums; }
    #commit { font-family: ui-monospace, monospace; color: #666; }
    #contributors { display: flex; flex-wrap: wrap; gap: 0.25em; margin-left: auto; }
    #contributors img { width: 28px; height: 28px; border-radius: 50%; }
    #graph { width: 100%; height: calc(100% - 3em); }
"#;

const PLAYER: &str = r##"
(function () {
  const data = JSON.parse(document.getElementById("timeline-data").textContent);
  const snapshots = data.snapshots;
  if (snapshots.length === 0) {
    return;
  }

  const dateEl = document.getElementById("date");
  const commitEl = document.getElementById("commit");
  const countEl = document.getElementById("count");
  const avatarsEl = document.getElementById("contributors");

  const graphviz = d3.select("#graph")
    .graphviz()
    .fit(true)
    .width(window.innerWidth)
    .height(window.innerHeight - 48)
    .transition(() => d3.transition("main").ease(d3.easeLinear).duration(data.transition_ms));

  let index = 0;

  function showMeta(snapshot) {
    dateEl.textContent = snapshot.date.slice(0, 10);
    commitEl.textContent = snapshot.commit.slice(0, 7);
    countEl.textContent = snapshot.contributor_count + " contributors";
    avatarsEl.replaceChildren(...snapshot.contributors.map((c) => {
      const link = document.createElement("a");
      link.href = c.html_url;
      link.title = c.login;
      const img = document.createElement("img");
      img.src = c.avatar_url;
      img.alt = c.login;
      link.appendChild(img);
      return link;
    }));
  }

  function render() {
    const snapshot = snapshots[index];
    showMeta(snapshot);
    graphviz.renderDot(snapshot.dot).on("end", () => {
      index = (index + 1) % snapshots.length;
      setTimeout(render, data.hold_ms);
    });
  }

  render();
})();
"##;

#[derive(Serialize)]
struct TimelineData<'a> {
    title: &'a str,
    transition_ms: u64,
    hold_ms: u64,
    snapshots: &'a [Snapshot],
}

/// Renders accepted snapshots into one HTML document
#[derive(Debug, Clone)]
pub struct TimelineAssembler {
    pub title: String,
    pub transition_ms: u64,
    pub hold_ms: u64,
}

impl From<&TimelineConfig> for TimelineAssembler {
    fn from(config: &TimelineConfig) -> Self {
        Self {
            title: config.title.clone(),
            transition_ms: config.transition_ms,
            hold_ms: config.hold_ms,
        }
    }
}

impl TimelineAssembler {
    /// Render `snapshots` (oldest first). Pure: the same input always gives the same page.
    pub fn assemble(&self, snapshots: &[Snapshot]) -> TimelineResult<String> {
        let data = TimelineData {
            title: &self.title,
            transition_ms: self.transition_ms,
            hold_ms: self.hold_ms,
            snapshots,
        };
        let json = serde_json::to_string(&data)
            .map_err(|e| crate::error::TimelineError::other(format!("Failed to encode timeline: {}", e)))?;

        let title = escape_html(&self.title);
        let mut html = String::with_capacity(json.len() + PLAYER.len() + 2048);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", title));
        html.push_str(&format!("<style>{}</style>\n", STYLE));
        for src in [D3_URL, WASM_URL, D3_GRAPHVIZ_URL] {
            html.push_str(&format!("<script src=\"{}\"></script>\n", src));
        }
        html.push_str("</head>\n<body>\n");
        html.push_str("<div id=\"header\">\n");
        html.push_str(&format!("  <span id=\"title\">{}</span>\n", title));
        html.push_str("  <span id=\"date\"></span>\n");
        html.push_str("  <span id=\"commit\"></span>\n");
        html.push_str("  <span id=\"count\"></span>\n");
        html.push_str("  <div id=\"contributors\"></div>\n");
        html.push_str("</div>\n");
        html.push_str("<div id=\"graph\"></div>\n");
        html.push_str("<script type=\"application/json\" id=\"timeline-data\">");
        html.push_str(&escape_script(&json));
        html.push_str("</script>\n");
        html.push_str(&format!("<script>{}</script>\n", PLAYER));
        html.push_str("</body>\n</html>\n");
        Ok(html)
    }
}

/// Keep embedded JSON from closing or re-opening its `<script>` element. Every `<` becomes a
/// JSON unicode escape, so neither `</script>` nor `<!--` survives as markup.
fn escape_script(json: &str) -> String {
    json.replace('<', "\\u003c")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
