// src/html/script.rs

use super::page::HtmlContainer;
use super::ERROR_CLASS;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::viewer::{AtomSelector, LineSpec, ModelFormat, StyleSpec, Viewer, ViewerLibrary};
use serde::Serialize;

// Browser-side fallback chain: tries each source in order, then polls for the
// global and calls `done` once it exists. Shared by every deferred viewer.
const LOADER_JS: &str = r#"  var load = window.cviewLoad = window.cviewLoad || function (name, sources, timeout, poll, done) {
    var start = Date.now();
    var next = function (i) {
      if (window[name] || i >= sources.length) { return; }
      var old = document.querySelector('script[src="' + sources[i] + '"]');
      if (old && !old.cviewFailed) { return; }
      if (old) { old.parentNode.removeChild(old); }
      var s = document.createElement("script");
      s.src = sources[i];
      s.onload = function () { if (!window[name]) { s.cviewFailed = true; next(i + 1); } };
      s.onerror = function () { s.cviewFailed = true; next(i + 1); };
      document.head.appendChild(s);
    };
    next(0);
    (function wait() {
      if (window[name]) { done(); }
      else if (Date.now() - start <= timeout) { setTimeout(wait, poll); }
    })();
  };
"#;

/// Writes viewer calls into the page as an inline script for the browser-side
/// library, addressed through its global (`$3Dmol`).
pub struct ScriptLibrary {
    global: String,
    sources: Vec<String>,
    timeout_ms: u64,
    poll_interval_ms: u64,
    loaded_attribute: String,
}

impl ScriptLibrary {
    pub fn from_config(config: &Config) -> Self {
        Self {
            global: "$3Dmol".to_string(),
            sources: config.library_sources.clone(),
            timeout_ms: config.timeout_ms,
            poll_interval_ms: config.poll_interval_ms,
            loaded_attribute: config.loaded_attribute.clone(),
        }
    }

    fn viewer(&self, container: &HtmlContainer, pending: bool) -> Result<ScriptViewer> {
        let id = container.ensure_id();
        let deferred = if pending {
            Some(format!(
                "{}, {}, {}, {}",
                js_value(&self.global)?,
                js_value(&self.sources)?,
                self.timeout_ms,
                self.poll_interval_ms
            ))
        } else {
            None
        };
        Ok(ScriptViewer {
            container: container.clone(),
            global: self.global.clone(),
            id: js_value(&id)?,
            loaded: js_value(&self.loaded_attribute)?,
            deferred,
            calls: vec![format!(
                "var viewer = {}.createViewer(document.getElementById({}));",
                self.global,
                js_value(&id)?
            )],
            rendered: false,
        })
    }
}

impl Default for ScriptLibrary {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ViewerLibrary<HtmlContainer> for ScriptLibrary {
    type Viewer = ScriptViewer;

    fn create_viewer(&self, container: &HtmlContainer) -> Result<ScriptViewer> {
        self.viewer(container, false)
    }

    /// The drawing waits for a browser-side load of the library sources; the
    /// container's retry control runs that load again.
    fn create_pending_viewer(&self, container: &HtmlContainer) -> Result<Option<ScriptViewer>> {
        self.viewer(container, true).map(Some)
    }
}

/// Collects calls until `render`, which emits them as one `<script>`.
pub struct ScriptViewer {
    container: HtmlContainer,
    global: String,
    id: String,
    loaded: String,
    // Loader arguments when the library is not on the page yet
    deferred: Option<String>,
    calls: Vec<String>,
    rendered: bool,
}

impl ScriptViewer {
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    fn push(&mut self, call: String) -> Result<()> {
        if self.rendered {
            return Err(Error::Render("viewer already rendered".to_string()));
        }
        self.calls.push(call);
        Ok(())
    }

    fn to_script(&self) -> String {
        let mut body = String::new();
        for call in &self.calls {
            body.push_str("    ");
            body.push_str(call);
            body.push('\n');
        }
        match &self.deferred {
            None => format!(
                "\n<script>\n(function () {{\n  function draw() {{\n{}  }}\n  if (window.{g}) {{ draw(); }} else {{ window.addEventListener(\"load\", draw); }}\n}})();\n</script>\n",
                body,
                g = self.global
            ),
            Some(load_args) => format!(
                concat!(
                    "\n<script>\n(function () {{\n",
                    "  var el = document.getElementById({id});\n",
                    "  function draw() {{\n{body}  }}\n",
                    "{loader}",
                    "  function run() {{\n",
                    "    el.setAttribute({loaded}, \"true\");\n",
                    "    load({load_args}, function () {{\n",
                    "      var err = el.querySelector(\".{err}\");\n",
                    "      if (err) {{ el.removeChild(err); }}\n",
                    "      draw();\n",
                    "    }});\n",
                    "  }}\n",
                    "  el.cviewRetry = function () {{ el.removeAttribute({loaded}); run(); }};\n",
                    "  run();\n",
                    "}})();\n</script>\n"
                ),
                id = self.id,
                body = body,
                loader = LOADER_JS,
                loaded = self.loaded,
                load_args = load_args,
                err = ERROR_CLASS
            ),
        }
    }
}

impl Viewer for ScriptViewer {
    fn add_model(&mut self, data: &str, format: ModelFormat) -> Result<()> {
        let call = format!("viewer.addModel({}, {});", js_value(&data)?, js_value(&format.as_str())?);
        self.push(call)
    }

    fn set_style(&mut self, selector: &AtomSelector, style: &StyleSpec) -> Result<()> {
        let call = format!("viewer.setStyle({}, {});", js_value(selector)?, js_value(style)?);
        self.push(call)
    }

    fn add_line(&mut self, line: &LineSpec) -> Result<()> {
        let call = format!("viewer.addLine({});", js_value(line)?);
        self.push(call)
    }

    fn zoom_to(&mut self) -> Result<()> {
        self.push("viewer.zoomTo();".to_string())
    }

    fn render(&mut self) -> Result<()> {
        self.push("viewer.render();".to_string())?;
        self.rendered = true;
        self.container.append_html(&self.to_script());
        Ok(())
    }
}

/// JSON literal that is safe inside an inline `<script>`.
fn js_value<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}
