// src/html/mod.rs
//
// Static-site host: a parsed HTML page standing in for the browser document,
// and a viewer library that writes the equivalent 3Dmol calls into it.

pub mod page;
pub mod script;

pub use page::{HtmlContainer, HtmlPage};
pub use script::{ScriptLibrary, ScriptViewer};

/// Class of the error block shown in a container when the library is missing.
pub const ERROR_CLASS: &str = "structure-viewer-error";

/// Container markup for one structure, wrapped in a centered card.
pub fn viewer_markup(json_path: &str, height: &str) -> String {
    format!(
        r#"
<div class="structure-card card" style="width: 100%; max-width: 800px; margin: auto; padding: 0em;">
  <div class="structure-viewer" data-json="{}" style="width: 100%; height: {};"></div>
</div>
"#,
        escape_html(json_path),
        escape_html(height)
    )
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
