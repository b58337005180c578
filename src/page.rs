// src/page.rs
//
// Page-query capability: the containers on a page and where the page lives.

use reqwest::Url;

/// Visible failure shown in place of a viewer, with a control that
/// re-runs the pipeline for the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorBlock {
    pub message: String,
    pub retry_label: String,
}

/// A structure container element.
///
/// Handles are cheap clones sharing one underlying element.
pub trait Container: Clone {
    /// Source JSON path; `None` when the attribute is missing or empty.
    fn json_path(&self) -> Option<String>;
    fn is_loaded(&self) -> bool;
    fn set_loaded(&self, loaded: bool);
    /// Height given in the element's inline style, if any.
    fn inline_height(&self) -> Option<String>;
    /// Removes all child content.
    fn clear(&self);
    fn set_size(&self, width: &str, height: &str);
    fn show_error(&self, block: &ErrorBlock);
}

pub trait Page {
    type Container: Container;

    fn containers(&self) -> Vec<Self::Container>;
    fn base_url(&self) -> Option<Url>;
}

/// Resolves `src` against `base`; the literal string when that is not possible.
pub fn resolve_url(src: &str, base: Option<&Url>) -> String {
    base.and_then(|b| b.join(src).ok())
        .map(String::from)
        .unwrap_or_else(|| src.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_to_page() {
        let base = Url::parse("https://docs.example.org/guide/silicon/").unwrap();
        assert_eq!(
            resolve_url("data/si.json", Some(&base)),
            "https://docs.example.org/guide/silicon/data/si.json"
        );
        assert_eq!(
            resolve_url("/js/3Dmol-min.js", Some(&base)),
            "https://docs.example.org/js/3Dmol-min.js"
        );
    }

    #[test]
    fn test_resolve_keeps_absolute_and_literal() {
        let base = Url::parse("https://docs.example.org/").unwrap();
        assert_eq!(
            resolve_url("https://3dmol.org/build/3Dmol-min.js", Some(&base)),
            "https://3dmol.org/build/3Dmol-min.js"
        );
        assert_eq!(resolve_url("data/si.json", None), "data/si.json");
    }
}
