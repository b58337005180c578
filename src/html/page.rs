// src/html/page.rs

use super::{escape_html, ERROR_CLASS};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::loader::{ScriptHost, ScriptRef, ScriptState};
use crate::page::{Container, ErrorBlock, Page};
use log::{debug, warn};
use regex::{Captures, Regex};
use reqwest::Url;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

const SCRIPT_WAIT: Duration = Duration::from_millis(20);

type Attrs = Vec<(String, Option<String>)>;

struct Tag {
    start: usize,
    end: usize,
    closing: bool,
    self_closing: bool,
    name: String,
    attrs: Attrs,
}

// ============================================================================
// CONTAINER
// ============================================================================

struct ContainerNode {
    index: usize,
    tag: String,
    attrs: Attrs,
    content: String,
    // Byte range of the whole element in the source page
    span: (usize, usize),
}

/// One structure container inside an [`HtmlPage`].
#[derive(Clone)]
pub struct HtmlContainer {
    node: Rc<RefCell<ContainerNode>>,
    config: Rc<Config>,
}

impl HtmlContainer {
    pub fn attr(&self, name: &str) -> Option<String> {
        self.node
            .borrow()
            .attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone().unwrap_or_default())
    }

    /// Sets an attribute to a plain (unescaped) value.
    pub fn set_attr(&self, name: &str, value: &str) {
        let value = value.to_string();
        let mut guard = self.node.borrow_mut();
        let node = &mut *guard;
        match node.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = Some(value),
            None => node.attrs.push((name.to_string(), Some(value))),
        }
    }

    pub fn remove_attr(&self, name: &str) {
        self.node
            .borrow_mut()
            .attrs
            .retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Element id, assigning `cview-structure-<n>` when there is none.
    pub fn ensure_id(&self) -> String {
        if let Some(id) = self.attr("id").filter(|id| !id.is_empty()) {
            return id;
        }
        let id = format!("cview-structure-{}", self.node.borrow().index);
        self.set_attr("id", &id);
        id
    }

    pub fn content(&self) -> String {
        self.node.borrow().content.clone()
    }

    pub fn append_html(&self, html: &str) {
        self.node.borrow_mut().content.push_str(html);
    }

    fn style(&self) -> Vec<(String, String)> {
        parse_style(&self.attr("style").unwrap_or_default())
    }

    fn set_style_props(&self, props: &[(&str, &str)]) {
        let mut style = self.style();
        for &(key, value) in props {
            match style.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value.to_string(),
                None => style.push((key.to_string(), value.to_string())),
            }
        }
        let text: Vec<String> = style.iter().map(|(k, v)| format!("{}: {};", k, v)).collect();
        self.set_attr("style", &text.join(" "));
    }

    /// The element as markup, with its current attributes and content.
    pub fn to_html(&self) -> String {
        let node = self.node.borrow();
        let mut out = format!("<{}", node.tag);
        for (k, v) in &node.attrs {
            match v {
                Some(v) => out.push_str(&format!(" {}=\"{}\"", k, escape_html(v))),
                None => out.push_str(&format!(" {}", k)),
            }
        }
        out.push('>');
        out.push_str(&node.content);
        out.push_str(&format!("</{}>", node.tag));
        out
    }
}

impl Container for HtmlContainer {
    fn json_path(&self) -> Option<String> {
        self.attr(&self.config.json_attribute).filter(|p| !p.is_empty())
    }

    fn is_loaded(&self) -> bool {
        self.attr(&self.config.loaded_attribute).as_deref() == Some("true")
    }

    fn set_loaded(&self, loaded: bool) {
        if loaded {
            self.set_attr(&self.config.loaded_attribute, "true");
        } else {
            self.remove_attr(&self.config.loaded_attribute);
        }
    }

    fn inline_height(&self) -> Option<String> {
        self.style()
            .into_iter()
            .find(|(k, _)| k == "height")
            .map(|(_, v)| v)
            .filter(|v| !v.is_empty())
    }

    fn clear(&self) {
        self.node.borrow_mut().content.clear();
    }

    fn set_size(&self, width: &str, height: &str) {
        self.set_style_props(&[("position", "relative"), ("width", width), ("height", height)]);
    }

    fn show_error(&self, block: &ErrorBlock) {
        // Deferred viewer scripts hang `cviewRetry` on the container
        let retry = format!(
            "var c = this.closest('.{}'); if (c && c.cviewRetry) {{ c.cviewRetry(); }} else {{ window.location.reload(); }}",
            self.config.container_class
        );
        self.append_html(&format!(
            concat!(
                r#"<div class="{}">"#,
                r#"<div style="color: #b00; padding: 1em;">{}</div>"#,
                r#"<button type="button" style="margin-left: 0.5em;" onclick="{}">{}</button>"#,
                "</div>"
            ),
            ERROR_CLASS,
            escape_html(&block.message),
            escape_html(&retry),
            escape_html(&block.retry_label)
        ));
    }
}

fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let k = k.trim().to_ascii_lowercase();
            if k.is_empty() {
                return None;
            }
            Some((k, v.trim().to_string()))
        })
        .collect()
}

// ============================================================================
// PAGE
// ============================================================================

struct PageInner<F> {
    source: String,
    base_url: Option<Url>,
    config: Rc<Config>,
    fetcher: F,
    head_insert: usize,
    containers: Vec<HtmlContainer>,
    scripts: RefCell<Vec<ScriptRef>>,
    // Ids of the references this page added
    injected: RefCell<Vec<usize>>,
}

/// An HTML document acting as the page: containers are found by class,
/// script references by `<script src>`, and new scripts go before `</head>`.
pub struct HtmlPage<F = HttpFetcher> {
    inner: Rc<PageInner<F>>,
}

impl<F> Clone for HtmlPage<F> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<F: Fetcher> HtmlPage<F> {
    pub fn parse(source: &str, base_url: Option<Url>, config: Config, fetcher: F) -> Result<Self> {
        let config = Rc::new(config);
        let tags = scan_tags(source)?;

        let mut containers = Vec::new();
        let mut scripts = Vec::new();
        let mut head_insert = None;
        let mut body_start = None;

        let mut i = 0;
        while i < tags.len() {
            let tag = &tags[i];

            if tag.closing && tag.name == "head" && head_insert.is_none() {
                head_insert = Some(tag.start);
            }
            if !tag.closing && tag.name == "body" && body_start.is_none() {
                body_start = Some(tag.start);
            }
            if !tag.closing && tag.name == "script" {
                if let Some(src) = find_attr(&tag.attrs, "src") {
                    scripts.push(ScriptRef {
                        id: scripts.len(),
                        src,
                        state: ScriptState::Complete,
                    });
                }
            }

            if !tag.closing && !tag.self_closing && has_class(&tag.attrs, &config.container_class) {
                match matching_close(&tags, i) {
                    Some(j) => {
                        let close = &tags[j];
                        containers.push(HtmlContainer {
                            node: Rc::new(RefCell::new(ContainerNode {
                                index: containers.len(),
                                tag: tag.name.clone(),
                                attrs: tag.attrs.clone(),
                                content: source[tag.end..close.start].to_string(),
                                span: (tag.start, close.end),
                            })),
                            config: Rc::clone(&config),
                        });
                        i = j + 1;
                        continue;
                    }
                    None => warn!("Unclosed <{}> container at byte {}", tag.name, tag.start),
                }
            }
            i += 1;
        }

        debug!(
            "Parsed page: {} container(s), {} script reference(s)",
            containers.len(),
            scripts.len()
        );

        Ok(Self {
            inner: Rc::new(PageInner {
                source: source.to_string(),
                base_url,
                config,
                fetcher,
                head_insert: head_insert.or(body_start).unwrap_or(0),
                containers,
                scripts: RefCell::new(scripts),
                injected: RefCell::new(Vec::new()),
            }),
        })
    }

    fn set_script_state(&self, id: usize, state: ScriptState) {
        if let Some(script) = self.inner.scripts.borrow_mut().iter_mut().find(|s| s.id == id) {
            script.state = state;
        }
    }

    fn script_state(&self, id: usize) -> Option<ScriptState> {
        self.inner
            .scripts
            .borrow()
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.state)
    }
}

impl<F> HtmlPage<F> {
    /// The updated page. Injected scripts that failed to load are left out.
    pub fn to_html(&self) -> String {
        let inner = &self.inner;
        let mut edits: Vec<(usize, usize, String)> = Vec::new();

        let scripts = inner.scripts.borrow();
        let injected: String = inner
            .injected
            .borrow()
            .iter()
            .filter_map(|id| scripts.iter().find(|s| s.id == *id))
            .filter(|s| s.state == ScriptState::Complete)
            .map(|s| format!("<script src=\"{}\" async></script>\n", escape_html(&s.src)))
            .collect();
        if !injected.is_empty() {
            edits.push((inner.head_insert, inner.head_insert, injected));
        }

        for c in &inner.containers {
            let (start, end) = c.node.borrow().span;
            edits.push((start, end, c.to_html()));
        }
        // Zero-length inserts sort ahead of a replacement at the same spot
        edits.sort_by_key(|(start, end, _)| (*start, *end));

        let mut out = String::with_capacity(inner.source.len());
        let mut cursor = 0;
        for (start, end, text) in edits {
            out.push_str(&inner.source[cursor..start]);
            out.push_str(&text);
            cursor = end;
        }
        out.push_str(&inner.source[cursor..]);
        out
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}

impl<F: Fetcher> Page for HtmlPage<F> {
    type Container = HtmlContainer;

    fn containers(&self) -> Vec<HtmlContainer> {
        self.inner.containers.clone()
    }

    fn base_url(&self) -> Option<Url> {
        self.inner.base_url.clone()
    }
}

impl<F: Fetcher> ScriptHost for HtmlPage<F> {
    fn library_present(&self) -> bool {
        let marker = &self.inner.config.library_marker;
        self.inner
            .scripts
            .borrow()
            .iter()
            .any(|s| s.state == ScriptState::Complete && file_name(&s.src) == marker.as_str())
    }

    fn base_url(&self) -> Option<Url> {
        self.inner.base_url.clone()
    }

    fn scripts(&self) -> Vec<ScriptRef> {
        self.inner.scripts.borrow().clone()
    }

    async fn wait_for(&self, script: &ScriptRef) -> std::result::Result<(), String> {
        loop {
            match self.script_state(script.id) {
                Some(ScriptState::Loading) => tokio::time::sleep(SCRIPT_WAIT).await,
                Some(ScriptState::Complete) => return Ok(()),
                Some(ScriptState::Failed) | None => return Err(format!("Failed to load {}", script.src)),
            }
        }
    }

    async fn append(&self, src: &str) -> std::result::Result<(), String> {
        // Registered before probing so concurrent loaders find it pending
        let id = {
            let mut scripts = self.inner.scripts.borrow_mut();
            let id = scripts.len();
            scripts.push(ScriptRef {
                id,
                src: src.to_string(),
                state: ScriptState::Loading,
            });
            id
        };
        self.inner.injected.borrow_mut().push(id);

        match self.inner.fetcher.probe(src).await {
            Ok(true) => {
                self.set_script_state(id, ScriptState::Complete);
                Ok(())
            }
            Ok(false) => {
                self.set_script_state(id, ScriptState::Failed);
                Err("not found".to_string())
            }
            Err(e) => {
                self.set_script_state(id, ScriptState::Failed);
                Err(e.to_string())
            }
        }
    }
}

// ============================================================================
// SCANNING
// ============================================================================

fn scan_tags(source: &str) -> Result<Vec<Tag>> {
    let regex = |pattern: &str| Regex::new(pattern).map_err(|e| Error::Html(format!("regex: {e}")));
    let tag_re = regex(r"<(/?)([a-zA-Z][a-zA-Z0-9-]*)([^>]*)>")?;
    let attr_re = regex(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)?;
    let entity_re = regex(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z][a-zA-Z0-9]*);")?;
    let comment_re = regex(r"(?s)<!--.*?-->")?;

    let comments: Vec<(usize, usize)> = comment_re
        .find_iter(source)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut tags = Vec::new();
    // Inside <script> or <style>, only the matching close tag counts
    let mut raw_text: Option<String> = None;

    for cap in tag_re.captures_iter(source) {
        let Some(whole) = cap.get(0) else { continue };
        if comments.iter().any(|&(s, e)| whole.start() >= s && whole.start() < e) {
            continue;
        }
        let closing = !cap[1].is_empty();
        let name = cap[2].to_ascii_lowercase();
        if let Some(raw) = &raw_text {
            if !closing || *raw != name {
                continue;
            }
            raw_text = None;
        }

        let raw = cap.get(3).map(|m| m.as_str()).unwrap_or("");
        let attrs = attr_re
            .captures_iter(raw)
            .filter_map(|a| {
                let name = a.get(1)?.as_str().to_string();
                let value = a.get(2).or_else(|| a.get(3)).or_else(|| a.get(4));
                Some((name, value.map(|v| decode_entities(&entity_re, v.as_str()))))
            })
            .collect();
        let self_closing = raw.trim_end().ends_with('/');

        if !closing && !self_closing && (name == "script" || name == "style") {
            raw_text = Some(name.clone());
        }
        tags.push(Tag {
            start: whole.start(),
            end: whole.end(),
            closing,
            self_closing,
            name,
            attrs,
        });
    }
    Ok(tags)
}

/// Attribute text as the browser sees it; unknown entities stay as written.
fn decode_entities(entity_re: &Regex, text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    entity_re
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => name.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn matching_close(tags: &[Tag], open: usize) -> Option<usize> {
    let name = &tags[open].name;
    let mut depth = 0usize;
    for (j, tag) in tags.iter().enumerate().skip(open + 1) {
        if &tag.name != name || tag.self_closing {
            continue;
        }
        if tag.closing {
            if depth == 0 {
                return Some(j);
            }
            depth -= 1;
        } else {
            depth += 1;
        }
    }
    None
}

fn find_attr(attrs: &Attrs, name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .and_then(|(_, v)| v.clone())
}

fn has_class(attrs: &Attrs, class: &str) -> bool {
    find_attr(attrs, "class")
        .map(|c| c.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

fn file_name(src: &str) -> &str {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    path.rsplit('/').next().unwrap_or(path)
}
