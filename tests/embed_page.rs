use cview_embed::config::Config;
use cview_embed::fetch::HttpFetcher;
use cview_embed::html::{HtmlPage, ScriptLibrary};
use cview_embed::loader::LibraryLoader;
use cview_embed::renderer::{RenderOutcome, StructureRenderer};
use reqwest::Url;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const PAGE: &str = r#"<!doctype html>
<html>
<head>
<title>Silicon</title>
</head>
<body>
<h1>Silicon</h1>
<div class="structure-card card" style="width: 100%; max-width: 800px; margin: auto; padding: 0em;">
  <div class="structure-viewer" data-json="/assets/viz_data/si_structure.json" style="width: 100%; height: 420px;"></div>
</div>
<div class="structure-viewer" data-json="data/nacl.json"></div>
<div class="structure-viewer" data-json="missing.json"></div>
</body>
</html>
"#;

const SILICON: &str = r#"{"lattice":{"matrix":[[5.43,0,0],[0,5.43,0],[0,0,5.43]]},"sites":[{"element":"Si","xyz":[0,0,0]}]}"#;
const NACL: &str = r#"{"lattice":{"matrix":[[5.64,0,0],[0,5.64,0],[0,0,5.64]]},"sites":[{"element":"Na","xyz":[0,0,0]},{"element":"Cl","xyz":[2.82,2.82,2.82]}]}"#;

fn site(name: &str, with_library: bool) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cview-embed-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("assets/viz_data")).unwrap();
    fs::create_dir_all(dir.join("materials/si/data")).unwrap();
    fs::write(dir.join("assets/viz_data/si_structure.json"), SILICON).unwrap();
    fs::write(dir.join("materials/si/data/nacl.json"), NACL).unwrap();
    if with_library {
        fs::create_dir_all(dir.join("js")).unwrap();
        fs::write(dir.join("js/3Dmol-min.js"), "/* 3Dmol */").unwrap();
    }
    dir
}

async fn embed(dir: &Path, config: Config) -> (Vec<RenderOutcome>, String) {
    let origin = Url::parse("http://localhost/").unwrap();
    let base = origin.join("materials/si/").unwrap();
    let fetcher = Rc::new(HttpFetcher::with_site(origin, dir));

    let page = HtmlPage::parse(PAGE, Some(base), config.clone(), Rc::clone(&fetcher)).unwrap();
    let loader = LibraryLoader::new(page.clone(), &config);
    let library = ScriptLibrary::from_config(&config);
    let renderer = StructureRenderer::new(page.clone(), fetcher, loader, library, config);

    let outcomes = renderer.on_page_ready().await;
    (outcomes, page.to_html())
}

#[tokio::test]
async fn test_embeds_viewers_with_local_library() {
    let dir = site("local", true);
    let (outcomes, html) = embed(&dir, Config::default()).await;

    assert_eq!(
        outcomes,
        vec![RenderOutcome::Rendered, RenderOutcome::Rendered, RenderOutcome::FetchFailed]
    );

    // One script reference, even with two containers waiting on it
    assert_eq!(html.matches("<script src=").count(), 1);
    assert!(html.contains("<script src=\"http://localhost/js/3Dmol-min.js\" async></script>\n</head>"));

    assert!(html.contains(r#"viewer.addModel("1\nstructure\nSi 0 0 0\n", "xyz");"#));
    assert!(html.contains(r#"viewer.addModel("2\nstructure\nNa 0 0 0\nCl 2.82 2.82 2.82\n", "xyz");"#));
    assert_eq!(html.matches("viewer.addLine(").count(), 24);
    assert!(html.contains(r#"viewer.setStyle({}, {"stick":{"radius":0.2},"sphere":{"scale":0.3}});"#));

    assert!(html.contains(r#"style="width: 100%; height: 420px; position: relative;""#));
    assert!(html.contains(r#"style="position: relative; width: 100%; height: 500px;""#));
    assert_eq!(html.matches(r#"data-loaded="true""#).count(), 3);

    // Fetch failures never put anything visible in the page
    assert!(!html.contains("structure-viewer-error"));
}

#[tokio::test]
async fn test_missing_library_shows_error_block() {
    let dir = site("nolib", false);
    let config = Config {
        library_sources: vec!["/js/3Dmol-min.js".to_string(), "/vendor/3Dmol-min.js".to_string()],
        timeout_ms: 300,
        poll_interval_ms: 50,
        ..Config::default()
    };
    let (outcomes, html) = embed(&dir, config).await;

    assert_eq!(
        outcomes,
        vec![
            RenderOutcome::LibraryUnavailable,
            RenderOutcome::LibraryUnavailable,
            RenderOutcome::FetchFailed
        ]
    );
    assert_eq!(html.matches(r#"<div class="structure-viewer-error">"#).count(), 2);
    assert!(html.contains("3Dmol failed to load: 3Dmol did not load within timeout"));
    assert!(html.contains(">Retry 3D viewer</button>"));
    assert!(html.contains("c.cviewRetry();"));
    assert!(!html.contains("<script src="));

    // The browser gets its own chance at the sources, with the drawing queued
    assert_eq!(
        html.matches(r#"load("$3Dmol", ["/js/3Dmol-min.js","/vendor/3Dmol-min.js"], 300, 50, function () {"#)
            .count(),
        2
    );
    assert!(html.contains(r#"viewer.addModel("1\nstructure\nSi 0 0 0\n", "xyz");"#));
    assert!(html.contains(r#"viewer.addModel("2\nstructure\nNa 0 0 0\nCl 2.82 2.82 2.82\n", "xyz");"#));
    assert_eq!(html.matches("viewer.addLine(").count(), 24);
    assert!(html.contains(r#"el.cviewRetry = function () { el.removeAttribute("data-loaded"); run(); };"#));
    assert!(html.contains(r#"style="width: 100%; height: 420px; position: relative;""#));
    assert_eq!(html.matches(r#"data-loaded="true""#).count(), 3);
}
