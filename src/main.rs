use cview_embed::config::Config;
use cview_embed::fetch::HttpFetcher;
use cview_embed::html::{viewer_markup, HtmlPage, ScriptLibrary};
use cview_embed::io;
use cview_embed::io::{parsed, xyz};
use cview_embed::loader::LibraryLoader;
use cview_embed::renderer::{RenderOutcome, StructureRenderer};
use cview_embed::utils::logger;
use cview_embed::{Error, Result};
use log::{error, info, warn, LevelFilter};
use reqwest::Url;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

const USAGE: &str = "\
Usage:
  cview-embed embed <page.html> [--site DIR] [--base-url URL] [-o OUT] [--config FILE]
  cview-embed snippet <json-path> [--height H]
  cview-embed extract <parsed.json|DIR> [-o OUT] [--out-dir DIR] [--embed] [--data-url URL] [--height H]
  cview-embed xyz <structure.json> [-o OUT]

Options:
  -v, --verbose   debug logging (or set CVIEW_LOG)";

// Options that take a value
const VALUED: [&str; 8] = [
    "--site",
    "--base-url",
    "-o",
    "--out",
    "--config",
    "--height",
    "--out-dir",
    "--data-url",
];
const FLAGS: [&str; 1] = ["--embed"];

struct CliArgs {
    positional: Vec<String>,
    options: HashMap<String, String>,
    flags: HashSet<String>,
}

impl CliArgs {
    fn parse(args: &[String]) -> std::result::Result<Self, String> {
        let mut positional = Vec::new();
        let mut options = HashMap::new();
        let mut flags = HashSet::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if VALUED.contains(&arg.as_str()) {
                let value = iter.next().ok_or_else(|| format!("{} needs a value", arg))?;
                let key = if arg == "--out" { "-o" } else { arg.as_str() };
                options.insert(key.to_string(), value.clone());
            } else if FLAGS.contains(&arg.as_str()) {
                flags.insert(arg.clone());
            } else if arg.starts_with('-') {
                return Err(format!("unknown option {}", arg));
            } else {
                positional.push(arg.clone());
            }
        }
        Ok(Self { positional, options, flags })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    fn has(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");
    args.retain(|a| a != "-v" && a != "--verbose");

    let level = logger::level_from_env(if verbose { LevelFilter::Debug } else { LevelFilter::Info });
    let _ = logger::init(level);

    let Some((command, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };
    let parsed = CliArgs::parse(rest).and_then(|cli| {
        if cli.positional.is_empty() {
            Err("missing input".to_string())
        } else {
            Ok(cli)
        }
    });
    let cli = match parsed {
        Ok(cli) => cli,
        Err(msg) => {
            eprintln!("{}\n\n{}", msg, USAGE);
            return ExitCode::from(2);
        }
    };

    let result = match command.as_str() {
        "embed" => embed(&cli).await,
        "snippet" => snippet(&cli),
        "extract" => extract(&cli),
        "xyz" => to_xyz(&cli),
        other => {
            eprintln!("unknown command {}\n\n{}", other, USAGE);
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Renders every structure container of a built page in place.
async fn embed(cli: &CliArgs) -> Result<()> {
    let page_path = PathBuf::from(cli.positional[0].as_str());

    let (config, msg) = match cli.get("--config") {
        Some(path) => Config::load_from(Path::new(path)),
        None => Config::load(),
    };
    info!("{}", msg);

    let source = fs::read_to_string(&page_path)?;
    let site_dir = cli
        .get("--site")
        .map(PathBuf::from)
        .or_else(|| page_path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let base_url = match cli.get("--base-url") {
        Some(url) => Url::parse(url).map_err(|e| Error::Url(format!("{}: {}", url, e)))?,
        None => local_page_url(&page_path, &site_dir)?,
    };
    let origin = base_url
        .join("/")
        .map_err(|e| Error::Url(format!("{}: {}", base_url, e)))?;
    info!("Page {} served from {:?}", base_url, site_dir);

    let fetcher = Rc::new(HttpFetcher::with_site(origin, &site_dir));
    let page = HtmlPage::parse(&source, Some(base_url), config.clone(), Rc::clone(&fetcher))?;
    let loader = LibraryLoader::new(page.clone(), &config);
    let renderer = StructureRenderer::new(
        page.clone(),
        fetcher,
        loader,
        ScriptLibrary::from_config(&config),
        config,
    );

    let outcomes = renderer.on_page_ready().await;
    let rendered = outcomes.iter().filter(|o| **o == RenderOutcome::Rendered).count();
    let skipped = outcomes.iter().filter(|o| **o == RenderOutcome::Skipped).count();
    if rendered + skipped < outcomes.len() {
        warn!("{} container(s) failed", outcomes.len() - rendered - skipped);
    }
    info!("{} of {} container(s) rendered", rendered, outcomes.len());

    let out = cli.get("-o").map(PathBuf::from).unwrap_or(page_path);
    fs::write(&out, page.to_html())?;
    info!("Wrote {:?}", out);
    Ok(())
}

/// `http://localhost/<page path inside the site>`
fn local_page_url(page: &Path, site: &Path) -> Result<Url> {
    let page_abs = fs::canonicalize(page).unwrap_or_else(|_| page.to_path_buf());
    let site_abs = fs::canonicalize(site).unwrap_or_else(|_| site.to_path_buf());

    let rel: Vec<String> = match page_abs.strip_prefix(&site_abs) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect(),
        Err(_) => page
            .file_name()
            .map(|n| vec![n.to_string_lossy().into_owned()])
            .unwrap_or_default(),
    };

    let root = Url::parse("http://localhost/").map_err(|e| Error::Url(e.to_string()))?;
    root.join(&rel.join("/"))
        .map_err(|e| Error::Url(format!("{}: {}", rel.join("/"), e)))
}

fn snippet(cli: &CliArgs) -> Result<()> {
    let height = cli.get("--height").unwrap_or("500px");
    print!("{}", viewer_markup(&cli.positional[0], height));
    Ok(())
}

/// Parser output -> `<name>_structure.json`, for one file or a whole tree.
fn extract(cli: &CliArgs) -> Result<()> {
    let input = Path::new(cli.positional[0].as_str());
    let out_dir = cli.get("--out-dir").map(Path::new);

    let done = match cli.get("-o") {
        Some(out) if input.is_file() => vec![parsed::extract_file(input, Path::new(out))?],
        Some(_) => {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "-o takes a single input file; use --out-dir for directories",
            )))
        }
        None => parsed::extract_all(input, out_dir)?,
    };
    info!("Extracted {} structure(s)", done.len());

    if cli.has("--embed") && !done.is_empty() {
        let dir = match (out_dir, cli.get("-o")) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(out)) => Path::new(out).parent().map(Path::to_path_buf).unwrap_or_default(),
            (None, None) if input.is_dir() => input.to_path_buf(),
            (None, None) => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let md = parsed::embeds_markdown(
            &done,
            cli.get("--data-url").unwrap_or(""),
            cli.get("--height").unwrap_or("500px"),
        );
        let md_path = dir.join(parsed::EMBEDS_FILE);
        fs::write(&md_path, md)?;
        info!("Wrote viewer snippets to {:?}", md_path);
    }
    Ok(())
}

fn to_xyz(cli: &CliArgs) -> Result<()> {
    let config = Config::load().0;
    let doc = io::load_document(&cli.positional[0])?;
    match cli.get("-o") {
        Some(path) => {
            xyz::write(path, &doc, &config.placeholder_symbol, &config.comment_line)?;
            info!("Wrote {}", path);
        }
        None => print!(
            "{}",
            xyz::to_coordinate_text(&doc, &config.placeholder_symbol, &config.comment_line)
        ),
    }
    Ok(())
}
