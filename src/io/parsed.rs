// src/io/parsed.rs
//
// Parser output (`*_parsed.json`) -> structure documents, one file or a
// whole tree at a time, plus the markdown page of viewer snippets for them.

use crate::error::{Error, Result};
use crate::html::viewer_markup;
use crate::model::StructureDocument;
use log::{error, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const PARSED_SUFFIX: &str = "_parsed.json";
pub const EMBEDS_FILE: &str = "visualization_embeds.md";

/// One structure written by [`extract_all`].
#[derive(Clone, Debug, PartialEq)]
pub struct Extracted {
    pub name: String,
    pub output: PathBuf,
    pub sites: usize,
}

/// `si_parsed.json` -> `si`
pub fn structure_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace("_parsed", ""))
        .unwrap_or_else(|| "output".to_string())
}

/// Every `*_parsed.json` below `root`, sorted by path.
pub fn find_parsed_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .file_name()
                .map(|n| n.to_string_lossy().ends_with(PARSED_SUFFIX))
                .unwrap_or(false)
            {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

pub fn extract_file(input: &Path, output: &Path) -> Result<Extracted> {
    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(input)?)?;
    let doc = StructureDocument::from_parsed_output(&parsed)?;
    super::save_document(&output.to_string_lossy(), &doc)?;
    info!("Saved structure ({} sites) to {:?}", doc.sites.len(), output);
    Ok(Extracted {
        name: structure_name(input),
        output: output.to_path_buf(),
        sites: doc.sites.len(),
    })
}

/// Extracts a single parser output, or every one under a directory.
///
/// Results land in `out_dir` when given, next to each input otherwise. In a
/// directory run, files that cannot be read or hold no structure are logged
/// and skipped; a single file fails the call.
pub fn extract_all(input: &Path, out_dir: Option<&Path>) -> Result<Vec<Extracted>> {
    if let Some(dir) = out_dir {
        fs::create_dir_all(dir)?;
    }
    let target = |file: &Path| {
        let dir = out_dir
            .map(Path::to_path_buf)
            .or_else(|| file.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        dir.join(format!("{}_structure.json", structure_name(file)))
    };

    if input.is_file() {
        return extract_file(input, &target(input)).map(|e| vec![e]);
    }
    if !input.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{}: not a file or directory", input.display()),
        )));
    }

    let files = find_parsed_files(input)?;
    if files.is_empty() {
        warn!("No *{} files found in {:?}", PARSED_SUFFIX, input);
        return Ok(Vec::new());
    }
    info!("Found {} parsed file(s) in {:?}", files.len(), input);

    let mut done = Vec::new();
    for file in &files {
        match extract_file(file, &target(file)) {
            Ok(e) => done.push(e),
            Err(e) => error!("Skipping {:?}: {}", file, e),
        }
    }
    Ok(done)
}

/// Markdown page with one heading and viewer card per structure. Data paths
/// are `data_url` joined with the output file name.
pub fn embeds_markdown(entries: &[Extracted], data_url: &str, height: &str) -> String {
    let mut md = String::from("# Structure viewers\n\n");
    md.push_str(&format!(
        "Copy the generated `*_structure.json` files to `{}` on the documentation site.\n\n---\n\n",
        if data_url.is_empty() { "the page's directory" } else { data_url }
    ));
    for entry in entries {
        let file = entry
            .output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = if data_url.is_empty() {
            file
        } else {
            format!("{}/{}", data_url.trim_end_matches('/'), file)
        };
        md.push_str(&format!("### Structure: `{}`\n", entry.name));
        md.push_str(&viewer_markup(&path, height));
        md.push('\n');
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARSED: &str = r#"{"results":{"properties":{"structure":{
        "lattice_vectors":[[4,0,0],[0,4,0],[0,0,4]],
        "species_at_sites":["Na","Cl"],
        "cartesian_site_positions":[[0,0,0],[2,2,2]]}}}}"#;

    fn tree(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cview-embed-parsed-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("a")).unwrap();
        fs::create_dir_all(dir.join("b/c")).unwrap();
        fs::write(dir.join("a/nacl_parsed.json"), PARSED).unwrap();
        fs::write(dir.join("b/c/kcl_parsed.json"), PARSED).unwrap();
        fs::write(dir.join("broken_parsed.json"), "{ nope").unwrap();
        fs::write(dir.join("notes.json"), PARSED).unwrap();
        dir
    }

    #[test]
    fn test_structure_name() {
        assert_eq!(structure_name(Path::new("runs/si_parsed.json")), "si");
        assert_eq!(structure_name(Path::new("gaas.json")), "gaas");
    }

    #[test]
    fn test_finds_nested_parsed_files_in_order() {
        let dir = tree("find");
        let files = find_parsed_files(&dir).unwrap();
        let names: Vec<String> = files.iter().map(|f| structure_name(f)).collect();
        assert_eq!(names, vec!["nacl", "kcl", "broken"]);
    }

    #[test]
    fn test_directory_run_skips_bad_files() {
        let dir = tree("batch");
        let out = dir.join("viz");
        let done = extract_all(&dir, Some(&out)).unwrap();

        let names: Vec<&str> = done.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["nacl", "kcl"]);
        assert_eq!(done[0].sites, 2);
        let doc = crate::io::load_document(&out.join("kcl_structure.json").to_string_lossy()).unwrap();
        assert_eq!(doc.sites[1].element.as_deref(), Some("Cl"));
        assert!(!out.join("broken_structure.json").exists());
    }

    #[test]
    fn test_single_file_lands_next_to_input() {
        let dir = tree("single");
        let done = extract_all(&dir.join("a/nacl_parsed.json"), None).unwrap();
        assert_eq!(done[0].output, dir.join("a/nacl_structure.json"));
        assert!(done[0].output.exists());

        assert!(extract_all(&dir.join("broken_parsed.json"), None).is_err());
        assert!(extract_all(&dir.join("missing"), None).is_err());
    }

    #[test]
    fn test_embeds_page_has_a_card_per_structure() {
        let entries = vec![
            Extracted { name: "nacl".into(), output: PathBuf::from("viz/nacl_structure.json"), sites: 2 },
            Extracted { name: "kcl".into(), output: PathBuf::from("viz/kcl_structure.json"), sites: 2 },
        ];
        let md = embeds_markdown(&entries, "/assets/viz_data/", "400px");
        assert!(md.starts_with("# Structure viewers\n\n"));
        assert!(md.contains("### Structure: `nacl`\n"));
        assert!(md.contains(r#"data-json="/assets/viz_data/kcl_structure.json""#));
        assert_eq!(md.matches(r#"class="structure-viewer""#).count(), 2);
        assert!(md.contains("height: 400px;"));

        let bare = embeds_markdown(&entries[..1], "", "500px");
        assert!(bare.contains(r#"data-json="nacl_structure.json""#));
    }
}
