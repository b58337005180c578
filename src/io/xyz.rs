// src/io/xyz.rs

use crate::error::Result;
use crate::model::StructureDocument;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;

/// Builds the XYZ text handed to the viewer:
///
/// ```text
/// <site count>
/// <comment>
/// <symbol> <x> <y> <z>     (one line per site)
/// ```
pub fn to_coordinate_text(doc: &StructureDocument, placeholder: &str, comment: &str) -> String {
    let mut out = format!("{}\n{}\n", doc.sites.len(), comment);
    for site in &doc.sites {
        let [x, y, z] = site.xyz;
        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "{} {} {} {}",
            site.symbol(placeholder),
            coord(x),
            coord(y),
            coord(z)
        );
    }
    out
}

pub fn write(path: &str, doc: &StructureDocument, placeholder: &str, comment: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(to_coordinate_text(doc, placeholder, comment).as_bytes())?;
    Ok(())
}

/// Shortest form, no trailing `.0`, and `-0` folded into `0`.
fn coord(v: f64) -> String {
    format!("{}", v + 0.0)
}
