// src/io/mod.rs
pub mod parsed;
pub mod xyz;

use crate::error::Result;
use crate::model::StructureDocument;
use std::fs;

pub fn load_document(path: &str) -> Result<StructureDocument> {
    let text = fs::read_to_string(path)?;
    StructureDocument::from_json(&text)
}

pub fn save_document(path: &str, doc: &StructureDocument) -> Result<()> {
    let text = serde_json::to_string_pretty(doc)?;
    fs::write(path, text)?;
    Ok(())
}
