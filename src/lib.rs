//! Crystal-structure viewers for documentation pages.
//!
//! Containers marked with the `structure-viewer` class point at a structure
//! JSON file; [`renderer::StructureRenderer`] fetches it, makes sure the 3Dmol
//! library is loaded ([`loader::LibraryLoader`]) and draws the atoms plus the
//! unit cell outline.

pub mod config;
pub mod error;
pub mod fetch;
pub mod html;
pub mod io;
pub mod loader;
pub mod model;
pub mod page;
pub mod renderer;
pub mod rendering;
pub mod utils;
pub mod viewer;

pub use config::Config;
pub use error::{Error, Result};
pub use model::StructureDocument;
pub use renderer::{RenderOutcome, StructureRenderer};
