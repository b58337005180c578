// src/viewer.rs
//
// Handle API of the molecular viewer library (3Dmol.js): `createViewer`,
// `addModel`, `setStyle`, `addLine`, `zoomTo`, `render`.

use crate::config::ViewerStyle;
use crate::error::Result;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Xyz,
}

impl ModelFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelFormat::Xyz => "xyz",
        }
    }
}

/// Atom selector; the empty selector matches every atom.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AtomSelector {}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StickStyle {
    pub radius: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SphereStyle {
    pub scale: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StyleSpec {
    pub stick: StickStyle,
    pub sphere: SphereStyle,
}

impl From<&ViewerStyle> for StyleSpec {
    fn from(style: &ViewerStyle) -> Self {
        Self {
            stick: StickStyle { radius: style.stick_radius },
            sphere: SphereStyle { scale: style.sphere_scale },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<[f64; 3]> for Point {
    fn from(p: [f64; 3]) -> Self {
        Self { x: p[0], y: p[1], z: p[2] }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineSpec {
    pub start: Point,
    pub end: Point,
    pub color: String,
}

/// A viewer bound to one container.
pub trait Viewer {
    fn add_model(&mut self, data: &str, format: ModelFormat) -> Result<()>;
    fn set_style(&mut self, selector: &AtomSelector, style: &StyleSpec) -> Result<()>;
    fn add_line(&mut self, line: &LineSpec) -> Result<()>;
    fn zoom_to(&mut self) -> Result<()>;
    fn render(&mut self) -> Result<()>;
}

/// The library global; only `createViewer` is needed.
pub trait ViewerLibrary<C> {
    type Viewer: Viewer;

    fn create_viewer(&self, container: &C) -> Result<Self::Viewer>;

    /// Viewer for a container whose library never showed up, for hosts that
    /// can replay the drawing once it does. `None` when the host cannot.
    fn create_pending_viewer(&self, _container: &C) -> Result<Option<Self::Viewer>> {
        Ok(None)
    }
}
