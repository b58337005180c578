// src/renderer.rs

use crate::config::Config;
use crate::error::Result;
use crate::fetch::{fetch_structure, Fetcher};
use crate::io::xyz::to_coordinate_text;
use crate::loader::{LibraryLoader, ScriptHost};
use crate::model::StructureDocument;
use crate::page::{Container, ErrorBlock, Page};
use crate::rendering::cell::cell_segments;
use crate::viewer::{AtomSelector, LineSpec, ModelFormat, StyleSpec, Viewer, ViewerLibrary};
use futures_util::future::join_all;
use log::{debug, error, info, warn};

/// Where a container ended up after one pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// No data path, or already initialized
    Skipped,
    FetchFailed,
    /// Library never appeared; the error block with a retry control is shown
    LibraryUnavailable,
    /// Drawing threw; the container may be partially initialized
    RenderFailed,
    Rendered,
}

pub struct StructureRenderer<P, F, H, L> {
    page: P,
    fetcher: F,
    loader: LibraryLoader<H>,
    library: L,
    config: Config,
}

impl<P, F, H, L> StructureRenderer<P, F, H, L>
where
    P: Page,
    F: Fetcher,
    H: ScriptHost,
    L: ViewerLibrary<P::Container>,
{
    pub fn new(page: P, fetcher: F, loader: LibraryLoader<H>, library: L, config: Config) -> Self {
        Self {
            page,
            fetcher,
            loader,
            library,
            config,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Full page load.
    pub async fn on_page_ready(&self) -> Vec<RenderOutcome> {
        self.render_all().await
    }

    /// In-site navigation; already rendered containers are left alone.
    pub async fn on_navigation(&self) -> Vec<RenderOutcome> {
        self.render_all().await
    }

    /// Runs every container's pipeline side by side. One container failing
    /// has no effect on the others.
    pub async fn render_all(&self) -> Vec<RenderOutcome> {
        let containers = self.page.containers();
        debug!("{} structure container(s) on page", containers.len());
        join_all(containers.iter().map(|c| self.render_one(c))).await
    }

    /// The retry control: forget the container was initialized and scan again.
    pub async fn retry(&self, container: &P::Container) -> Vec<RenderOutcome> {
        container.set_loaded(false);
        self.render_all().await
    }

    pub async fn render_one(&self, container: &P::Container) -> RenderOutcome {
        let Some(path) = container.json_path() else {
            return RenderOutcome::Skipped;
        };
        if container.is_loaded() {
            return RenderOutcome::Skipped;
        }
        // Marked before the first await so a second scan cannot start it again
        container.set_loaded(true);

        let base = self.page.base_url();
        let doc = match fetch_structure(&self.fetcher, &path, base.as_ref()).await {
            Ok(doc) => doc,
            Err(e) => {
                error!("structure viewer: {}", e);
                return RenderOutcome::FetchFailed;
            }
        };

        if let Err(e) = self.loader.ensure_ready_default().await {
            warn!("structure viewer {}: {}", path, e);
            container.clear();
            container.show_error(&ErrorBlock {
                message: format!("3Dmol failed to load: {}", e),
                retry_label: "Retry 3D viewer".to_string(),
            });
            self.defer_draw(container, &doc, &path);
            return RenderOutcome::LibraryUnavailable;
        }

        match self.draw(container, &doc) {
            Ok(()) => {
                info!("Rendered {} ({} sites)", path, doc.sites.len());
                RenderOutcome::Rendered
            }
            Err(e) => {
                error!("Error rendering structure viewer for {}: {}", path, e);
                RenderOutcome::RenderFailed
            }
        }
    }

    fn draw(&self, container: &P::Container, doc: &StructureDocument) -> Result<()> {
        container.clear();
        self.size(container);
        let mut viewer = self.library.create_viewer(container)?;
        self.paint(&mut viewer, doc)
    }

    /// Leaves the drawing with hosts that can run it once the library loads.
    fn defer_draw(&self, container: &P::Container, doc: &StructureDocument, path: &str) {
        let deferred = self.library.create_pending_viewer(container).and_then(|viewer| match viewer {
            Some(mut viewer) => {
                self.size(container);
                self.paint(&mut viewer, doc).map(|()| true)
            }
            None => Ok(false),
        });
        match deferred {
            Ok(true) => debug!("drawing for {} deferred until 3Dmol loads", path),
            Ok(false) => {}
            Err(e) => warn!("could not defer drawing for {}: {}", path, e),
        }
    }

    fn size(&self, container: &P::Container) {
        let height = container
            .inline_height()
            .unwrap_or_else(|| self.config.default_height.clone());
        container.set_size("100%", &height);
    }

    fn paint(&self, viewer: &mut L::Viewer, doc: &StructureDocument) -> Result<()> {
        let cfg = &self.config;
        let xyz = to_coordinate_text(doc, &cfg.placeholder_symbol, &cfg.comment_line);

        viewer.add_model(&xyz, ModelFormat::Xyz)?;
        viewer.set_style(&AtomSelector::default(), &StyleSpec::from(&cfg.style))?;

        // Unit cell
        let lattice = doc.lattice_vectors()?;
        for (start, end) in cell_segments(lattice) {
            viewer.add_line(&LineSpec {
                start: start.into(),
                end: end.into(),
                color: cfg.style.cell_color.clone(),
            })?;
        }

        viewer.zoom_to()?;
        viewer.render()
    }
}
