use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::catalog::{Catalog, FallbackTable, ImageDescriptor};
use crate::filter::FilteredView;
use crate::loader::{ImageLoader, LoadError};
use crate::locator::{display_url, PresentationParams};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TileSource {
    Local { locator: String },
    Remote { primary: String, fallback: String },
}

impl TileSource {
    pub fn resolve(item: &ImageDescriptor, fallbacks: &FallbackTable, params: &PresentationParams) -> Self {
        if item.is_local {
            return TileSource::Local {
                locator: item.locator.clone(),
            };
        }
        TileSource::Remote {
            primary: display_url(&item.locator, params),
            fallback: display_url(fallbacks.locator_for(item.category), params),
        }
    }
}

#[derive(thiserror::Error, Clone, Copy, Debug, Eq, PartialEq)]
pub enum TileFailure {
    #[error("image and its fallback both failed to load")]
    ImageLoadFailure,
    #[error("local image failed to render")]
    LocalLoadFailure,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TileState {
    Pending,
    Loading { url: String },
    Loaded { url: String },
    Failed(TileFailure),
}

/// Load state for one tile. The fallback flag makes the retry budget explicit:
/// a remote tile gets its primary URL and at most one fallback, a local tile
/// gets a single attempt.
#[derive(Clone, Debug)]
pub struct TileTask {
    source: TileSource,
    state: TileState,
    tried_fallback: bool,
    attempts: Vec<String>,
}

impl TileTask {
    pub fn new(source: TileSource) -> Self {
        Self {
            source,
            state: TileState::Pending,
            tried_fallback: false,
            attempts: Vec::new(),
        }
    }

    pub fn state(&self) -> &TileState {
        &self.state
    }

    pub fn attempts(&self) -> &[String] {
        &self.attempts
    }

    pub fn tried_fallback(&self) -> bool {
        self.tried_fallback
    }

    /// Starts the next load, if any remain. Returns `None` while a load is in
    /// flight and once the tile has settled.
    pub fn next_attempt(&mut self) -> Option<String> {
        if self.state != TileState::Pending {
            return None;
        }
        let url = match (&self.source, self.tried_fallback) {
            (TileSource::Local { locator }, false) => locator.clone(),
            (TileSource::Remote { primary, .. }, false) => primary.clone(),
            (TileSource::Remote { fallback, .. }, true) => fallback.clone(),
            (TileSource::Local { .. }, true) => return None,
        };
        self.attempts.push(url.clone());
        self.state = TileState::Loading { url: url.clone() };
        Some(url)
    }

    pub fn record(&mut self, outcome: Result<(), LoadError>) {
        let TileState::Loading { url } = &self.state else {
            return;
        };
        self.state = match (outcome, &self.source) {
            (Ok(()), _) => TileState::Loaded { url: url.clone() },
            (Err(_), TileSource::Local { .. }) => TileState::Failed(TileFailure::LocalLoadFailure),
            (Err(_), TileSource::Remote { .. }) if !self.tried_fallback => {
                self.tried_fallback = true;
                TileState::Pending
            }
            (Err(_), TileSource::Remote { .. }) => TileState::Failed(TileFailure::ImageLoadFailure),
        };
    }

    pub async fn run<L: ImageLoader + ?Sized>(mut self, loader: &L) -> Self {
        while let Some(url) = self.next_attempt() {
            debug!(url = %url, fallback = self.tried_fallback, "load");
            let outcome = loader.load(&url).await;
            if let Err(err) = &outcome {
                debug!(url = %url, error = %err, "load failed");
            }
            self.record(outcome);
        }
        if let TileState::Failed(failure) = &self.state {
            warn!(attempts = self.attempts.len(), error = %failure, "tile failed");
        }
        self
    }
}

#[derive(Clone, Debug)]
pub struct Tile {
    pub position: usize,
    pub catalog_index: usize,
    pub label: String,
    pub state: TileState,
    pub attempts: Vec<String>,
}

impl Tile {
    pub fn display_url(&self) -> Option<&str> {
        match &self.state {
            TileState::Loaded { url } => Some(url),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<TileFailure> {
        match &self.state {
            TileState::Failed(failure) => Some(*failure),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
struct PlannedTile {
    position: usize,
    catalog_index: usize,
    label: String,
    source: TileSource,
}

/// Owned load inputs for one render of a view. Built while the gallery is
/// borrowed, then run without it so slow hosts never hold up other updates.
#[derive(Clone, Debug, Default)]
pub struct RenderPlan {
    tiles: Vec<PlannedTile>,
}

impl RenderPlan {
    pub fn new(
        catalog: &Catalog,
        view: &FilteredView,
        fallbacks: &FallbackTable,
        params: &PresentationParams,
    ) -> Self {
        let tiles = view
            .indices()
            .iter()
            .enumerate()
            .filter_map(|(position, &catalog_index)| {
                let item = catalog.get(catalog_index)?;
                Some(PlannedTile {
                    position,
                    catalog_index,
                    label: item.label.clone(),
                    source: TileSource::resolve(item, fallbacks, params),
                })
            })
            .collect();
        Self { tiles }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Loads every tile concurrently and returns them in view order.
    pub async fn run<L: ImageLoader + ?Sized>(self, loader: &L) -> Vec<Tile> {
        let tasks = self.tiles.into_iter().map(|planned| async move {
            let task = TileTask::new(planned.source).run(loader).await;
            Tile {
                position: planned.position,
                catalog_index: planned.catalog_index,
                label: planned.label,
                state: task.state,
                attempts: task.attempts,
            }
        });
        join_all(tasks).await
    }
}

pub async fn render_view<L: ImageLoader + ?Sized>(
    catalog: &Catalog,
    view: &FilteredView,
    fallbacks: &FallbackTable,
    params: &PresentationParams,
    loader: &L,
) -> Vec<Tile> {
    RenderPlan::new(catalog, view, fallbacks, params)
        .run(loader)
        .await
}
