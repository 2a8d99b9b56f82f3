use std::time::{Duration, Instant};

use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, FallbackTable, ImageDescriptor};
use crate::category::{Category, CategoryFilter};
use crate::config::GalleryConfig;
use crate::error::GalleryError;
use crate::filter::FilteredView;
use crate::loader::ImageLoader;
use crate::locator::PresentationParams;
use crate::render::{RenderPlan, Tile};
use crate::share::{share_url, SharePlatform};
use crate::upload::{decode_upload, UploadAffordance, UploadSession, UploadSource};
use crate::viewer::{Direction, Viewer, ViewerCommand, ViewerDisplay, ViewerInput, ViewerSync};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Clone, Debug)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub shown_at: Instant,
}

/// Side effects the host is expected to carry out.
#[derive(Clone, Debug)]
pub enum GalleryEvent {
    Redraw,
    ScrollLocked,
    ScrollRestored,
    Share { platform: SharePlatform, url: String },
    Notice(Notice),
}

#[derive(Debug, Default)]
pub struct UploadReport {
    /// Catalog positions of the appended images, in completion order.
    pub added: Vec<usize>,
    pub failures: Vec<GalleryError>,
}

pub struct Gallery {
    catalog: Catalog,
    view: FilteredView,
    viewer: Viewer,
    fallbacks: FallbackTable,
    params: PresentationParams,
    page_url: String,
    uploads: UploadSession,
    notices: Vec<Notice>,
    notice_duration: Duration,
    events: Vec<GalleryEvent>,
}

impl Gallery {
    pub fn new(config: &GalleryConfig) -> Self {
        let catalog = config.catalog();
        let view = FilteredView::derive(&catalog, CategoryFilter::All);
        Self {
            catalog,
            view,
            viewer: Viewer::Closed,
            fallbacks: config.fallback_table(),
            params: config.presentation,
            page_url: config.page_url.clone(),
            uploads: UploadSession::new(config.max_upload_bytes),
            notices: Vec::new(),
            notice_duration: config.notice_duration(),
            events: Vec::new(),
        }
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        let mut gallery = Self::new(&GalleryConfig::default());
        gallery.view = FilteredView::derive(&catalog, CategoryFilter::All);
        gallery.catalog = catalog;
        gallery
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn view(&self) -> &FilteredView {
        &self.view
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn set_page_url(&mut self, page_url: impl Into<String>) {
        self.page_url = page_url.into();
    }

    pub fn view_items(&self) -> impl Iterator<Item = &ImageDescriptor> {
        self.view.items(&self.catalog)
    }

    pub fn set_category(&mut self, category: &str) -> &FilteredView {
        let filter = CategoryFilter::parse(category);
        debug!(filter = %filter, "filter");
        self.view = FilteredView::derive(&self.catalog, filter);
        self.sync_viewer();
        self.events.push(GalleryEvent::Redraw);
        &self.view
    }

    pub fn open(&mut self, index: usize) -> Result<ViewerDisplay, GalleryError> {
        let was_open = self.viewer.is_open();
        self.viewer.open(index, self.view.len())?;
        if !was_open {
            self.events.push(GalleryEvent::ScrollLocked);
        }
        self.events.push(GalleryEvent::Redraw);
        self.viewer
            .display(&self.catalog, &self.view)
            .ok_or(GalleryError::InvalidIndex {
                index,
                len: self.view.len(),
            })
    }

    pub fn close(&mut self) {
        if self.viewer.close() {
            self.events.push(GalleryEvent::ScrollRestored);
            self.events.push(GalleryEvent::Redraw);
        }
    }

    pub fn previous(&mut self) -> Option<ViewerDisplay> {
        self.step(Direction::Previous)
    }

    pub fn next(&mut self) -> Option<ViewerDisplay> {
        self.step(Direction::Next)
    }

    /// Navigating an empty view closes the viewer instead of failing.
    pub fn step(&mut self, direction: Direction) -> Option<ViewerDisplay> {
        match self.viewer.step(direction, self.view.len()) {
            Ok(Some(_)) => {
                self.events.push(GalleryEvent::Redraw);
                self.viewer_display()
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "closing viewer");
                self.close();
                None
            }
        }
    }

    /// Applies a click, key or swipe. Inputs only count while the viewer is open.
    pub fn handle_input(&mut self, input: ViewerInput) -> bool {
        if !self.viewer.is_open() {
            return false;
        }
        match input.command() {
            Some(ViewerCommand::Close) => self.close(),
            Some(ViewerCommand::Step(direction)) => {
                self.step(direction);
            }
            None => return false,
        }
        true
    }

    pub fn viewer_display(&self) -> Option<ViewerDisplay> {
        self.viewer.display(&self.catalog, &self.view)
    }

    /// Builds and dispatches a share intent for the shown image. Unknown
    /// platforms and a closed viewer are no-ops.
    pub fn share(&mut self, platform: &str) -> Option<String> {
        let platform = SharePlatform::parse(platform)?;
        let index = self.viewer.current_index()?;
        let item = self.view.get(&self.catalog, index)?;
        let url = share_url(platform, item, &self.page_url)?;
        info!(platform = %platform, label = %item.label, "share");
        self.events.push(GalleryEvent::Share {
            platform,
            url: url.clone(),
        });
        Some(url)
    }

    pub fn select_files(&mut self, files: Vec<Box<dyn UploadSource>>) -> Vec<GalleryError> {
        let rejected = self.uploads.select(files);
        for err in &rejected {
            self.notify(NoticeKind::Error, err.to_string());
        }
        self.events.push(GalleryEvent::Redraw);
        rejected
    }

    pub fn upload_affordance(&self) -> UploadAffordance {
        self.uploads.affordance()
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.uploads.limit()
    }

    /// Decodes the pending selection into `category` (unknown names become
    /// `misc`). Each file is appended as soon as its own decode finishes.
    pub async fn commit_uploads(&mut self, category: Option<&str>) -> Result<UploadReport, GalleryError> {
        let files = self.uploads.take()?;
        let target = Category::parse_or_misc(category);
        info!(count = files.len(), category = %target, "commit uploads");

        let mut decodes: FuturesUnordered<_> = files
            .into_iter()
            .map(|file| decode_upload(file, target))
            .collect();
        let mut report = UploadReport::default();
        while let Some(outcome) = decodes.next().await {
            match outcome {
                Ok(item) => report.added.push(self.append(item)),
                Err(err) => {
                    warn!(error = %err, "upload decode failed");
                    self.notify(NoticeKind::Error, err.to_string());
                    report.failures.push(err);
                }
            }
        }

        self.uploads.reset();
        if !report.added.is_empty() {
            let count = report.added.len();
            let noun = if count == 1 { "image" } else { "images" };
            self.notify(NoticeKind::Success, format!("Uploaded {count} {noun}"));
        }
        Ok(report)
    }

    pub fn append(&mut self, item: ImageDescriptor) -> usize {
        let idx = self.catalog.len();
        let shown = self.view.append_if_matches(idx, &item);
        debug!(label = %item.label, shown, "append");
        self.catalog.push(item);
        self.sync_viewer();
        self.events.push(GalleryEvent::Redraw);
        idx
    }

    /// Snapshot of the current view's load inputs; run it after releasing
    /// any lock around the gallery.
    pub fn render_plan(&self) -> RenderPlan {
        RenderPlan::new(&self.catalog, &self.view, &self.fallbacks, &self.params)
    }

    pub async fn render<L: ImageLoader + ?Sized>(&self, loader: &L) -> Vec<Tile> {
        self.render_plan().run(loader).await
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn prune_notices(&mut self, now: Instant) {
        let duration = self.notice_duration;
        self.notices
            .retain(|notice| now.saturating_duration_since(notice.shown_at) < duration);
    }

    /// Takes the pending host events; back-to-back redraws collapse into one.
    pub fn drain_events(&mut self) -> Vec<GalleryEvent> {
        let mut drained: Vec<GalleryEvent> = Vec::with_capacity(self.events.len());
        for event in self.events.drain(..) {
            if matches!(event, GalleryEvent::Redraw)
                && matches!(drained.last(), Some(GalleryEvent::Redraw))
            {
                continue;
            }
            drained.push(event);
        }
        drained
    }

    fn notify(&mut self, kind: NoticeKind, message: String) {
        let notice = Notice {
            kind,
            message,
            shown_at: Instant::now(),
        };
        self.notices.push(notice.clone());
        self.events.push(GalleryEvent::Notice(notice));
    }

    fn sync_viewer(&mut self) {
        match self.viewer.sync_len(self.view.len()) {
            ViewerSync::Unchanged => {}
            ViewerSync::Clamped { index } => debug!(index, "viewer index clamped"),
            ViewerSync::Closed => {
                debug!("viewer closed on empty view");
                self.events.push(GalleryEvent::ScrollRestored);
            }
        }
    }
}
