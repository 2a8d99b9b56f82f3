use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use askama::Template;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use gallery_core::{
    Category, Gallery, GalleryConfig, GalleryEvent, HttpImageLoader, ImageLoader, InMemoryFile,
    Key, NoticeKind, SharePlatform, TileState, UploadSource, ViewerInput, ALL_SENTINEL,
};
use serde::Deserialize;
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "gallery-web", version, about = "Browser front end for the image gallery")]
struct Cli {
    /// Gallery config file (JSON)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Bind host (default localhost only)
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Bind port
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Public page address used in share links (overrides config)
    #[arg(long)]
    page_url: Option<String>,
}

#[derive(Clone)]
struct AppState {
    gallery: Arc<Mutex<Gallery>>,
    loader: Arc<dyn ImageLoader>,
}

#[derive(Debug, Default, Deserialize)]
struct IndexParams {
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SwipeParams {
    dx: f32,
    dy: f32,
}

#[derive(Clone, Debug)]
struct FilterLink {
    label: String,
    href: String,
    active: bool,
}

#[derive(Clone, Debug)]
struct TileView {
    label: String,
    open_href: String,
    url: Option<String>,
    failure: Option<String>,
}

#[derive(Clone, Debug)]
struct ShareLink {
    label: String,
    href: String,
}

#[derive(Clone, Debug)]
struct ViewerView {
    locator: String,
    label: String,
    counter: String,
    shares: Vec<ShareLink>,
}

#[derive(Clone, Debug)]
struct NoticeView {
    css_class: String,
    message: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    filters: Vec<FilterLink>,
    selected: String,
    tiles: Vec<TileView>,
    viewer: Option<ViewerView>,
    notices: Vec<NoticeView>,
    upload_categories: Vec<String>,
    upload_text: String,
    max_upload_mib: u64,
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(content) => Html(content).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to render template: {err}"),
            )
                .into_response(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config =
        GalleryConfig::resolve(cli.config.as_deref()).context("failed to load config")?;
    if let Some(page_url) = cli.page_url {
        config.page_url = page_url;
    }
    let max_upload_bytes = config.max_upload_bytes;

    let state = AppState {
        gallery: Arc::new(Mutex::new(Gallery::new(&config))),
        loader: Arc::new(HttpImageLoader::new()),
    };
    info!(images = config.images.len(), max_upload_bytes, "gallery ready");

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .context("invalid bind host/port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;
    let local_addr = listener
        .local_addr()
        .context("failed to read bound address")?;
    println!("gallery-web listening on http://{local_addr}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("web server exited with error")?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/viewer/open/:index", get(open_handler))
        .route("/viewer/close", get(close_handler))
        .route("/viewer/prev", get(prev_handler))
        .route("/viewer/next", get(next_handler))
        .route("/viewer/key/:key", get(key_handler))
        .route("/viewer/swipe", get(swipe_handler))
        .route("/share/:platform", get(share_handler))
        .route("/upload", post(upload_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(state)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gallery_web=debug,gallery_core=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}

/// The page is re-rendered on every request, so redraw and scroll events
/// only need to be logged here.
fn flush_events(gallery: &mut Gallery) {
    for event in gallery.drain_events() {
        match event {
            GalleryEvent::Redraw => debug!("redraw"),
            GalleryEvent::ScrollLocked => debug!("scroll locked"),
            GalleryEvent::ScrollRestored => debug!("scroll restored"),
            GalleryEvent::Share { platform, url } => info!(%platform, %url, "share"),
            GalleryEvent::Notice(notice) => debug!(message = %notice.message, "notice"),
        }
    }
}

async fn index_handler(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> impl IntoResponse {
    let mut gallery = state.gallery.lock().await;
    if let Some(category) = params.category.as_deref() {
        gallery.set_category(category);
    }
    gallery.prune_notices(Instant::now());
    flush_events(&mut gallery);

    let plan = gallery.render_plan();
    let selected = gallery.view().filter().as_str().to_string();
    let viewer = gallery.viewer_display().map(|shown| ViewerView {
        locator: shown.locator,
        label: shown.label,
        counter: shown.counter,
        shares: SharePlatform::ALL
            .iter()
            .map(|platform| ShareLink {
                label: platform.as_str().to_string(),
                href: format!("/share/{}", platform.as_str()),
            })
            .collect(),
    });
    let notices = gallery
        .notices()
        .iter()
        .map(|notice| NoticeView {
            css_class: match notice.kind {
                NoticeKind::Success => "notice success".to_string(),
                NoticeKind::Error => "notice error".to_string(),
            },
            message: notice.message.clone(),
        })
        .collect();
    let upload_text = gallery.upload_affordance().text;
    let max_upload_mib = gallery.max_upload_bytes() / (1024 * 1024);
    // image loads run unlocked so a stalled host never blocks other routes
    drop(gallery);

    let tiles = plan
        .run(state.loader.as_ref())
        .await
        .into_iter()
        .map(|tile| TileView {
            open_href: format!("/viewer/open/{}", tile.position),
            url: tile.display_url().map(str::to_string),
            failure: match &tile.state {
                TileState::Failed(failure) => Some(failure.to_string()),
                _ => None,
            },
            label: tile.label,
        })
        .collect();

    let filters = std::iter::once(ALL_SENTINEL)
        .chain(Category::ALL.iter().map(|category| category.as_str()))
        .map(|name| FilterLink {
            label: name.to_string(),
            href: format!("/?category={}", urlencoding::encode(name)),
            active: name == selected,
        })
        .collect();

    HtmlTemplate(IndexTemplate {
        filters,
        selected,
        tiles,
        viewer,
        notices,
        upload_categories: Category::ALL
            .iter()
            .map(|category| category.as_str().to_string())
            .collect(),
        upload_text,
        max_upload_mib,
    })
}

async fn open_handler(State(state): State<AppState>, Path(index): Path<usize>) -> Response {
    let mut gallery = state.gallery.lock().await;
    let outcome = gallery.open(index);
    flush_events(&mut gallery);
    match outcome {
        Ok(_) => Redirect::to("/").into_response(),
        Err(err) => (StatusCode::NOT_FOUND, err.to_string()).into_response(),
    }
}

async fn close_handler(State(state): State<AppState>) -> Redirect {
    apply_input(&state, ViewerInput::CloseButton).await
}

async fn prev_handler(State(state): State<AppState>) -> Redirect {
    apply_input(&state, ViewerInput::PrevButton).await
}

async fn next_handler(State(state): State<AppState>) -> Redirect {
    apply_input(&state, ViewerInput::NextButton).await
}

async fn key_handler(State(state): State<AppState>, Path(key): Path<String>) -> Redirect {
    apply_input(&state, ViewerInput::Key(Key::parse(&key))).await
}

async fn swipe_handler(State(state): State<AppState>, Query(params): Query<SwipeParams>) -> Redirect {
    apply_input(
        &state,
        ViewerInput::Swipe {
            dx: params.dx,
            dy: params.dy,
        },
    )
    .await
}

async fn apply_input(state: &AppState, input: ViewerInput) -> Redirect {
    let mut gallery = state.gallery.lock().await;
    if !gallery.handle_input(input) {
        debug!(?input, "input ignored");
    }
    flush_events(&mut gallery);
    Redirect::to("/")
}

async fn share_handler(State(state): State<AppState>, Path(platform): Path<String>) -> Redirect {
    let mut gallery = state.gallery.lock().await;
    let url = gallery.share(&platform);
    flush_events(&mut gallery);
    match url {
        Some(url) => Redirect::to(&url),
        None => Redirect::to("/"),
    }
}

async fn upload_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut files: Vec<Box<dyn UploadSource>> = Vec::new();
    let mut category = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        };
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "category" => match field.text().await {
                Ok(text) => category = Some(text),
                Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
            },
            "files" => {
                let name = field.file_name().unwrap_or_default().to_string();
                if name.is_empty() {
                    continue;
                }
                let mime = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&name)
                            .first_or_octet_stream()
                            .essence_str()
                            .to_string()
                    });
                match field.bytes().await {
                    Ok(bytes) => files.push(Box::new(InMemoryFile::new(name, mime, bytes.to_vec()))),
                    Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
                }
            }
            other => debug!(field = other, "ignoring upload field"),
        }
    }

    let mut gallery = state.gallery.lock().await;
    gallery.select_files(files);
    match gallery.commit_uploads(category.as_deref()).await {
        Ok(report) => info!(
            added = report.added.len(),
            failed = report.failures.len(),
            "upload committed"
        ),
        Err(err) => warn!(error = %err, "upload skipped"),
    }
    flush_events(&mut gallery);
    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use gallery_core::{
        Catalog, Category, Gallery, ImageDescriptor, ImageLoader, LoadError, LoadFuture,
    };
    use tokio::sync::{Mutex, Notify};
    use tower::ServiceExt;

    use super::{app, AppState};

    struct OfflineLoader;

    impl ImageLoader for OfflineLoader {
        fn load<'a>(&'a self, url: &'a str) -> LoadFuture<'a> {
            Box::pin(async move {
                if url.starts_with("https://example.com/a.jpg") {
                    Ok(())
                } else {
                    Err(LoadError::Status(404))
                }
            })
        }
    }

    /// Never finishes a load; signals once the first load has started.
    struct StalledLoader {
        started: Arc<Notify>,
    }

    impl ImageLoader for StalledLoader {
        fn load<'a>(&'a self, _url: &'a str) -> LoadFuture<'a> {
            Box::pin(async move {
                self.started.notify_one();
                std::future::pending::<Result<(), LoadError>>().await
            })
        }
    }

    fn state() -> AppState {
        let gallery = Gallery::with_catalog(Catalog::new(vec![
            ImageDescriptor::remote("https://example.com/a.jpg", "Alpine lake", Category::Nature),
            ImageDescriptor::remote("https://example.com/broken.jpg", "Old mill", Category::Architecture),
        ]));
        AppState {
            gallery: Arc::new(Mutex::new(gallery)),
            loader: Arc::new(OfflineLoader),
        }
    }

    async fn get(state: &AppState, uri: &str) -> (StatusCode, String, Option<String>) {
        let response = app(state.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).to_string(), location)
    }

    #[tokio::test]
    async fn index_renders_tiles_and_failure_indicator() {
        let state = state();
        let (status, body, _) = get(&state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Alpine lake"));
        assert!(body.contains("tile failed"));
    }

    #[tokio::test]
    async fn category_query_filters_view() {
        let state = state();
        let (_, body, _) = get(&state, "/?category=nature").await;
        assert!(body.contains("Alpine lake"));
        assert!(!body.contains("Old mill"));
        assert_eq!(state.gallery.lock().await.view().len(), 1);
    }

    #[tokio::test]
    async fn viewer_routes_drive_state() {
        let state = state();
        let (status, _, location) = get(&state, "/viewer/open/1").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/"));

        get(&state, "/viewer/key/ArrowRight").await;
        assert_eq!(state.gallery.lock().await.viewer().current_index(), Some(0));

        let (_, body, _) = get(&state, "/").await;
        assert!(body.contains("1 / 2"));

        get(&state, "/viewer/swipe?dx=90&dy=3").await;
        assert_eq!(state.gallery.lock().await.viewer().current_index(), Some(1));

        get(&state, "/viewer/key/Escape").await;
        assert!(!state.gallery.lock().await.viewer().is_open());
    }

    #[tokio::test]
    async fn open_out_of_range_is_not_found() {
        let state = state();
        let (status, _, _) = get(&state, "/viewer/open/9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn share_redirects_to_platform() {
        let state = state();
        get(&state, "/viewer/open/0").await;
        let (_, _, location) = get(&state, "/share/facebook").await;
        assert!(location.unwrap().starts_with("https://www.facebook.com/sharer/sharer.php?u="));
        let (_, _, location) = get(&state, "/share/myspace").await;
        assert_eq!(location.as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn multipart_upload_appends_valid_files() {
        let state = state();
        let boundary = "gallery-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"category\"\r\n\r\nanimals\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"cat.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nhello\r\n\
             --{b}--\r\n",
            b = boundary
        );
        let request = Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let gallery = state.gallery.lock().await;
        assert_eq!(gallery.catalog().len(), 3);
        let added = gallery.catalog().get(2).unwrap();
        assert_eq!(added.label, "cat");
        assert_eq!(added.category, Category::Animals);
        assert!(added.is_local);
        assert_eq!(gallery.notices().len(), 2);
    }

    #[tokio::test]
    async fn stalled_image_host_does_not_block_viewer_routes() {
        let started = Arc::new(Notify::new());
        let state = AppState {
            loader: Arc::new(StalledLoader {
                started: started.clone(),
            }),
            ..state()
        };
        get(&state, "/viewer/open/0").await;

        let page = tokio::spawn(app(state.clone()).oneshot(Request::get("/").body(Body::empty()).unwrap()));
        started.notified().await;

        let closed = tokio::time::timeout(Duration::from_secs(2), get(&state, "/viewer/close")).await;
        assert!(closed.is_ok());
        assert!(!state.gallery.lock().await.viewer().is_open());
        page.abort();
    }

    #[tokio::test]
    async fn lightbox_script_only_navigates_on_real_swipes() {
        let state = state();
        get(&state, "/viewer/open/0").await;
        let (_, body, _) = get(&state, "/").await;
        assert!(body.contains("Math.abs(dx) > 50 && Math.abs(dx) > Math.abs(dy)"));

        let (status, _, _) = get(&state, "/viewer/swipe?dx=NaN&dy=0").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(state.gallery.lock().await.viewer().current_index(), Some(0));
    }
}
