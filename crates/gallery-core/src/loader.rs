use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::header::CONTENT_TYPE;

use crate::locator::{decode_data_url, is_data_url};

pub type LoadFuture<'a> = BoxFuture<'a, Result<(), LoadError>>;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// One load attempt for one display URL. Implementations resolve exactly once
/// per call and never retry on their own.
pub trait ImageLoader: Send + Sync {
    fn load<'a>(&'a self, url: &'a str) -> LoadFuture<'a>;
}

#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Unreachable(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("not an image: {0}")]
    NotAnImage(String),
    #[error("malformed locator: {0}")]
    Malformed(String),
}

/// Loads remote images over HTTP and checks embedded `data:` images by
/// decoding them. Successful URLs are remembered; failures are not, so a
/// host that comes back is retried on the next render.
pub struct HttpImageLoader {
    client: reqwest::Client,
    loaded: Mutex<HashSet<String>>,
}

impl HttpImageLoader {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            loaded: Mutex::new(HashSet::new()),
        }
    }

    fn is_loaded(&self, url: &str) -> bool {
        self.loaded
            .lock()
            .map(|loaded| loaded.contains(url))
            .unwrap_or(false)
    }

    fn remember(&self, url: &str) {
        if let Ok(mut loaded) = self.loaded.lock() {
            loaded.insert(url.to_string());
        }
    }

    async fn fetch(&self, url: &str) -> Result<(), LoadError> {
        if is_data_url(url) {
            return check_embedded(url);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| classify_request_error(url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }
        match response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            Some(mime) if !mime.starts_with("image/") => Err(LoadError::NotAnImage(mime.to_string())),
            _ => Ok(()),
        }
    }
}

impl Default for HttpImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader for HttpImageLoader {
    fn load<'a>(&'a self, url: &'a str) -> LoadFuture<'a> {
        async move {
            if self.is_loaded(url) {
                return Ok(());
            }
            let outcome = self.fetch(url).await;
            if outcome.is_ok() {
                self.remember(url);
            }
            outcome
        }
        .boxed()
    }
}

pub fn check_embedded(locator: &str) -> Result<(), LoadError> {
    let Some((_, bytes)) = decode_data_url(locator) else {
        return Err(LoadError::Malformed("not a base64 data url".to_string()));
    };
    image::load_from_memory(&bytes)
        .map(|_| ())
        .map_err(|err| LoadError::NotAnImage(err.to_string()))
}

fn classify_request_error(url: &str, err: reqwest::Error) -> LoadError {
    if err.is_builder() {
        LoadError::Malformed(url.to_string())
    } else {
        LoadError::Unreachable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use super::{check_embedded, HttpImageLoader, ImageLoader, LoadError};
    use crate::locator::encode_data_url;

    const UNAVAILABLE: &str =
        "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
    const NOT_FOUND: &str =
        "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
    const HTML: &str = "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 2\r\nconnection: close\r\n\r\nhi";
    const JPEG: &str = "HTTP/1.1 200 OK\r\ncontent-type: image/jpeg\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok";

    /// Answers one connection per canned response, in order, and counts the
    /// requests it served.
    fn serve(responses: Vec<&'static str>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let served = Arc::new(AtomicUsize::new(0));
        let counter = served.clone();
        thread::spawn(move || {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        (format!("http://{addr}/photo.jpg"), served)
    }

    fn local_loader() -> HttpImageLoader {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpImageLoader::with_client(client)
    }

    fn tiny_png() -> Vec<u8> {
        let image = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 10, 10]));
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn embedded_png_passes() {
        let url = encode_data_url("image/png", &tiny_png());
        assert_eq!(check_embedded(&url), Ok(()));
    }

    #[test]
    fn embedded_garbage_fails() {
        let url = encode_data_url("image/png", b"not really a png");
        assert!(matches!(check_embedded(&url), Err(LoadError::NotAnImage(_))));
        assert!(matches!(
            check_embedded("data:image/png,raw"),
            Err(LoadError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn loader_handles_data_urls_without_network() {
        let loader = HttpImageLoader::new();
        let url = encode_data_url("image/png", &tiny_png());
        assert_eq!(loader.load(&url).await, Ok(()));
        // second call is served from the cache
        assert_eq!(loader.load(&url).await, Ok(()));
    }

    #[tokio::test]
    async fn remote_status_and_content_type_are_checked() {
        let (url, _) = serve(vec![NOT_FOUND, HTML, JPEG]);
        let loader = local_loader();
        assert_eq!(loader.load(&url).await, Err(LoadError::Status(404)));
        assert_eq!(
            loader.load(&url).await,
            Err(LoadError::NotAnImage("text/html".to_string()))
        );
        assert_eq!(loader.load(&url).await, Ok(()));
    }

    #[tokio::test]
    async fn failures_are_retried_and_successes_cached() {
        let (url, served) = serve(vec![UNAVAILABLE, JPEG]);
        let loader = local_loader();
        assert_eq!(loader.load(&url).await, Err(LoadError::Status(503)));
        assert_eq!(loader.load(&url).await, Ok(()));
        assert_eq!(loader.load(&url).await, Ok(()));
        assert_eq!(served.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreachable_host_recovers_on_the_same_loader() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = format!("http://{addr}/photo.jpg");
        let loader = local_loader();
        assert!(matches!(
            loader.load(&url).await,
            Err(LoadError::Unreachable(_))
        ));

        let listener = TcpListener::bind(addr).unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(JPEG.as_bytes());
            }
        });
        assert_eq!(loader.load(&url).await, Ok(()));
    }
}
