use std::fmt;

use url::Url;

use crate::catalog::ImageDescriptor;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SharePlatform {
    Facebook,
    Twitter,
    Pinterest,
}

impl SharePlatform {
    pub const ALL: [SharePlatform; 3] = [
        SharePlatform::Facebook,
        SharePlatform::Twitter,
        SharePlatform::Pinterest,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "facebook" => Some(SharePlatform::Facebook),
            "twitter" | "x" => Some(SharePlatform::Twitter),
            "pinterest" => Some(SharePlatform::Pinterest),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SharePlatform::Facebook => "facebook",
            SharePlatform::Twitter => "twitter",
            SharePlatform::Pinterest => "pinterest",
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            SharePlatform::Facebook => "https://www.facebook.com/sharer/sharer.php",
            SharePlatform::Twitter => "https://twitter.com/intent/tweet",
            SharePlatform::Pinterest => "https://pinterest.com/pin/create/button/",
        }
    }
}

impl fmt::Display for SharePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Builds the share intent URL for an image shown on `page_url`. Embedded
/// uploads are never sent as media.
pub fn share_url(platform: SharePlatform, item: &ImageDescriptor, page_url: &str) -> Option<String> {
    let params: Vec<(&str, &str)> = match platform {
        SharePlatform::Facebook => vec![("u", page_url)],
        SharePlatform::Twitter => vec![("text", item.label.as_str()), ("url", page_url)],
        SharePlatform::Pinterest => {
            let mut params = vec![("url", page_url)];
            if !item.is_local {
                params.push(("media", item.locator.as_str()));
            }
            params.push(("description", item.label.as_str()));
            params
        }
    };
    Url::parse_with_params(platform.endpoint(), params)
        .ok()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::{share_url, SharePlatform};
    use crate::catalog::ImageDescriptor;
    use crate::category::Category;

    #[test]
    fn unknown_platform_does_not_parse() {
        assert_eq!(SharePlatform::parse("myspace"), None);
        assert_eq!(SharePlatform::parse("Twitter"), Some(SharePlatform::Twitter));
    }

    #[test]
    fn twitter_url_encodes_label_and_page() {
        let item = ImageDescriptor::remote("https://example.com/a.jpg", "Sea & sky", Category::Nature);
        let url = share_url(SharePlatform::Twitter, &item, "https://gallery.test/?a=1").unwrap();
        assert_eq!(
            url,
            "https://twitter.com/intent/tweet?text=Sea+%26+sky&url=https%3A%2F%2Fgallery.test%2F%3Fa%3D1"
        );
    }

    #[test]
    fn pinterest_skips_media_for_uploads() {
        let remote = ImageDescriptor::remote("https://example.com/a.jpg", "A", Category::Misc);
        let local = ImageDescriptor::local("data:image/png;base64,AA", "B", Category::Misc);
        let with_media = share_url(SharePlatform::Pinterest, &remote, "https://g.test/").unwrap();
        let without_media = share_url(SharePlatform::Pinterest, &local, "https://g.test/").unwrap();
        assert!(with_media.contains("media=https%3A%2F%2Fexample.com%2Fa.jpg"));
        assert!(!without_media.contains("media="));
    }

    #[test]
    fn facebook_only_sends_page() {
        let item = ImageDescriptor::remote("https://example.com/a.jpg", "A", Category::Misc);
        let url = share_url(SharePlatform::Facebook, &item, "https://g.test/").unwrap();
        assert_eq!(
            url,
            "https://www.facebook.com/sharer/sharer.php?u=https%3A%2F%2Fg.test%2F"
        );
    }
}
