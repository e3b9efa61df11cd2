//! Normalization of background URLs.
//!
//! Links copied out of image search results usually point at a results page
//! with the real image tucked into an `imgurl=` query parameter. Those are
//! unwrapped so the fetch hits the image itself.

#[cfg(test)]
#[path = "image_url_test.rs"]
mod image_url_test;

use reqwest::Url;

/// The URL of the image itself: the embedded `imgurl` target when present and
/// valid, otherwise `url` unchanged.
#[must_use]
pub fn image_url(url: &Url) -> Url {
    for (key, value) in url.query_pairs() {
        if key == "imgurl" {
            if let Ok(embedded) = Url::parse(&value) {
                return embedded;
            }
        }
    }
    url.clone()
}
