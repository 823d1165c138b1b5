//! Resolve a match's video URL to something a player can embed.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

const YOUTUBE_ID_LEN: usize = 11;

static YOUTUBE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*((youtu.be/)|(v/)|(/u/\w/)|(embed/)|(watch\?))\??v?=?([^#&?]*).*")
        .expect("static regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Embed {
    /// A YouTube video, played through the privacy-light embed player.
    #[serde(rename_all = "camelCase")]
    YouTube { id: String, embed_url: String },
    /// Any other stream URL, played as-is.
    Direct { url: String },
    /// Looked like YouTube but carried no usable video id.
    Invalid,
}

pub fn is_youtube(url: &str) -> bool {
    url.contains("youtube.com") || url.contains("youtu.be")
}

/// Extract the 11-character YouTube video id from `url`.
pub fn youtube_id(url: &str) -> Option<&str> {
    let id = YOUTUBE_ID_RE.captures(url)?.get(7)?.as_str();
    (id.len() == YOUTUBE_ID_LEN).then_some(id)
}

pub fn youtube_embed_url(id: &str) -> String {
    format!("https://www.youtube.com/embed/{id}?autoplay=1&rel=0")
}

pub fn resolve(url: &str) -> Embed {
    if !is_youtube(url) {
        return Embed::Direct {
            url: url.to_owned(),
        };
    }
    youtube_id(url).map_or(Embed::Invalid, |id| Embed::YouTube {
        id: id.to_owned(),
        embed_url: youtube_embed_url(id),
    })
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn extracts_from_common_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ#t=10",
        ] {
            assert_eq!(youtube_id(url), Some(ID), "{url}");
        }
    }

    #[test]
    fn wrong_length_id_is_rejected() {
        assert_eq!(youtube_id("https://youtu.be/short"), None);
        assert_eq!(
            resolve("https://www.youtube.com/watch?v=tooshort"),
            Embed::Invalid
        );
    }

    #[test]
    fn youtube_resolves_to_embed_player() {
        let Embed::YouTube { id, embed_url } = resolve("https://youtu.be/dQw4w9WgXcQ") else {
            panic!("expected YouTube embed");
        };
        assert_eq!(id, ID);
        assert_eq!(
            embed_url,
            "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1&rel=0"
        );
    }

    #[test]
    fn other_urls_are_direct() {
        let url = "https://cdn.example.com/live/stream.m3u8";
        assert_eq!(
            resolve(url),
            Embed::Direct {
                url: url.to_owned()
            }
        );
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(resolve("https://youtu.be/dQw4w9WgXcQ")).unwrap();
        assert_eq!(json["kind"], "youtube");
        assert_eq!(json["id"], ID);
        assert!(json["embedUrl"].as_str().unwrap().contains(ID));
    }
}
