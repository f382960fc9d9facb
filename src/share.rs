use std::borrow::Cow;

use strum::{Display, EnumString};

pub const WINDOW_TARGET: &str = "_blank";
pub const WINDOW_FEATURES: &str = "width=600,height=400";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Platform {
    #[strum(to_string = "twitter", serialize = "x")]
    Twitter,
    #[strum(serialize = "facebook")]
    Facebook,
    #[strum(serialize = "linkedin")]
    LinkedIn,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Twitter, Platform::Facebook, Platform::LinkedIn];

    pub fn label(self) -> &'static str {
        match self {
            Platform::Twitter => "Twitter",
            Platform::Facebook => "Facebook",
            Platform::LinkedIn => "LinkedIn",
        }
    }
}

/// Outbound share link for the current page.
pub fn share_url(platform: Platform, page_url: &str, title: &str) -> String {
    let url = encode_component(page_url);
    match platform {
        Platform::Twitter => format!(
            "https://twitter.com/intent/tweet?url={url}&text={}",
            encode_component(title)
        ),
        Platform::Facebook => format!("https://www.facebook.com/sharer/sharer.php?u={url}"),
        Platform::LinkedIn => format!("https://www.linkedin.com/sharing/share-offsite/?url={url}"),
    }
}

/// Percent-encodes like `encodeURIComponent`, which leaves `!*'()` alone.
pub fn encode_component(raw: &str) -> String {
    let encoded: Cow<'_, str> = urlencoding::encode(raw);
    if !encoded.contains('%') {
        return encoded.into_owned();
    }
    encoded
        .replace("%21", "!")
        .replace("%2A", "*")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn platform_names_parse() {
        assert_eq!(Platform::from_str("twitter").ok(), Some(Platform::Twitter));
        assert_eq!(Platform::from_str("X").ok(), Some(Platform::Twitter));
        assert_eq!(Platform::from_str("LinkedIn").ok(), Some(Platform::LinkedIn));
        assert!(Platform::from_str("myspace").is_err());
        assert_eq!(Platform::Twitter.to_string(), "twitter");
    }

    #[test]
    fn share_urls_are_encoded() {
        let url = "https://example.com/blog/?a=1&b=2";
        assert_eq!(
            share_url(Platform::Twitter, url, "My Blog (draft)!"),
            "https://twitter.com/intent/tweet?url=https%3A%2F%2Fexample.com%2Fblog%2F%3Fa%3D1%26b%3D2&text=My%20Blog%20(draft)!"
        );
        assert_eq!(
            share_url(Platform::Facebook, "https://example.com/", "ignored"),
            "https://www.facebook.com/sharer/sharer.php?u=https%3A%2F%2Fexample.com%2F"
        );
        assert_eq!(
            share_url(Platform::LinkedIn, "https://example.com/", "ignored"),
            "https://www.linkedin.com/sharing/share-offsite/?url=https%3A%2F%2Fexample.com%2F"
        );
    }

    #[test]
    fn encode_component_keeps_unreserved_marks() {
        assert_eq!(encode_component("it's (ok)*!"), "it's%20(ok)*!");
        assert_eq!(encode_component("plain-text_~."), "plain-text_~.");
    }
}
