use std::{str::FromStr, sync::OnceLock};

use quick_xml::events::BytesStart;
use regex::Regex;

use crate::{
    types::{ChannelId, VideoId},
    util,
};

const LINK: &str = "link";

const WATCH_URL_PATTERN: &str = r"^https://www\.youtube\.com/watch\?v=(.+)$";

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("Failed to get video id via scraping YouTube page")]
    FetchError(#[from] util::DownloadError),
    #[error("Given channel doesn't have streaming or upcoming live")]
    NoCanonicalLink,
    #[error("<link> element doesn't have href, YouTube DOM may have changed")]
    MissingHref,
    #[error("Channel has no live or upcoming stream, or the href format changed: {0}")]
    UnexpectedHref(String),
}

/// Page that redirects to the channel's current or upcoming live stream.
pub fn live_page_url(channel: &ChannelId) -> String {
    if channel.is_handle() {
        format!("https://www.youtube.com/{}/live", channel)
    } else {
        format!("https://www.youtube.com/channel/{}/live", channel)
    }
}

fn get_attr<T>(e: &BytesStart, attr: &str) -> Option<T>
where
    T: FromStr,
{
    // HTML mode accepts unquoted and valueless attributes
    e.html_attributes()
        .flatten()
        .find(|a| a.key.as_ref().eq_ignore_ascii_case(attr.as_bytes()))
        .and_then(|a| std::str::from_utf8(&a.value).ok()?.parse().ok())
}

/// Byte offset of the `>` closing the tag that starts `html`, ignoring any
/// `>` inside quoted attribute values.
fn tag_end(html: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in html.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

// HTML is not XML, so only the individual <link> tags are handed to quick-xml.
// `content` is everything between `<` and `>`.
fn parse_link_tag(content: &str) -> Option<BytesStart<'_>> {
    let ends_value =
        |c: &str| c.ends_with(|ch: char| ch.is_ascii_whitespace() || ch == '"' || ch == '\'');
    // A trailing `/` belongs to an unquoted value unless something ended it
    let content = match content.strip_suffix('/') {
        Some(c) if c == LINK || ends_value(c) => c,
        _ => content,
    };

    let rest = content.get(LINK.len()..)?;
    if !content[..LINK.len()].eq_ignore_ascii_case(LINK)
        || rest.starts_with(|ch: char| !ch.is_ascii_whitespace())
    {
        return None;
    }
    Some(BytesStart::from_content(content, LINK.len()))
}

fn find_canonical_link(html: &str) -> Option<BytesStart<'_>> {
    // Lowercasing ASCII keeps byte offsets intact
    let lower = html.to_ascii_lowercase();
    lower.match_indices("<link").find_map(|(idx, _)| {
        let start = idx + 1;
        let end = start + tag_end(&html[start..])?;
        let link = parse_link_tag(&html[start..end])?;
        let rel: String = get_attr(&link, "rel")?;
        (rel == "canonical").then_some(link)
    })
}

fn watch_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(WATCH_URL_PATTERN).expect("watch url pattern is valid"))
}

/// Extracts the live video id from the `<link rel="canonical">` element of a
/// channel's live page.
pub fn video_id_from_live_page(html: &str) -> Result<VideoId, ResolveError> {
    let link = find_canonical_link(html).ok_or(ResolveError::NoCanonicalLink)?;
    let href: String = get_attr(&link, "href").ok_or(ResolveError::MissingHref)?;

    let id = watch_url_regex()
        .captures(&href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ResolveError::UnexpectedHref(href.clone()))?;

    VideoId::new(id).map_err(|_| ResolveError::UnexpectedHref(href.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_html(fname: &str) -> String {
        let mut d = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        d.push("resources/test/");
        d.push(fname);
        std::fs::read_to_string(d).expect(format!("Could not read {}", fname).as_str())
    }

    #[test]
    fn live_page_urls() {
        assert_eq!(
            live_page_url(&ChannelId::new("@channel").unwrap()),
            "https://www.youtube.com/@channel/live"
        );
        assert_eq!(
            live_page_url(&ChannelId::new("UCabcdefghijklmnopqrstuv").unwrap()),
            "https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv/live"
        );
    }

    #[test]
    fn canonical_link() {
        let html = r#"<html><head>
<link rel="stylesheet" href="https://www.youtube.com/s/desktop/www-main.css">
<link rel="canonical" href="https://www.youtube.com/watch?v=VVVVVVVVVVV">
</head></html>"#;
        let id = video_id_from_live_page(html).expect("Could not find video id");
        assert_eq!(id.as_str(), "VVVVVVVVVVV");

        let html = r#"<link rel="canonical" href="https://www.youtube.com/watch?v=VVVVVVVVVVV"/>"#;
        let id = video_id_from_live_page(html).expect("Could not find video id");
        assert_eq!(id.as_str(), "VVVVVVVVVVV");
    }

    #[test]
    fn canonical_link_html_attributes() {
        let html = r#"<link itemprop rel="canonical" href="https://www.youtube.com/watch?v=VVVVVVVVVVV">"#;
        let id = video_id_from_live_page(html).expect("Could not find video id");
        assert_eq!(id.as_str(), "VVVVVVVVVVV");

        let html = r#"<head><link rel=canonical href=https://www.youtube.com/watch?v=VVVVVVVVVVV></head>"#;
        let id = video_id_from_live_page(html).expect("Could not find video id");
        assert_eq!(id.as_str(), "VVVVVVVVVVV");

        let html = r#"<LINK REL="canonical" HREF="https://www.youtube.com/watch?v=VVVVVVVVVVV">"#;
        let id = video_id_from_live_page(html).expect("Could not find video id");
        assert_eq!(id.as_str(), "VVVVVVVVVVV");
    }

    #[test]
    fn canonical_link_quoted_gt() {
        let html = r#"<link title="a > b" rel="canonical" href="https://www.youtube.com/watch?v=VVVVVVVVVVV">"#;
        let id = video_id_from_live_page(html).expect("Could not find video id");
        assert_eq!(id.as_str(), "VVVVVVVVVVV");
    }

    #[test]
    fn not_a_link_tag() {
        let html = r#"<linkish rel="canonical" href="https://www.youtube.com/watch?v=VVVVVVVVVVV">"#;
        assert!(matches!(
            video_id_from_live_page(html),
            Err(ResolveError::NoCanonicalLink)
        ));
    }

    #[test]
    fn live_page() {
        let html = get_test_html("live_page.html");
        let id = video_id_from_live_page(&html).expect("Could not find video id");
        assert_eq!(id.as_str(), "jfKfPfyJRdk");
    }

    #[test]
    fn no_canonical_link() {
        let html = r#"<html><head><link rel="stylesheet" href="a.css"></head></html>"#;
        assert!(matches!(
            video_id_from_live_page(html),
            Err(ResolveError::NoCanonicalLink)
        ));
        assert!(matches!(
            video_id_from_live_page(""),
            Err(ResolveError::NoCanonicalLink)
        ));
        assert!(matches!(
            video_id_from_live_page("<link rel=\"canonical\""),
            Err(ResolveError::NoCanonicalLink)
        ));
    }

    #[test]
    fn missing_href() {
        let html = r#"<html><head><link rel="canonical"></head></html>"#;
        assert!(matches!(
            video_id_from_live_page(html),
            Err(ResolveError::MissingHref)
        ));

        let html = r#"<html><head><link itemprop rel=canonical></head></html>"#;
        assert!(matches!(
            video_id_from_live_page(html),
            Err(ResolveError::MissingHref)
        ));

        // Valueless href
        let html = r#"<link rel="canonical" href>"#;
        assert!(matches!(
            video_id_from_live_page(html),
            Err(ResolveError::UnexpectedHref(h)) if h.is_empty()
        ));
    }

    #[test]
    fn unexpected_href() {
        // Channels without a live stream canonicalise to the channel page
        let html =
            r#"<link rel="canonical" href="https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv">"#;
        assert!(matches!(
            video_id_from_live_page(html),
            Err(ResolveError::UnexpectedHref(_))
        ));

        let html = r#"<link rel="canonical" href="https://youtu.be/VVVVVVVVVVV">"#;
        assert!(matches!(
            video_id_from_live_page(html),
            Err(ResolveError::UnexpectedHref(_))
        ));
    }
}
