//! Heuristic text cleaning for emitted pairs.
//!
//! Steps, in order:
//! 1. drop characters in the emoji / pictograph blocks listed in `EMOJI`
//! 2. drop URLs, including a markdown link wrapped around one (`[text](http://..)`)
//! 3. decode HTML entities twice, so `&amp;amp;` ends up as `&`
//!
//! The rules are literal: a bracketed phrase followed by a parenthesised
//! URL is always treated as a link, and a bare `www.` run is always treated as a URL.

use regex::Regex;
use std::sync::OnceLock;

const EMOJI: &str = concat!(
    "[",
    "\u{1F600}-\u{1F64F}", // emoticons
    "\u{1F300}-\u{1F5FF}", // symbols & pictographs
    "\u{1F680}-\u{1F6FF}", // transport & map
    "\u{1F1E0}-\u{1F1FF}", // flags
    "\u{1F900}-\u{1F9FF}", // supplemental symbols
    "\u{1FA70}-\u{1FAFF}", // symbols & pictographs ext-A
    "\u{2600}-\u{26FF}",   // misc symbols
    "\u{2700}-\u{27BF}",   // dingbats
    "\u{FE0F}\u{200D}",    // variation selector, zero-width joiner
    "]+"
);

const URL: &str = r"\[[^\]\n]*\]\(\s*(?:https?://|www\.)[^)\s]*\s*\)|(?:https?://|www\.)[^\s<>()\[\]]+";

fn emoji_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMOJI).unwrap())
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(URL).unwrap())
}

/// Apply the cleaning steps. Never fails; may return an empty string.
pub fn clean_text(text: &str) -> String {
    let no_emoji = emoji_re().replace_all(text, "");
    let no_urls = url_re().replace_all(&no_emoji, "");
    let once = html_escape::decode_html_entities(&no_urls);
    let twice = html_escape::decode_html_entities(&once).into_owned();
    twice
}
