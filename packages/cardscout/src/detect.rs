//! Pattern detector: finds repeated card-level containers in static
//! markup, scores selector candidates, and flags structural hazards.
//!
//! Detection is a pure function of page content and configuration — the
//! same page always yields the same result, and a page with no repeated
//! structure yields an empty candidate list rather than an error.

use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::types::config::DetectorConfig;
use crate::types::page::RawPage;
use crate::types::report::{CookieBannerDetails, Hazard};
use crate::types::selector::SelectorCandidate;

/// Consent-text markers checked inside overlay-like elements.
const CONSENT_MARKERS: &[&str] = &[
    "we use cookies",
    "cookie",
    "cookies",
    "consent",
    "gdpr",
    "samtykke",
    "informasjonskapsler",
    "personvern",
    "godta",
    "aksepter",
];

/// Accept-button labels, Norwegian and English.
const ACCEPT_WORDS: &[&str] = &["godta", "aksepter", "accept", "ok", "tillat", "allow"];

/// Attribute markers suggesting a full-viewport overlay or consent container.
const OVERLAY_MARKERS: &[&str] = &[
    "cookie", "consent", "gdpr", "overlay", "modal", "dialog", "banner", "fixed",
];

/// Script markers for client-side rendering frameworks.
const FRAMEWORK_MARKERS: &[&str] = &[
    "react", "vue", "angular", "svelte", "__next_data__", "nuxt", "ember", "webpack",
];

/// Result of probing one page.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Best candidate, or the trusted hint when one was supplied.
    /// `None` means no repeated structure was found and the caller needs
    /// a manual selector.
    pub primary_selector: Option<SelectorCandidate>,

    /// All scored candidates, best first (diagnostics)
    pub all_candidates: Vec<SelectorCandidate>,

    pub hazards: BTreeSet<Hazard>,

    /// Banner details when a cookie hazard was flagged
    pub cookie_banner: Option<CookieBannerDetails>,

    /// Page `<title>`, when present
    pub title: Option<String>,
}

/// Probe a page for repeated card structures and hazards.
///
/// A supplied `hint_selector` is trusted: it becomes the primary selector
/// regardless of how it scores, but the full candidate scan still runs so
/// callers can compare.
pub fn detect(page: &RawPage, hint_selector: Option<&str>, config: &DetectorConfig) -> Detection {
    let document = Html::parse_document(&page.html);

    let mut candidates = enumerate_candidates(&document, config);
    sort_candidates(&mut candidates);
    candidates.truncate(config.max_candidates);

    let primary = match hint_selector {
        Some(hint) => Some(score_selector(&document, hint)),
        None => candidates.first().cloned(),
    };

    let mut hazards = BTreeSet::new();

    if page.content_length() > config.oversized_page_bytes {
        hazards.insert(Hazard::OversizedPage);
    }

    let cookie_banner = detect_cookie_banner(&document);
    if cookie_banner.is_some() {
        hazards.insert(Hazard::CookieBanner);
    }

    if frameworks_present(&document)
        && (candidates.is_empty() || text_density(&document, &page.html) < config.min_text_density)
    {
        hazards.insert(Hazard::JsRendered);
    }

    debug!(
        url = %page.url,
        candidates = candidates.len(),
        hazards = hazards.len(),
        "pattern detection finished"
    );

    Detection {
        primary_selector: primary,
        all_candidates: candidates,
        hazards,
        cookie_banner,
        title: page_title(&document),
    }
}

/// Extract the page title from parsed markup.
pub fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

/// Score an explicit selector against a page without running the full scan.
pub fn score_selector(document: &Html, css_path: &str) -> SelectorCandidate {
    let Ok(selector) = Selector::parse(css_path) else {
        // Unparseable hints still get surfaced, just with zero signal
        return SelectorCandidate::new(css_path, 0, 0.0);
    };

    let matches: Vec<ElementRef> = document.select(&selector).collect();
    let consistency = consistency_score(&matches);
    let depth = matches
        .iter()
        .map(|el| el.ancestors().count())
        .min()
        .unwrap_or(0);

    SelectorCandidate::new(css_path, matches.len(), consistency).with_depth(depth)
}

/// Scan for repeated sibling structures: element children sharing a
/// parent, a tag, and the majority of their class tokens, occurring at
/// least `min_repeat_count` times.
fn enumerate_candidates(document: &Html, config: &DetectorConfig) -> Vec<SelectorCandidate> {
    let all = match Selector::parse("*") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut seen: HashMap<String, SelectorCandidate> = HashMap::new();

    for parent in document.select(&all) {
        // Group this parent's element children by tag
        let mut by_tag: HashMap<&str, Vec<ElementRef>> = HashMap::new();
        for child in parent.children().filter_map(ElementRef::wrap) {
            by_tag.entry(child.value().name()).or_default().push(child);
        }

        for (tag, group) in by_tag {
            if group.len() < config.min_repeat_count || tag == "script" || tag == "style" {
                continue;
            }

            let tokens = majority_class_tokens(&group);
            let css_path = if tokens.is_empty() {
                // Bare repeated tags only count inside list-like parents;
                // a page full of anonymous divs is not a card grid.
                if tag == "li" || tag == "tr" {
                    tag.to_string()
                } else {
                    continue;
                }
            } else {
                format!("{}.{}", tag, tokens.join("."))
            };

            if seen.contains_key(&css_path) {
                continue;
            }

            let candidate = score_selector(document, &css_path);
            if candidate.match_count >= config.min_repeat_count {
                seen.insert(css_path, candidate);
            }
        }
    }

    seen.into_values().collect()
}

/// Class tokens appearing on more than half of the group, most common
/// first, capped at three to keep selectors short and reusable.
fn majority_class_tokens(group: &[ElementRef]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for el in group {
        for class in el.value().classes() {
            if is_css_identifier(class) {
                *counts.entry(class).or_default() += 1;
            }
        }
    }

    let threshold = group.len() / 2 + 1;
    let mut tokens: Vec<(&str, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count >= threshold)
        .collect();
    tokens.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    tokens
        .into_iter()
        .take(3)
        .map(|(token, _)| token.to_string())
        .collect()
}

/// Fraction of matched elements whose immediate child structure (tag
/// sequence plus attribute-name shape) agrees with the modal structure.
fn consistency_score(matches: &[ElementRef]) -> f64 {
    if matches.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for el in matches {
        *counts.entry(child_signature(el)).or_default() += 1;
    }

    let modal = counts.values().copied().max().unwrap_or(0);
    modal as f64 / matches.len() as f64
}

/// Signature of an element's immediate children: tag names in order, each
/// with its sorted attribute names.
fn child_signature(el: &ElementRef) -> String {
    let mut parts = Vec::new();
    for child in el.children().filter_map(ElementRef::wrap) {
        let mut attrs: Vec<&str> = child.value().attrs().map(|(name, _)| name).collect();
        attrs.sort_unstable();
        parts.push(format!("{}[{}]", child.value().name(), attrs.join(",")));
    }
    parts.join(">")
}

fn sort_candidates(candidates: &mut [SelectorCandidate]) {
    candidates.sort_by(|a, b| {
        b.consistency_score
            .partial_cmp(&a.consistency_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.match_count.cmp(&a.match_count))
            .then_with(|| a.depth.cmp(&b.depth))
            .then_with(|| a.css_path.cmp(&b.css_path))
    });
}

/// Find a full-viewport consent overlay: an element whose attributes look
/// overlay-like and whose text carries a consent marker.
fn detect_cookie_banner(document: &Html) -> Option<CookieBannerDetails> {
    let all = Selector::parse("div,section,aside,dialog").ok()?;

    for el in document.select(&all) {
        let attr_blob = attr_blob(&el);
        if !OVERLAY_MARKERS.iter().any(|m| attr_blob.contains(m)) {
            continue;
        }

        let text = collapse_whitespace(&el.text().collect::<String>()).to_lowercase();
        let Some(marker) = CONSENT_MARKERS.iter().find(|m| text.contains(*m)) else {
            continue;
        };

        let start = text.find(marker).unwrap_or(0);
        let matched_text: String = text[start..].chars().take(120).collect();

        return Some(CookieBannerDetails {
            container_path: element_path(&el),
            matched_text,
            accept_paths: find_accept_buttons(&el),
        });
    }

    None
}

fn find_accept_buttons(banner: &ElementRef) -> Vec<String> {
    let Ok(clickable) = Selector::parse("button,a,[role=\"button\"]") else {
        return Vec::new();
    };

    banner
        .select(&clickable)
        .filter(|el| {
            let text = collapse_whitespace(&el.text().collect::<String>()).to_lowercase();
            ACCEPT_WORDS.iter().any(|w| text.split_whitespace().any(|t| t == *w))
        })
        .map(|el| element_path(&el))
        .collect()
}

fn frameworks_present(document: &Html) -> bool {
    let Ok(scripts) = Selector::parse("script") else {
        return false;
    };

    document.select(&scripts).any(|el| {
        let src = el.value().attr("src").unwrap_or_default().to_lowercase();
        let body = el.text().collect::<String>().to_lowercase();
        FRAMEWORK_MARKERS
            .iter()
            .any(|m| src.contains(m) || body.contains(m))
    })
}

/// Visible body text bytes relative to raw markup bytes.
fn text_density(document: &Html, html: &str) -> f64 {
    if html.is_empty() {
        return 0.0;
    }

    let Ok(body) = Selector::parse("body") else {
        return 0.0;
    };

    let text_len: usize = document
        .select(&body)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()).len())
        .unwrap_or(0);

    text_len as f64 / html.len() as f64
}

/// Structural locator: tag chain with nth-of-type positions, rooted at
/// `html`.
pub fn element_path(el: &ElementRef) -> String {
    let mut parts = vec![positioned_tag(el)];
    let mut node = el.parent();
    while let Some(parent) = node {
        if let Some(parent_el) = ElementRef::wrap(parent) {
            parts.push(positioned_tag(&parent_el));
            node = parent_el.parent();
        } else {
            break;
        }
    }
    parts.reverse();
    parts.join(" > ")
}

fn positioned_tag(el: &ElementRef) -> String {
    let tag = el.value().name();
    let position = el
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sib| sib.value().name() == tag)
        .count()
        + 1;
    format!("{tag}:nth-of-type({position})")
}

fn attr_blob(el: &ElementRef) -> String {
    let mut blob = String::new();
    for (name, value) in el.value().attrs() {
        if matches!(name, "class" | "id" | "role" | "style") {
            blob.push_str(&value.to_lowercase());
            blob.push(' ');
        }
    }
    blob
}

fn is_css_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '-' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
