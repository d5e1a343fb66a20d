//! Turns message text into styled segments
//!
//! Paragraphs are separated by blank lines, `**bold**` spans are picked out,
//! and bold spans naming a known scripture are flagged so front ends can give
//! them their own styling.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::state::{Message, TRUNCATION_LIMIT};

/// Scripture names recognised inside bold spans (matched case-insensitively)
pub const SACRED_TEXTS_KEYWORDS: &[&str] = &[
    // Epics & Puranas
    "Bhagavad Gita", "Mahabharata", "Ramayana", "Bhagavatam", "Srimad Bhagavatam",
    "Vishnu Purana", "Shiva Purana", "Markandeya Purana", "Devi Mahatmyam", "Garuda Purana", "Agni Purana",
    // Vedas & Upanishads
    "Rigveda", "Samaveda", "Yajurveda", "Atharvaveda",
    "Upanishads", "Isa Upanishad", "Kena Upanishad", "Katha Upanishad", "Prashna Upanishad",
    "Mundaka Upanishad", "Mandukya Upanishad", "Taittiriya Upanishad", "Aitareya Upanishad",
    "Chandogya Upanishad", "Brihadaranyaka Upanishad",
    // Sutras & philosophical texts
    "Yoga Sutras of Patanjali", "Yoga Sutras", "Brahma Sutras", "Nyaya Sutras", "Vaisheshika Sutras",
    "Mimamsa Sutras", "Samkhya Karika", "Yoga Vasistha", "Narada Bhakti Sutra", "Tirukkural",
    // Dharmashastras & Ayurveda
    "Manusmriti", "Arthashastra", "Charaka Samhita", "Sushruta Samhita", "Ashtanga Hrudayam",
    // Historical context
    "Chronology of India", "History of Indian Philosophy",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Bold(&'a str),
    /// A bold span naming a sacred text
    Sacred(&'a str),
}

fn bold_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"))
}

fn paragraph_break() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n+").expect("paragraph pattern is valid"))
}

/// Split content into paragraphs, dropping blank ones
pub fn paragraphs(content: &str) -> Vec<&str> {
    paragraph_break()
        .split(content)
        .filter(|p| !p.trim().is_empty())
        .collect()
}

pub fn is_sacred_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    SACRED_TEXTS_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(&keyword.to_lowercase()))
}

/// Break a paragraph into plain and bold segments.
///
/// Sacred-text highlighting only applies when `highlight_sacred` is set,
/// which front ends do for model turns.
pub fn segments(paragraph: &str, highlight_sacred: bool) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in bold_pattern().captures_iter(paragraph) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        if whole.start() > last {
            out.push(Segment::Plain(&paragraph[last..whole.start()]));
        }

        let text = inner.as_str();
        if highlight_sacred && is_sacred_text(text) {
            out.push(Segment::Sacred(text));
        } else {
            out.push(Segment::Bold(text));
        }
        last = whole.end();
    }

    if last < paragraph.len() {
        out.push(Segment::Plain(&paragraph[last..]));
    }

    out
}

/// The text to show for a turn, truncated with an ellipsis while collapsed
pub fn display_content(message: &Message, expanded: bool) -> Cow<'_, str> {
    if message.is_long() && !expanded {
        let cut: String = message.content.chars().take(TRUNCATION_LIMIT).collect();
        Cow::Owned(format!("{}...", cut))
    } else {
        Cow::Borrowed(&message.content)
    }
}
