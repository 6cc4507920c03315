//! Detects agent replies that decline the request because the input is not
//! food, and picks the offending names out of the wording.
//!
//! This matches known phrasing from the model. It is a UX aid, not a
//! guarantee: a reworded refusal slips through and falls back like any other
//! unparseable reply.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const REFUSAL_PHRASES: [&str; 15] = [
    "食材として使用できません",
    "食材ではありません",
    "別の食材を指定",
    "食材を指定してください",
    "食材として適切ではありません",
    "申し訳ありませんが",
    "料理に使用できません",
    "食べ物ではありません",
    "食材として認識できません",
    "レシピを生成することができません",
    "具体的な食材を教えていただけますか",
    "別の具体的な食材",
    "適切な食材ではありません",
    "食材として利用できません",
    "料理に使用することはできません",
];

// Messages longer than this are assumed to be more than a plain refusal.
const MAX_MESSAGE_CHARS: usize = 500;
const MAX_QUOTED_CHARS: usize = 20;

static PAIR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"食材「([^」]+)」と「([^」]+)」",
        r"指定された食材「([^」]+)」と「([^」]+)」",
        r"「([^」]+)」と「([^」]+)」では",
        r"「([^」]+)」.*?「([^」]+)」",
    ])
});

static SINGLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"食材「([^」]+)」",
        r"指定された食材「([^」]+)」",
        r"「([^」]+)」.*?食材",
    ])
});

static QUOTED: Lazy<Regex> = Lazy::new(|| compile(&[r"「([^」]+)」"]).remove(0));

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("refusal pattern is valid"))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refusal {
    /// The agent's own wording, when it is short and carries no JSON.
    pub message: Option<String>,
    pub invalid_ingredients: Vec<String>,
}

/// Returns a refusal when `text` contains one of the known decline phrases.
pub fn detect(text: &str) -> Option<Refusal> {
    if !is_refusal(text) {
        return None;
    }

    Some(Refusal {
        message: refusal_message(text),
        invalid_ingredients: invalid_ingredients(text),
    })
}

pub fn is_refusal(text: &str) -> bool {
    let lower = text.to_lowercase();
    REFUSAL_PHRASES
        .iter()
        .any(|phrase| lower.contains(&phrase.to_lowercase()))
}

fn refusal_message(text: &str) -> Option<String> {
    if text.contains('{') || text.chars().count() >= MAX_MESSAGE_CHARS {
        return None;
    }
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Pair patterns first, then single patterns, then every short 「…」 span.
pub fn invalid_ingredients(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    for re in PAIR_PATTERNS.iter() {
        if let Some(caps) = re.captures(text) {
            if let (Some(a), Some(b)) = (caps.get(1), caps.get(2)) {
                found.push(a.as_str().to_string());
                found.push(b.as_str().to_string());
                break;
            }
        }
    }

    if found.is_empty() {
        for re in SINGLE_PATTERNS.iter() {
            if let Some(m) = re.captures(text).and_then(|caps| caps.get(1)) {
                found.push(m.as_str().to_string());
                break;
            }
        }
    }

    if found.is_empty() {
        found.extend(
            QUOTED
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str())
                .filter(|s| s.chars().count() < MAX_QUOTED_CHARS)
                .filter(|s| !s.contains("レシピ") && !s.contains("料理"))
                .map(str::to_string),
        );
    }

    let mut unique: Vec<String> = Vec::with_capacity(found.len());
    for name in found {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}
