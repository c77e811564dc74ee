//! Text normalisation helpers shared by the classifier and the scorers.

use audio_ifeval_domain::Task;
use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)|<[^>]*>").unwrap());

/// Hesitations dropped from transcripts before WER.
const FILLERS: [&str; 9] = ["hmm", "mm", "mhm", "mmm", "uh", "um", "ah", "er", "erm"];

/// English transcript normaliser: lower-case, bracketed asides removed,
/// punctuation removed, fillers removed, whitespace collapsed.
pub fn normalize_english(text: &str) -> String {
    let lowered = text.to_lowercase();
    let without_asides = BRACKETED.replace_all(&lowered, " ");
    let cleaned: String = without_asides
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .filter(|w| !FILLERS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse every whitespace run (including newlines) to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove one pair of matching surrounding quotes.
pub fn strip_surrounding_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && bytes[0] == bytes[bytes.len() - 1] && matches!(bytes[0], b'\'' | b'"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Lower-case, drop ASCII punctuation and collapse whitespace. Used before
/// word alignment.
pub fn alignment_form(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    collapse_whitespace(&lowered)
}

/// Whether the text contains a CJK ideograph.
pub fn has_cjk(text: &str) -> bool {
    text.chars().any(is_cjk_ideograph)
}

/// CJK unified ideographs, extension A and compatibility ideographs.
pub fn is_cjk_ideograph(c: char) -> bool {
    matches!(c, '\u{3400}'..='\u{4dbf}' | '\u{4e00}'..='\u{9fff}' | '\u{f900}'..='\u{faff}')
}

/// Whether the text holds any word character outside ASCII.
pub fn has_non_ascii_word(text: &str) -> bool {
    text.chars().any(|c| !c.is_ascii() && c.is_alphanumeric())
}

/// Whether the sentence is a single word-group repeated two or more times.
///
/// Punctuation becomes whitespace and case is ignored.
pub fn is_repeated_sentence(sentence: &str) -> bool {
    let normalized: String = sentence
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    let words: Vec<&str> = normalized.split_whitespace().collect();
    let n = words.len();
    if n < 2 {
        return false;
    }
    (1..=n / 2)
        .filter(|size| n % size == 0)
        .any(|size| words.chunks(size).all(|chunk| chunk == &words[..size]))
}

/// First whole-word label of a classification task found in the text,
/// lower-cased. `None` for other tasks or when no label occurs.
pub fn canonical_label(task: Task, text: &str) -> Option<&'static str> {
    let labels = task.label_set()?;
    let lowered = text.to_lowercase();
    let mut best: Option<(usize, &'static str)> = None;
    for label in labels {
        for (pos, _) in lowered.match_indices(label) {
            if is_word_boundary(&lowered, pos, label.len()) {
                if best.map_or(true, |(p, _)| pos < p) {
                    best = Some((pos, label));
                }
                break;
            }
        }
    }
    best.map(|(_, label)| label)
}

fn is_word_boundary(text: &str, start: usize, len: usize) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let before = text[..start].chars().next_back().map_or(true, |c| !is_word(c));
    let after = text[start + len..].chars().next().map_or(true, |c| !is_word(c));
    before && after
}

/// Whether `text`, trimmed and lower-cased, is exactly one of the task's labels.
pub fn is_exact_label(task: Task, text: &str) -> bool {
    let candidate = text.trim().to_lowercase();
    task.label_set()
        .map_or(false, |labels| labels.iter().any(|l| *l == candidate))
}
