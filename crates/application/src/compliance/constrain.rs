//! `constrain` heuristics: the response must be a bare answer with no
//! hedging, no self-loops and, for transcripts, close to the reference.

use audio_ifeval_domain::{ConstrainThresholds, Task};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::text::{alignment_form, canonical_label, has_non_ascii_word, is_repeated_sentence};

/// Phrases that reveal a described rather than transcribed answer.
pub const TRANSCRIPT_DENYLIST: [&str; 5] = [
    "the speaker",
    "the audio",
    "the spoken content",
    "summary:",
    "the sentence",
];

/// Phrases that reveal commentary instead of a caption.
pub const CAPTION_DENYLIST: [&str; 19] = [
    "there is",
    "the clip",
    "the audio",
    "the recording",
    "no audio",
    "there are",
    "sorry",
    "can't",
    "caption",
    "label",
    ":",
    "the scene",
    "this is",
    "element",
    "the soundscape",
    "the text",
    "the speaker",
    "capture",
    "?",
];

const TRANSLATION_MARKERS: [&str; 15] = [
    "mandarin",
    "chinese",
    "translation",
    "中文是",
    "普通话版本",
    "汉语",
    "翻译",
    "译文",
    "原文",
    "译成",
    "翻成",
    "翻译成",
    "翻译为",
    "译为",
    " is",
];

/// Markers that may not introduce a colon segment.
const COLON_MARKERS: [&str; 13] = [
    "mandarin",
    "chinese",
    "translation",
    "普通话",
    "汉语",
    "翻译",
    "译文",
    "原文",
    "译成",
    "翻成",
    "翻译成",
    "翻译为",
    "译为",
];

/// Every marker plus its punctuated variants.
static TRANSLATION_KEYWORDS: Lazy<Vec<String>> = Lazy::new(|| {
    let mut keywords: Vec<String> = TRANSLATION_MARKERS.iter().map(|k| k.to_string()).collect();
    for suffix in [":", "：", "是", ")"] {
        keywords.extend(TRANSLATION_MARKERS.iter().map(|k| format!("{k}{suffix}")));
    }
    keywords.extend(TRANSLATION_MARKERS.iter().map(|k| format!("({k}")));
    keywords.extend(TRANSLATION_MARKERS.iter().map(|k| format!("{k}）")));
    keywords.extend(TRANSLATION_MARKERS.iter().map(|k| format!("（{k}")));
    keywords.extend(["中文翻译", "普通话翻译", "汉语翻译"].iter().map(|k| k.to_string()));
    if let Some(pos) = keywords.iter().position(|k| k == "汉语") {
        keywords.remove(pos);
    }
    keywords
});

static BRACKETED_ASIDE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"《[^》]*》|（[^）]*）|\([^)]*\)|"[^"]*""#).unwrap());
static ASCII_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]+\b").unwrap());

/// Word-level alignment counts of a hypothesis against a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Alignment {
    /// Substituted words
    pub substitutions: usize,
    /// Reference words missing from the hypothesis
    pub deletions: usize,
    /// Extra hypothesis words
    pub insertions: usize,
    /// Reference length in words
    pub reference_len: usize,
}

impl Alignment {
    /// Word error rate as a fraction; zero for an empty reference.
    pub fn wer(&self) -> f64 {
        if self.reference_len == 0 {
            0.0
        } else {
            (self.substitutions + self.deletions + self.insertions) as f64 / self.reference_len as f64
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Op {
    Match,
    Substitute,
    Insert,
    Delete,
}

/// Minimum edit alignment over lower-cased, punctuation-free words.
///
/// Among equal-cost mismatches, substitution wins over insertion, which wins
/// over deletion.
pub fn align_words(reference: &str, hypothesis: &str) -> Alignment {
    let reference = alignment_form(reference);
    let hypothesis = alignment_form(hypothesis);
    let r: Vec<&str> = reference.split_whitespace().collect();
    let h: Vec<&str> = hypothesis.split_whitespace().collect();
    let (n, m) = (r.len(), h.len());

    let mut cost = vec![vec![0usize; m + 1]; n + 1];
    let mut back = vec![vec![Op::Match; m + 1]; n + 1];
    for i in 1..=n {
        cost[i][0] = i;
        back[i][0] = Op::Delete;
    }
    for j in 1..=m {
        cost[0][j] = j;
        back[0][j] = Op::Insert;
    }
    for i in 1..=n {
        for j in 1..=m {
            if r[i - 1] == h[j - 1] {
                cost[i][j] = cost[i - 1][j - 1];
                back[i][j] = Op::Match;
            } else {
                let substitute = cost[i - 1][j - 1] + 1;
                let insert = cost[i][j - 1] + 1;
                let delete = cost[i - 1][j] + 1;
                let best = substitute.min(insert).min(delete);
                cost[i][j] = best;
                back[i][j] = if best == substitute {
                    Op::Substitute
                } else if best == insert {
                    Op::Insert
                } else {
                    Op::Delete
                };
            }
        }
    }

    let mut alignment = Alignment {
        reference_len: n,
        ..Default::default()
    };
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        match back[i][j] {
            Op::Match => {
                i -= 1;
                j -= 1;
            }
            Op::Substitute => {
                alignment.substitutions += 1;
                i -= 1;
                j -= 1;
            }
            Op::Insert => {
                alignment.insertions += 1;
                j -= 1;
            }
            Op::Delete => {
                alignment.deletions += 1;
                i -= 1;
            }
        }
    }
    alignment
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    phrases.iter().any(|p| lowered.contains(p))
}

/// Transcript check: close to the reference, no denylisted phrase, no self-loop.
pub fn transcript_complies(response: &str, reference: &str, thresholds: &ConstrainThresholds) -> bool {
    let alignment = align_words(reference, response);
    if alignment.wer() >= thresholds.max_wer || alignment.insertions >= thresholds.max_insertions {
        return false;
    }
    !contains_any(response, &TRANSCRIPT_DENYLIST) && !is_repeated_sentence(response)
}

/// Caption check: no denylisted phrase, no self-loop.
pub fn caption_complies(response: &str) -> bool {
    !contains_any(response, &CAPTION_DENYLIST) && !is_repeated_sentence(response)
}

/// Label check: a single quote-stripped token that is the upper-cased label.
pub fn bare_label(task: Task, response: &str) -> Option<String> {
    let trimmed = response.trim();
    let stripped = crate::text::strip_surrounding_quotes(trimmed).trim();
    if stripped.contains(' ') {
        return None;
    }
    let label = canonical_label(task, stripped)?;
    (stripped == label.to_uppercase()).then(|| stripped.to_string())
}

/// Translation check of a response against its source reference.
pub fn translation_complies(reference: &str, response: &str) -> bool {
    let response_lower = response.to_lowercase();
    let reference_lower = reference.to_lowercase();
    let keywords = &*TRANSLATION_KEYWORDS;

    let response_marked = keywords.iter().any(|k| response_lower.contains(k.as_str()));
    let reference_marked = keywords.iter().any(|k| reference_lower.contains(k.as_str()));
    if response_marked && !reference_marked {
        return false;
    }

    let leftover = remove_common_words(response, reference);
    if english_words(&leftover).len() >= 5 {
        return false;
    }

    if !has_non_ascii_word(response) {
        return false;
    }

    !colon_segments(response)
        .iter()
        .any(|seg| {
            let seg = seg.to_lowercase();
            COLON_MARKERS.iter().any(|m| seg.contains(m))
        })
}

/// Drop bracketed and quoted asides, collapse whitespace.
fn remove_asides(text: &str) -> String {
    crate::text::collapse_whitespace(&BRACKETED_ASIDE.replace_all(text, ""))
}

/// Delete from `text` every ASCII word that also occurs in `reference`.
fn remove_common_words(text: &str, reference: &str) -> String {
    let reference = remove_asides(reference).to_lowercase();
    let known: HashSet<&str> = ASCII_WORD.find_iter(&reference).map(|m| m.as_str()).collect();
    let replaced = ASCII_WORD.replace_all(text, |caps: &regex::Captures<'_>| {
        let word = &caps[0];
        if known.contains(word.to_lowercase().as_str()) {
            String::new()
        } else {
            word.to_string()
        }
    });
    crate::text::collapse_whitespace(&replaced)
}

/// Words starting with an ASCII letter, after CJK text and punctuation are
/// blanked out.
fn english_words(text: &str) -> Vec<String> {
    let blanked: String = text
        .chars()
        .map(|c| {
            if ('\u{4e00}'..='\u{9fff}').contains(&c) || !(c.is_alphanumeric() || c == '_' || c.is_whitespace()) {
                ' '
            } else {
                c
            }
        })
        .collect();
    blanked
        .split_whitespace()
        .filter(|w| w.chars().next().map_or(false, |c| c.is_ascii_alphabetic()))
        .map(str::to_string)
        .collect()
}

fn is_clause_punctuation(c: char) -> bool {
    matches!(c, '。' | '！' | '？' | '；' | '，' | '、' | '：' | ':' | '!' | '?' | '.' | ';' | ',')
}

/// Segments running from the previous clause punctuation up to each colon,
/// colon included.
fn colon_segments(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut segment_start = 0;
    for (pos, c) in text.char_indices() {
        let end = pos + c.len_utf8();
        if c == ':' || c == '：' {
            let segment = text[segment_start..end].trim();
            if !segment.is_empty() {
                segments.push(segment.to_string());
            }
        }
        if is_clause_punctuation(c) {
            segment_start = end;
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_counts() {
        let a = align_words("the cat sat on the mat", "the cat sat on mat");
        assert_eq!(a.deletions, 1);
        assert_eq!(a.substitutions + a.insertions, 0);

        let b = align_words("hello world", "hello big wide world");
        assert_eq!(b.insertions, 2);
        assert!((b.wer() - 1.0).abs() < 1e-12);

        let c = align_words("a b", "x y");
        assert_eq!(c.substitutions, 2);
    }

    #[test]
    fn test_alignment_prefers_substitution() {
        // "a b" vs "c": one substitution and one deletion either way.
        let a = align_words("a b", "c");
        assert_eq!((a.substitutions, a.deletions, a.insertions), (1, 1, 0));
    }

    #[test]
    fn test_empty_reference_has_zero_wer() {
        assert_eq!(align_words("", "hello").wer(), 0.0);
    }

    #[test]
    fn test_transcript_constrain() {
        let t = ConstrainThresholds::default();
        assert!(transcript_complies("Hello world.", "hello world", &t));
        assert!(!transcript_complies("The speaker says hello world", "hello world", &t));
        assert!(!transcript_complies("completely different", "hello world", &t));
        assert!(!transcript_complies("hello hello", "hello hello there", &t));
        assert!(!transcript_complies("so then hello my world ok", "hello world", &t));
    }

    #[test]
    fn test_insertion_threshold() {
        let t = ConstrainThresholds::default();
        let reference = "a b c d e";

        let three = align_words(reference, "a b c d e x y z");
        assert_eq!(three.insertions, 3);
        assert!(three.wer() < 1.0);
        assert!(!transcript_complies("a b c d e x y z", reference, &t));

        let two = align_words(reference, "a b c d e x y");
        assert_eq!(two.insertions, 2);
        assert!(transcript_complies("a b c d e x y", reference, &t));

        let relaxed = ConstrainThresholds {
            max_insertions: 4,
            ..Default::default()
        };
        assert!(transcript_complies("a b c d e x y z", reference, &relaxed));
    }

    #[test]
    fn test_caption_constrain() {
        assert!(caption_complies("A dog barks while cars pass by"));
        assert!(!caption_complies("There is a dog barking"));
        assert!(!caption_complies("Caption: a dog"));
        assert!(!caption_complies("dog barks dog barks"));
    }

    #[test]
    fn test_bare_label() {
        assert_eq!(bare_label(Task::Ser, "\"HAPPY\"").as_deref(), Some("HAPPY"));
        assert!(bare_label(Task::Ser, "happy").is_none());
        assert!(bare_label(Task::Ser, "VERY HAPPY").is_none());
        assert_eq!(bare_label(Task::Gr, " FEMALE ").as_deref(), Some("FEMALE"));
    }

    #[test]
    fn test_translation_constrain() {
        let reference = "The weather is nice today.";
        assert!(translation_complies(reference, "今天天气很好。"));
        assert!(!translation_complies(reference, "Translation: 今天天气很好。"));
        assert!(!translation_complies(reference, "Nice weather indeed my good friend"));
        assert!(!translation_complies(reference, "译文：今天天气很好"));
        assert!(!translation_complies(reference, "we could say maybe something like 今天天气很好"));
    }

    #[test]
    fn test_colon_segments() {
        let segs = colon_segments("好的。译文：今天");
        assert_eq!(segs, vec!["译文：".to_string()]);
        assert_eq!(colon_segments("no colon"), Vec::<String>::new());
    }

    #[test]
    fn test_keywords_exclude_bare_hanyu() {
        assert!(!TRANSLATION_KEYWORDS.iter().any(|k| k == "汉语"));
        assert!(TRANSLATION_KEYWORDS.iter().any(|k| k == "汉语："));
        assert!(TRANSLATION_KEYWORDS.iter().any(|k| k == "中文翻译"));
    }
}
