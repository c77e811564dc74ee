//! Tokenisers for the corpus metrics.

use once_cell::sync::Lazy;
use regex::Regex;

/// Code point ranges split into single-character tokens by the Chinese BLEU
/// tokeniser. Two ranges are narrower than their nominal extension-B and
/// compatibility-supplement bounds, matching the reference tokeniser's actual
/// behaviour on BMP strings.
const CJK_TOKEN_RANGES: [(char, char); 22] = [
    ('\u{3400}', '\u{4db5}'),
    ('\u{4e00}', '\u{9fa5}'),
    ('\u{9fa6}', '\u{9fbb}'),
    ('\u{f900}', '\u{fa2d}'),
    ('\u{fa30}', '\u{fa6a}'),
    ('\u{fa70}', '\u{fad9}'),
    ('\u{2001}', '\u{2a6d}'),
    ('\u{2f81}', '\u{2fa1}'),
    ('\u{ff00}', '\u{ffef}'),
    ('\u{2e80}', '\u{2eff}'),
    ('\u{3000}', '\u{303f}'),
    ('\u{31c0}', '\u{31ef}'),
    ('\u{2f00}', '\u{2fdf}'),
    ('\u{2ff0}', '\u{2fff}'),
    ('\u{3100}', '\u{312f}'),
    ('\u{31a0}', '\u{31bf}'),
    ('\u{fe10}', '\u{fe1f}'),
    ('\u{fe30}', '\u{fe4f}'),
    ('\u{2600}', '\u{26ff}'),
    ('\u{2700}', '\u{27bf}'),
    ('\u{3200}', '\u{32ff}'),
    ('\u{3300}', '\u{33ff}'),
];

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"([{-~\[-` -&(-+:-@/])").unwrap());
static PERIOD_COMMA_AFTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^0-9])([.,])").unwrap());
static PERIOD_COMMA_BEFORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.,])([^0-9])").unwrap());
static DIGIT_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9])(-)").unwrap());

fn is_cjk_token_char(c: char) -> bool {
    CJK_TOKEN_RANGES.iter().any(|(start, end)| (*start..=*end).contains(&c))
}

/// Chinese BLEU tokenisation: CJK characters become single tokens, the rest
/// is split on punctuation in the 13a manner.
pub fn tokenize_zh(line: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(line.len() * 2);
    for c in line.trim().chars() {
        if is_cjk_token_char(c) {
            spaced.push(' ');
            spaced.push(c);
            spaced.push(' ');
        } else {
            spaced.push(c);
        }
    }

    let step = PUNCTUATION.replace_all(&spaced, " ${1} ");
    let step = PERIOD_COMMA_AFTER.replace_all(&step, "${1} ${2} ");
    let step = PERIOD_COMMA_BEFORE.replace_all(&step, " ${1} ${2}");
    let step = DIGIT_DASH.replace_all(&step, "${1} ${2} ");
    step.split_whitespace().map(str::to_string).collect()
}

/// Caption tokenisation: lower-case, punctuation dropped, whitespace split.
pub fn tokenize_caption(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Whitespace tokenisation.
pub fn tokenize_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}
