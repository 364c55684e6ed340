//! Text normalisation for the training corpus.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Anything that is neither a word character nor whitespace.
static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("valid regex"));

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

static NON_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z\s]").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

const ROMAN_NUMERALS: &[&str] = &[
    "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii", "xiii", "xiv",
    "xv", "xvi", "xvii", "xviii", "xix", "xx",
];

/// Suffixes left behind when ordinals like "2nd" lose their digits.
const ORDINAL_SUFFIXES: &[&str] = &["nd", "rd", "th"];

static DROPPED: LazyLock<HashSet<String>> = LazyLock::new(|| {
    let letters = ('a'..='z').map(|c| c.to_string());
    STOP_WORDS
        .iter()
        .chain(ROMAN_NUMERALS)
        .chain(ORDINAL_SUFFIXES)
        .map(|w| w.to_string())
        .chain(letters)
        .collect()
});

/// Replace separators and non-letters with spaces, lowercase, collapse runs
/// of whitespace.
pub fn clean_for_tokenization(text: &str) -> String {
    let text = text.replace(['_', '-'], " ");
    let text = NON_LETTER.replace_all(&text, " ");
    let text = text.to_lowercase();
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Reduce a document to lowercase content words.
pub fn normalize_document(text: &str) -> String {
    let stripped = NON_ALNUM.replace_all(text, "");
    let lowered = stripped.to_lowercase();

    let kept: Vec<&str> = WORD
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| !DROPPED.contains(*w))
        .collect();

    clean_for_tokenization(&kept.join(" "))
}
