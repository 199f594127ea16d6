//! Weak-response heuristic.
//!
//! The retrieval-augmented completion service occasionally returns a terse
//! non-answer on the first pass. The classifier here decides whether a
//! response is worth a retry: it must hedge, be short, and engage with no
//! concrete content. Long answers that merely mention uncertainty in passing
//! are accepted.

/// Hedging and refusal phrases, matched case-insensitively.
const WEAK_RESPONSE_PHRASES: [&str; 17] = [
    "i don't know",
    "i do not know",
    "i don't have information",
    "i cannot find",
    "i'm not sure",
    "i don't see",
    "no information available",
    "i don't have access",
    "i cannot provide",
    "i'm unable to",
    "sorry, i don't have",
    "i don't have any information",
    "i cannot help",
    "i'm sorry, but i don't",
    "i don't have specific information",
    "i cannot locate",
    "i don't find",
];

/// Markers that indicate the answer engages with retrieved content even when
/// it also hedges.
const SUBSTANTIVE_MARKERS: [&str; 6] = [
    "however",
    "although",
    "but",
    "based on",
    "according to",
    "the document",
];

/// A hedging response shorter than this many characters (trimmed) is a
/// retry candidate.
const WEAK_LENGTH_LIMIT: usize = 150;

pub fn contains_weak_phrase(text: &str) -> bool {
    let lower = text.to_lowercase();
    WEAK_RESPONSE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

pub fn has_substantive_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    SUBSTANTIVE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// True only when the response hedges, is under the length limit, and carries
/// none of the substantive markers. The conjunction keeps short-but-correct
/// answers from being retried.
pub fn is_genuinely_weak(text: &str) -> bool {
    contains_weak_phrase(text) && text.trim().len() < WEAK_LENGTH_LIMIT && !has_substantive_marker(text)
}
