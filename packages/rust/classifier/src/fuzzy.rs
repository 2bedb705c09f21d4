//! Partial-ratio string similarity.
//!
//! Scores are on a 0-100 scale. The similarity of two strings is the indel
//! ratio `2 * LCS / (len_a + len_b)`; the partial ratio slides a phrase over
//! the text and keeps the best window. Inputs are expected to be normalized
//! (ASCII lowercase, single spaces), so work is done on bytes.

/// Indel similarity of two byte strings, 0.0-100.0.
pub fn ratio(a: &[u8], b: &[u8]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[u8], b: &[u8]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &x in a {
        for (j, &y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Offsets where a word begins.
fn word_starts(s: &[u8]) -> impl Iterator<Item = usize> + '_ {
    (0..s.len()).filter(move |&i| s[i] != b' ' && (i == 0 || s[i - 1] == b' '))
}

/// Best similarity of `phrase` against windows of `text`, rounded to 0-100.
/// Empty input scores 0.
///
/// Windows start at word boundaries and span the phrase's length; the final
/// window is aligned to the end of the text. Text shorter than the phrase is
/// compared whole, so a fragment of a phrase ("agent", "learning") does not
/// count as the phrase.
pub fn partial_ratio(text: &str, phrase: &str) -> u8 {
    if text.is_empty() || phrase.is_empty() {
        return 0;
    }

    let (needle, haystack) = (phrase.as_bytes(), text.as_bytes());
    if haystack.len() < needle.len() {
        return rounded(ratio(haystack, needle));
    }

    if haystack
        .windows(needle.len())
        .any(|window| window == needle)
    {
        return 100;
    }

    let mut best = 0.0f64;
    for start in word_starts(haystack) {
        let end = (start + needle.len()).min(haystack.len());
        best = best.max(ratio(needle, &haystack[start..end]));
    }
    let tail = haystack.len() - needle.len();
    best = best.max(ratio(needle, &haystack[tail..]));

    rounded(best)
}

fn rounded(score: f64) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}

/// The highest-scoring phrase and its score. Ties keep the earlier phrase.
pub fn best_match<'a>(text: &str, phrases: &'a [String]) -> Option<(&'a str, u8)> {
    let mut best: Option<(&str, u8)> = None;
    for phrase in phrases {
        let score = partial_ratio(text, phrase);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((phrase.as_str(), score));
        }
    }
    best
}
