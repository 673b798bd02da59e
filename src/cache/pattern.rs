//! Glob pattern matching for key scans.
//!
//! Follows the store's `MATCH` syntax:
//! - `*` matches any run of characters, including none
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]`, `[^a]` match one character from (or outside) a set
//! - `\x` matches `x` literally

/// Character that turns a delete into a pattern delete.
pub const WILDCARD: char = '*';

/// Returns true if `key` should be treated as a pattern rather than an exact key.
pub fn is_pattern(key: &str) -> bool {
    key.contains(WILDCARD)
}

/// Checks whether `key` matches the glob `pattern`.
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    // Position after the last `*` seen, and the key position it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        if p < pattern.len() {
            match pattern[p] {
                '*' => {
                    while p < pattern.len() && pattern[p] == '*' {
                        p += 1;
                    }
                    if p == pattern.len() {
                        return true;
                    }
                    backtrack = Some((p, k));
                    continue;
                }
                '?' => {
                    p += 1;
                    k += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next)) = match_class(&pattern, p, key[k]) {
                        if matched {
                            p = next;
                            k += 1;
                            continue;
                        }
                    } else if key[k] == '[' {
                        // Unterminated class, `[` is literal
                        p += 1;
                        k += 1;
                        continue;
                    }
                }
                '\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == key[k] {
                        p += 2;
                        k += 1;
                        continue;
                    }
                }
                literal => {
                    if literal == key[k] {
                        p += 1;
                        k += 1;
                        continue;
                    }
                }
            }
        }

        match backtrack {
            Some((star_p, star_k)) => {
                p = star_p;
                k = star_k + 1;
                backtrack = Some((star_p, k));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Matches `c` against the class starting at `pattern[start] == '['`.
///
/// Returns `(matched, index after ']')`, or None when the class is unterminated.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negated = i < pattern.len() && pattern[i] == '^';
    if negated {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() {
        match pattern[i] {
            ']' => return Some((matched != negated, i + 1)),
            '\\' if i + 1 < pattern.len() => {
                matched |= pattern[i + 1] == c;
                i += 2;
            }
            low if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' => {
                let high = pattern[i + 2];
                let (low, high) = if low <= high { (low, high) } else { (high, low) };
                matched |= low <= c && c <= high;
                i += 3;
            }
            other => {
                matched |= other == c;
                i += 1;
            }
        }
    }
    None
}
