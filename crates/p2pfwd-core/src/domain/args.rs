//! Argument tokenizer for operator command lines.
//!
//! Commands typed at the prompt are free-form text such as
//! `open tcp 8080` or `connect 12D3Koo...`.  [`tokenize`] splits such a line
//! into a fixed number of whitespace-delimited arguments.  The last requested
//! argument swallows the rest of the line verbatim, so a command's final
//! argument may itself contain spaces:
//!
//! ```text
//! tokenize("  a   b   c  d", 3)  ->  ["a", "b", "c  d"]
//! tokenize("open tcp", 3)        ->  ["open", "tcp", ""]
//! ```
//!
//! There is no quoting or escaping.  Whitespace is anything for which
//! [`char::is_whitespace`] returns `true`, so non-ASCII separators such as
//! U+00A0 or U+3000 split tokens too.

/// Splits `line` into exactly `n` arguments.
///
/// - Runs of whitespace separate arguments; leading whitespace is skipped.
/// - The `n`-th argument, once reached, holds the remainder of the line
///   verbatim (interior and trailing whitespace included).
/// - Missing arguments are empty strings.
/// - `n == 0` yields an empty vector.
///
/// Never fails and never panics, whatever the input.
pub fn tokenize(line: &str, n: usize) -> Vec<String> {
    let mut args = vec![String::new(); n];
    if n == 0 {
        return args;
    }

    // Byte offset of the token currently being scanned, if any.
    let mut start: Option<usize> = None;
    let mut filled = 0;

    for (i, ch) in line.char_indices() {
        match start {
            None => {
                if !ch.is_whitespace() {
                    start = Some(i);
                }
            }
            Some(s) if filled + 1 == n => {
                args[filled] = line[s..].to_string();
                return args;
            }
            Some(s) => {
                if ch.is_whitespace() {
                    args[filled] = line[s..i].to_string();
                    start = None;
                    filled += 1;
                }
            }
        }
    }

    if let Some(s) = start {
        args[filled] = line[s..].to_string();
    }

    args
}

// ── Tests ─────────────────────────────────────────────────────────────────────
