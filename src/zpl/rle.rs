//! ASCII-hex run-length prefix codes shared by the ZPL GRF decoder and
//! encoder (§4.4/§4.5). The source finds runs with a regex and does a
//! global find-and-replace per distinct pattern, longest-pattern-first, to
//! avoid one short match aliasing inside a longer one. A single left-to-
//! right scanner sidesteps the aliasing problem entirely (the REDESIGN
//! FLAGS note for this crate) because each character is consumed exactly
//! once as either prefix, literal, or plain data.

/// Characters that can appear in a repeat-count prefix: `G`..`Z`, `g`..`z`.
fn is_prefix_char(c: char) -> bool {
    matches!(c, 'G'..='Z' | 'g'..='z')
}

/// Decodes a run of prefix characters (e.g. `"gY"`) into its repeat count.
fn decode_prefix(chars: &[char]) -> usize {
    let mut repeat = 0usize;
    for &c in chars {
        if c == 'z' {
            repeat += 400;
        } else {
            let value = (c.to_ascii_uppercase() as u8 - b'F') as usize;
            if c.is_ascii_lowercase() {
                repeat += value * 20;
            } else {
                repeat += value;
            }
        }
    }
    repeat
}

/// Encodes a repeat count as the shortest prefix code: `z` for each 400,
/// then a lowercase `g`..`y` for each further 20, then one uppercase
/// `G`..`Y` for what remains (1..=19).
fn encode_prefix(mut count: usize) -> String {
    let mut out = String::new();
    while count >= 400 {
        out.push('z');
        count -= 400;
    }
    if count >= 20 {
        let units = count / 20;
        count -= units * 20;
        out.push((((units as u8) + 70) as char).to_ascii_lowercase());
    }
    if count > 0 {
        out.push(((count as u8) + 70) as char);
    }
    out
}

/// Expands every `[prefix]+literal` run-length code in `input` back into
/// `literal` repeated the encoded number of times. Characters that are not
/// part of a run-length code pass through unchanged.
pub fn expand(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if is_prefix_char(chars[i]) {
            let start = i;
            let mut end = i;
            while end < chars.len() && is_prefix_char(chars[end]) {
                end += 1;
            }
            // `end` is one past the maximal run of prefix characters. The
            // literal is the character right after the run; if the run
            // reaches the end of the string, the last prefix character
            // itself becomes the literal (mirrors the greedy regex
            // backtracking off `[G-Zg-z]+.`).
            let literal_index = if end < chars.len() {
                end
            } else if end - start >= 2 {
                end - 1
            } else {
                // A single trailing prefix character with nothing after it
                // cannot match `[G-Zg-z]+.` at all; leave it untouched.
                out.push(chars[start]);
                i = start + 1;
                continue;
            };
            let repeat = decode_prefix(&chars[start..literal_index]);
            let literal = chars[literal_index];
            for _ in 0..repeat {
                out.push(literal);
            }
            i = literal_index + 1;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Compresses `input` by replacing every maximal run of 2+ identical
/// characters with its run-length prefix code followed by the character.
pub fn compress(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut j = i + 1;
        while j < chars.len() && chars[j] == c {
            j += 1;
        }
        let run_len = j - i;
        if run_len >= 2 {
            out.push_str(&encode_prefix(run_len));
        }
        out.push(c);
        i = j;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_every_count_from_1_to_3600() {
        for count in 1..=3600usize {
            let code = encode_prefix(count);
            let expanded = expand(&format!("{}0", code));
            let zeros: String = std::iter::repeat('0').take(count).collect();
            assert_eq!(expanded, zeros, "count={count} code={code:?}");
        }
    }

    #[test]
    fn compress_then_expand_is_identity() {
        let text = "000000000000FFFFFFFFFFFFFF00112233";
        let compressed = compress(text);
        assert_eq!(expand(&compressed), text);
    }

    #[test]
    fn short_runs_are_left_alone() {
        assert_eq!(compress("AB"), "AB");
        assert_eq!(expand("AB"), "AB");
    }

    #[test]
    fn z_means_400() {
        assert_eq!(decode_prefix(&['z']), 400);
        assert_eq!(encode_prefix(400), "z");
    }

    #[test]
    fn trailing_single_prefix_char_is_untouched() {
        // "G" alone at the end of a string can't satisfy `[G-Zg-z]+.`
        assert_eq!(expand("0G"), "0G");
    }
}
