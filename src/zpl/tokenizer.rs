//! Splits a raw ZPL string into an ordered sequence of commands (§4.3).
//! Line endings are stripped first, then the text is split immediately
//! before every `^` and `~` so that each command (including its leading
//! prefix character) becomes one token. Everything that isn't `~DG`,
//! `~DY`, or `^GF` passes through unchanged in `replace_grfs`.

/// Splits `zpl` into command tokens, preserving order. `CR`/`LF` are
/// stripped first; the remaining text is split right before every `^` and
/// `~`.
pub fn tokenize(zpl: &str) -> Vec<String> {
    let normalised: String = zpl.chars().filter(|c| *c != '\r' && *c != '\n').collect();

    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in normalised.chars() {
        if (c == '^' || c == '~') && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_endings() {
        assert_eq!(tokenize("^XA\r\n^FS\n"), vec!["^XA", "^FS"]);
    }

    #[test]
    fn splits_before_caret_and_tilde() {
        let tokens = tokenize("^XA^FO0,0~DGR:A.GRF,1,1,00^FS^XZ");
        assert_eq!(
            tokens,
            vec!["^XA", "^FO0,0", "~DGR:A.GRF,1,1,00", "^FS", "^XZ"]
        );
    }

    #[test]
    fn leading_text_before_first_command_is_kept() {
        assert_eq!(tokenize("hello^XA"), vec!["hello", "^XA"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("").is_empty());
    }
}
