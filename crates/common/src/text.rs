//! Whitespace-aware helpers shared by matchers, parsers and commands.

/// Strip `prefix` from the start of `text` and trim any run of leading
/// whitespace from what is left.
///
/// Returns `None` when `text` does not start with `prefix`.
pub fn strip_prefix_trimmed<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.strip_prefix(prefix).map(str::trim_start)
}

/// Match `word` as a whole leading word of `text`, ignoring ASCII case.
///
/// The word must be followed by whitespace or the end of the text, so
/// `"add"` matches `"add 1 2"` and `"add"` but not `"adder"`. The remainder
/// has its leading whitespace trimmed.
pub fn strip_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let head = text.get(..word.len())?;
    if !head.eq_ignore_ascii_case(word) {
        return None;
    }
    let rest = text.get(word.len()..)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest.trim_start()),
        Some(_) => None,
    }
}

/// Split off the first whitespace-delimited word.
///
/// Leading whitespace is ignored; the rest is trimmed at the start.
pub fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(idx) => {
            let (word, rest) = text.split_at(idx);
            (word, rest.trim_start())
        },
        None => (text, ""),
    }
}

/// Whitespace tokenizer used by the argument parser.
pub fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_trims_runs_of_whitespace() {
        assert_eq!(strip_prefix_trimmed("foo bar", "foo"), Some("bar"));
        assert_eq!(strip_prefix_trimmed("foo    bar", "foo"), Some("bar"));
        assert_eq!(strip_prefix_trimmed("foo\t\n bar baz", "foo"), Some("bar baz"));
        assert_eq!(strip_prefix_trimmed("foobar", "foo"), Some("bar"));
        assert_eq!(strip_prefix_trimmed("bar foo", "foo"), None);
    }

    #[test]
    fn word_requires_boundary() {
        assert_eq!(strip_word("add 1 2", "add"), Some("1 2"));
        assert_eq!(strip_word("ADD   1", "add"), Some("1"));
        assert_eq!(strip_word("add", "add"), Some(""));
        assert_eq!(strip_word("adder 1", "add"), None);
        assert_eq!(strip_word("ad", "add"), None);
    }

    #[test]
    fn word_on_multibyte_text_does_not_panic() {
        assert_eq!(strip_word("é", "ab"), None);
        assert_eq!(strip_word("日本語", "ab"), None);
    }

    #[test]
    fn split_first_word() {
        assert_eq!(split_word("  help   math add"), ("help", "math add"));
        assert_eq!(split_word("help"), ("help", ""));
        assert_eq!(split_word(""), ("", ""));
    }

    #[test]
    fn tokens_skip_empty_runs() {
        let toks: Vec<&str> = tokens(" foo  bar\tx=1 ").collect();
        assert_eq!(toks, vec!["foo", "bar", "x=1"]);
    }
}
