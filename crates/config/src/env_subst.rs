//! `${ENV_VAR}` expansion for raw config text.

/// Expand `${NAME}` and `${NAME:-fallback}` placeholders from the process
/// environment.
///
/// Unset variables without a fallback are left in place, as are unterminated
/// placeholders.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let body = &after[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };

        match (name.is_empty(), lookup(name), fallback) {
            (false, Some(value), _) => out.push_str(&value),
            (false, None, Some(fallback)) => out.push_str(fallback),
            _ => {
                out.push_str("${");
                out.push_str(body);
                out.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "CHATTER_TOKEN" => Some("s3cret".to_string()),
            "EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn known_variables_are_replaced() {
        assert_eq!(
            substitute_with("token = \"${CHATTER_TOKEN}\"", lookup),
            "token = \"s3cret\""
        );
        assert_eq!(substitute_with("[${EMPTY}]", lookup), "[]");
    }

    #[test]
    fn unknown_variables_are_kept() {
        assert_eq!(
            substitute_with("a ${CHATTER_MISSING} b", lookup),
            "a ${CHATTER_MISSING} b"
        );
    }

    #[test]
    fn fallback_applies_only_when_unset() {
        assert_eq!(substitute_with("${CHATTER_MISSING:-oops}", lookup), "oops");
        assert_eq!(substitute_with("${CHATTER_TOKEN:-oops}", lookup), "s3cret");
    }

    #[test]
    fn malformed_placeholders_pass_through() {
        assert_eq!(substitute_with("cost: $5 ${}", lookup), "cost: $5 ${}");
        assert_eq!(substitute_with("tail ${OPEN", lookup), "tail ${OPEN");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(substitute_env("Sorry, I didn't get that."), "Sorry, I didn't get that.");
    }
}
