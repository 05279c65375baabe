use crate::env::Environment;

/// Upper bound on substitution passes; values that expand to themselves stop here.
const MAX_PASSES: usize = 16;

/// Expand `${NAME}`, `${NAME:-default}` and `${NAME-default}` tokens.
///
/// Precedence is file value, then process value, then the inline default, then the
/// empty string. Every token found in a pass is replaced exactly once and the
/// replacement text is only looked at again by the next pass. Passes repeat until no
/// `${` remains, a pass finds no complete token, or `MAX_PASSES` is reached.
pub fn substitute(raw: &str, env: &Environment) -> String {
    let mut current = raw.to_owned();
    for _ in 0..MAX_PASSES {
        if !current.contains("${") {
            break;
        }
        match substitute_pass(&current, env) {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

fn substitute_pass(input: &str, env: &Environment) -> Option<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut replaced = false;

    while let Some(start) = rest.find("${") {
        let body_start = &rest[start + 2..];
        let Some(end) = body_start.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&resolve_token(&body_start[..end], env));
        rest = &body_start[end + 1..];
        replaced = true;
    }

    out.push_str(rest);
    replaced.then_some(out)
}

fn resolve_token(body: &str, env: &Environment) -> String {
    let token = Token::parse(body);
    match env.get(token.name) {
        Some(value) if !(token.empty_is_unset && value.is_empty()) => value.to_owned(),
        _ => token.default.unwrap_or_default().to_owned(),
    }
}

struct Token<'a> {
    name: &'a str,
    default: Option<&'a str>,
    /// `:-` form: an empty value falls through to the default.
    empty_is_unset: bool,
}

impl<'a> Token<'a> {
    fn parse(body: &'a str) -> Self {
        let Some(split) = body.find(|c: char| c == ':' || c == '-') else {
            return Self {
                name: body.trim(),
                default: None,
                empty_is_unset: false,
            };
        };
        let name = body[..split].trim();
        let operator = &body[split..];
        if let Some(default) = operator.strip_prefix(":-") {
            Self {
                name,
                default: Some(default),
                empty_is_unset: true,
            }
        } else if let Some(default) = operator.strip_prefix('-') {
            Self {
                name,
                default: Some(default),
                empty_is_unset: false,
            }
        } else {
            Self {
                name,
                default: None,
                empty_is_unset: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_used_when_unset() {
        let env = Environment::new();
        assert_eq!(substitute("${TAG:-latest}", &env), "latest");
        assert_eq!(substitute("${TAG-latest}", &env), "latest");
    }

    #[test]
    fn set_value_wins_over_default() {
        let env = Environment::new().set_process_var("TAG", "v2.0");
        assert_eq!(substitute("${TAG:-latest}", &env), "v2.0");
    }

    #[test]
    fn file_value_wins_over_process_value() {
        let env = Environment::new()
            .set_process_var("TAG", "process")
            .set_file_var("TAG", "file");
        assert_eq!(substitute("app:${TAG}", &env), "app:file");
    }

    #[test]
    fn unset_without_default_is_empty() {
        let env = Environment::new();
        assert_eq!(substitute("nginx:${TAG}", &env), "nginx:");
    }

    #[test]
    fn colon_dash_treats_empty_as_unset() {
        let env = Environment::new().set_file_var("TAG", "");
        assert_eq!(substitute("${TAG:-stable}", &env), "stable");
        assert_eq!(substitute("${TAG-stable}", &env), "");
    }

    #[test]
    fn multiple_tokens_in_one_reference() {
        let env = Environment::new()
            .set_file_var("REGISTRY", "ghcr.io")
            .set_file_var("OWNER", "acme");
        assert_eq!(
            substitute("${REGISTRY}/${OWNER}/api:${TAG:-1.2}", &env),
            "ghcr.io/acme/api:1.2"
        );
    }

    #[test]
    fn nested_default_resolves_over_passes() {
        let env = Environment::new().set_file_var("FALLBACK", "edge");
        assert_eq!(substitute("app:${TAG:-${FALLBACK}}", &env), "app:edge");
    }

    #[test]
    fn value_referencing_another_variable_expands_next_pass() {
        let env = Environment::new()
            .set_file_var("IMAGE", "redis:${REDIS_TAG}")
            .set_file_var("REDIS_TAG", "7");
        assert_eq!(substitute("${IMAGE}", &env), "redis:7");
    }

    #[test]
    fn self_reference_terminates() {
        let env = Environment::new().set_file_var("LOOP", "${LOOP}");
        assert_eq!(substitute("${LOOP}", &env), "${LOOP}");
    }

    #[test]
    fn unterminated_token_is_left_alone() {
        let env = Environment::new();
        assert_eq!(substitute("app:${TAG", &env), "app:${TAG");
    }

    #[test]
    fn plain_reference_untouched() {
        let env = Environment::new();
        assert_eq!(substitute("postgres:15.3.1", &env), "postgres:15.3.1");
    }
}
