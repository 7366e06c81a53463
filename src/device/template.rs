//! Placeholder substitution for the configured device command.
//!
//! `{name}` is replaced by the matching variable; `{{` and `}}` produce
//! literal braces. Referencing an unknown placeholder is an error, so a typo
//! in config.yaml cannot silently drop the address or mode.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{name}}}' at byte {offset}")]
    UnknownPlaceholder { name: String, offset: usize },

    #[error("unclosed '{{' at byte {offset}")]
    Unclosed { offset: usize },
}

/// Substitute `{name}` placeholders in `template` from `vars`.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(idx) = rest.find(['{', '}']) {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        let at = offset + idx;

        let consumed = if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            2
        } else if tail.starts_with('}') {
            out.push('}');
            1
        } else {
            let close = tail.find('}').ok_or(TemplateError::Unclosed { offset: at })?;
            let name = tail[1..close].trim();
            let value = vars
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| TemplateError::UnknownPlaceholder {
                    name: name.to_string(),
                    offset: at,
                })?;
            out.push_str(value);
            close + 1
        };

        rest = &tail[consumed..];
        offset = at + consumed;
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[(&str, &str)] = &[("address", "192.168.0.2"), ("mode", "game")];

    #[test]
    fn test_substitutes_placeholders() {
        assert_eq!(
            render_template("lgtv {address} set {mode}", VARS).unwrap(),
            "lgtv 192.168.0.2 set game"
        );
        assert_eq!(render_template("{ mode }", VARS).unwrap(), "game");
        assert_eq!(render_template("no placeholders", VARS).unwrap(), "no placeholders");
    }

    #[test]
    fn test_braces_escape_and_pass_through() {
        assert_eq!(
            render_template(r#"cmd '{{"mode": "{mode}"}}'"#, VARS).unwrap(),
            r#"cmd '{"mode": "game"}'"#
        );
        assert_eq!(render_template("a } {mode}", VARS).unwrap(), "a } game");
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = render_template("x {adress}", VARS).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownPlaceholder {
                name: "adress".to_string(),
                offset: 2
            }
        );
        assert_eq!(err.to_string(), "unknown placeholder '{adress}' at byte 2");

        assert!(matches!(
            render_template("{}", VARS).unwrap_err(),
            TemplateError::UnknownPlaceholder { offset: 0, .. }
        ));
    }

    #[test]
    fn test_unclosed_placeholder() {
        assert_eq!(
            render_template("x {mode", VARS).unwrap_err(),
            TemplateError::Unclosed { offset: 2 }
        );
    }
}
