use std::collections::HashMap;

use thiserror::Error;

use common::template_types::{EmailTemplate, LocalizedTemplate};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("undefined placeholder `{0}` in template body")]
    UndefinedPlaceholder(String),
    #[error("template body is not valid base64: {0}")]
    InvalidEncoding(String),
    #[error("template body is not valid UTF-8")]
    InvalidUtf8,
}

pub type TemplateResult<T> = Result<T, TemplateError>;

/// Resolve a named template body against a parameter map.
///
/// `body` is scanned for `{{key}}` placeholders; every placeholder found
/// must have a matching entry in `params`, otherwise resolution fails
/// (`spec.md` §4.E: "undefined substitutions yield an error"). The engine
/// is pure and deterministic: the same `(name, body, params)` always
/// produces the same output, which lets callers cache by `name`.
///
/// `name` is accepted for API symmetry with the source's templating
/// interface (cache keying, logging) but does not affect resolution.
pub fn resolve_template(
    _name: &str,
    body: &str,
    params: &HashMap<String, String>,
) -> TemplateResult<String> {
    let mut output = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            // Unterminated placeholder marker: treat the rest as literal text.
            output.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let key = after_open[..end].trim();
        let value = params
            .get(key)
            .ok_or_else(|| TemplateError::UndefinedPlaceholder(key.to_string()))?;
        output.push_str(value);
        rest = &after_open[end + 2..];
    }
    output.push_str(rest);

    Ok(output)
}

/// Resolve the translation matching `lang`, falling back to
/// `template.default_language` (`spec.md` §4.E `GetTemplateTranslation`).
pub fn get_template_translation<'a>(
    template: &'a EmailTemplate,
    lang: &str,
) -> Option<&'a LocalizedTemplate> {
    template.translation_for(lang)
}

/// Decode a base64-encoded template body into UTF-8 text.
pub fn decode_template_body(template_def: &str) -> TemplateResult<String> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(template_def)
        .map_err(|e| TemplateError::InvalidEncoding(e.to_string()))?;
    String::from_utf8(bytes).map_err(|_| TemplateError::InvalidUtf8)
}

/// Post-process HTML-only markers for WhatsApp's plain-text rendering:
/// `<br>`/`<br/>` become newlines, `<p>`/`</p>` are stripped
/// (`original_source`'s `SendNotificationToPreferredChannels` WhatsApp
/// branch).
pub fn strip_html_markers_for_whatsapp(text: &str) -> String {
    text.replace("<br/>", "\n")
        .replace("<br>", "\n")
        .replace("</p>", "\n")
        .replace("<p>", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_placeholders() {
        let body = "Hello {{name}}, your code is {{code}}.";
        let rendered =
            resolve_template("greeting", body, &params(&[("name", "Ana"), ("code", "123456")]))
                .unwrap();
        assert_eq!(rendered, "Hello Ana, your code is 123456.");
    }

    #[test]
    fn undefined_placeholder_errors() {
        let body = "Hello {{name}}";
        let err = resolve_template("greeting", body, &params(&[])).unwrap_err();
        assert_eq!(err, TemplateError::UndefinedPlaceholder("name".to_string()));
    }

    #[test]
    fn no_placeholders_returns_body_unchanged() {
        let rendered = resolve_template("plain", "just text", &params(&[])).unwrap();
        assert_eq!(rendered, "just text");
    }

    #[test]
    fn html_markers_become_newlines_or_are_stripped() {
        let input = "<p>Line one<br>Line two<br/>Line three</p>";
        assert_eq!(strip_html_markers_for_whatsapp(input), "Line one\nLine two\nLine three\n");
    }

    #[test]
    fn decodes_base64_body() {
        let encoded = "SGVsbG8gd29ybGQ=";
        assert_eq!(decode_template_body(encoded).unwrap(), "Hello world");
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(decode_template_body("not-base64!!").is_err());
    }

    #[test]
    fn translation_falls_back_to_default_language() {
        let template = EmailTemplate {
            message_type: "welcome".into(),
            study_key: String::new(),
            default_language: "en".into(),
            header_overrides: Default::default(),
            translations: vec![LocalizedTemplate {
                lang: "en".into(),
                subject: "Welcome".into(),
                template_def: "".into(),
            }],
        };
        let translation = get_template_translation(&template, "fr").unwrap();
        assert_eq!(translation.lang, "en");
    }
}
