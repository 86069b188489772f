use serde::{Deserialize, Serialize};

/// A localized rendition of a template body (`spec.md` §3 `EmailTemplate.translations`).
///
/// `template_def` is base64-encoded, as the source stores it; callers decode
/// before handing the body to the template engine (`spec.md` §4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizedTemplate {
    pub lang: String,
    pub subject: String,
    pub template_def: String,
}

/// Header overrides applied to outgoing email (carried from
/// `original_source`'s `types.HeaderOverrides`; `spec.md` references this
/// indirectly via `QueueEmailTemplateForSending`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderOverrides {
    pub from: String,
    pub sender: String,
    pub reply_to: Vec<String>,
    pub no_reply_to: bool,
}

/// A named, multi-language message template (`spec.md` §3 `EmailTemplate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub message_type: String,
    pub study_key: String,
    pub default_language: String,
    pub header_overrides: HeaderOverrides,
    pub translations: Vec<LocalizedTemplate>,
}

impl EmailTemplate {
    /// Resolve the translation matching `lang`, falling back to the
    /// template's `default_language` (`spec.md` §4.E `GetTemplateTranslation`).
    pub fn translation_for(&self, lang: &str) -> Option<&LocalizedTemplate> {
        self.translations
            .iter()
            .find(|t| t.lang == lang)
            .or_else(|| {
                self.translations
                    .iter()
                    .find(|t| t.lang == self.default_language)
            })
    }
}

/// A queued outgoing email row, the sibling of `OutgoingWhatsApp` for the
/// email channel (grounded in `original_source`'s `types.OutgoingEmail`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub message_type: String,
    pub to: Vec<String>,
    pub header_overrides: HeaderOverrides,
    pub subject: String,
    pub content: String,
    pub high_prio: bool,
}
