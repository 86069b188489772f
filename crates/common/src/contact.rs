use serde::{Deserialize, Serialize};

/// A delivery channel a user can be reached on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Whatsapp,
}

/// Contact preferences as consumed from the user service (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactPreferences {
    pub preferred_channels: Vec<Channel>,
    pub subscribed_to_whatsapp: bool,
    pub whatsapp_number: String,
}

impl ContactPreferences {
    /// Channels to use, defaulting to email when the user has not set a
    /// preference (`spec.md` §4.H step 2).
    pub fn channels_or_default(&self) -> Vec<Channel> {
        if self.preferred_channels.is_empty() {
            vec![Channel::Email]
        } else {
            self.preferred_channels.clone()
        }
    }

    pub fn has_whatsapp_number(&self) -> bool {
        self.subscribed_to_whatsapp && !self.whatsapp_number.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_preferences_default_to_email() {
        let prefs = ContactPreferences {
            preferred_channels: vec![],
            subscribed_to_whatsapp: false,
            whatsapp_number: String::new(),
        };
        assert_eq!(prefs.channels_or_default(), vec![Channel::Email]);
    }

    #[test]
    fn whatsapp_requires_subscription_and_number() {
        let mut prefs = ContactPreferences {
            preferred_channels: vec![Channel::Whatsapp],
            subscribed_to_whatsapp: true,
            whatsapp_number: String::new(),
        };
        assert!(!prefs.has_whatsapp_number());
        prefs.whatsapp_number = "+15551234567".to_string();
        assert!(prefs.has_whatsapp_number());
        prefs.subscribed_to_whatsapp = false;
        assert!(!prefs.has_whatsapp_number());
    }
}
