use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::BTreeMap;

/// Response code with its text per language
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct ErrorMessage {
    pub code: i32,
    pub messages: Json<BTreeMap<String, String>>,
}

impl ErrorMessage {
    /// Text in `lang`, then English, then any language
    pub fn text(&self, lang: &str) -> Option<&str> {
        self.messages
            .get(lang)
            .or_else(|| self.messages.get("en"))
            .or_else(|| self.messages.values().next())
            .map(String::as_str)
    }
}

/// Body of `PUT /backoffice/errors/:code`; languages are merged into the stored ones
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessageRequest {
    pub messages: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_falls_back_to_english() {
        let message = ErrorMessage {
            code: -4,
            messages: Json(BTreeMap::from([
                ("en".to_string(), "No data found".to_string()),
                ("fr".to_string(), "Aucune donnée".to_string()),
            ])),
        };
        assert_eq!(message.text("fr"), Some("Aucune donnée"));
        assert_eq!(message.text("de"), Some("No data found"));
    }
}
