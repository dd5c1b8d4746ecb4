//! Multilingual query expansion.
//!
//! Produces the original question plus model-generated English and
//! Norwegian phrasings to widen recall across a mixed-language corpus. The
//! model is asked for a minimal JSON object; the response goes through a
//! typed decode that fails closed — any call error, missing key, or blank
//! value falls back to the original question for that variant, and a total
//! failure yields the original alone. Expansion is never fatal to answering.

use serde::Deserialize;
use tracing::debug;

use crate::chat::ChatProvider;

const TRANSLATION_INSTRUCTION: &str = "Translate the user query into both English and Norwegian.\n\
Return ONLY this exact JSON object with double quotes and no extra text:\n\
{\"en\": \"<english>\", \"no\": \"<norwegian>\"}";

#[derive(Debug, Deserialize)]
struct Translations {
    #[serde(default)]
    en: Option<String>,
    #[serde(default)]
    no: Option<String>,
}

/// Expand a question into an ordered, deduplicated set of phrasings.
pub async fn expand_query(chat: &dyn ChatProvider, original: &str) -> Vec<String> {
    let prompt = format!("{}\nUser: {}", TRANSLATION_INSTRUCTION, original);

    let variants = match chat.complete(&prompt).await {
        Ok(raw) => match decode_translations(&raw) {
            Some(t) => vec![
                original.to_string(),
                non_blank_or(t.en, original),
                non_blank_or(t.no, original),
            ],
            None => {
                debug!("translation response did not decode; using original query only");
                vec![original.to_string()]
            }
        },
        Err(e) => {
            debug!(error = %e, "query expansion failed; using original query only");
            vec![original.to_string()]
        }
    };

    let mut deduped = Vec::new();
    for v in variants {
        if !deduped.contains(&v) {
            deduped.push(v);
        }
    }
    deduped
}

fn non_blank_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback.to_string(),
    }
}

/// Decode the expected `{"en": ..., "no": ...}` object from the model's
/// output. Tolerates surrounding prose by locating the outermost braces,
/// but the object itself must parse — no quote scanning.
fn decode_translations(raw: &str) -> Option<Translations> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct CannedChat(Result<String, String>);

    #[async_trait]
    impl ChatProvider for CannedChat {
        fn model_name(&self) -> &str {
            "canned"
        }
        async fn complete(&self, _prompt: &str) -> Result<String> {
            match &self.0 {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(anyhow::anyhow!(e.clone())),
            }
        }
    }

    #[tokio::test]
    async fn test_clean_json_yields_three_variants() {
        let chat = CannedChat(Ok(
            r#"{"en": "where do you work", "no": "hvor jobber du"}"#.to_string()
        ));
        let variants = expand_query(&chat, "où travailles-tu").await;
        assert_eq!(
            variants,
            vec![
                "où travailles-tu".to_string(),
                "where do you work".to_string(),
                "hvor jobber du".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_noisy_response_still_decodes() {
        let chat = CannedChat(Ok(
            "Sure! Here is the JSON you asked for:\n{\"en\": \"hello\", \"no\": \"hei\"}\nHope that helps."
                .to_string(),
        ));
        let variants = expand_query(&chat, "bonjour").await;
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[1], "hello");
        assert_eq!(variants[2], "hei");
    }

    #[tokio::test]
    async fn test_blank_value_falls_back_per_language() {
        let chat = CannedChat(Ok(r#"{"en": "  ", "no": "hei"}"#.to_string()));
        let variants = expand_query(&chat, "salut").await;
        // blank en collapses into the original, deduplicated
        assert_eq!(variants, vec!["salut".to_string(), "hei".to_string()]);
    }

    #[tokio::test]
    async fn test_garbage_fails_closed_to_original() {
        let chat = CannedChat(Ok("en: hello, no: hei".to_string()));
        let variants = expand_query(&chat, "hola").await;
        assert_eq!(variants, vec!["hola".to_string()]);
    }

    #[tokio::test]
    async fn test_call_error_fails_closed_to_original() {
        let chat = CannedChat(Err("model unavailable".to_string()));
        let variants = expand_query(&chat, "hola").await;
        assert_eq!(variants, vec!["hola".to_string()]);
    }

    #[tokio::test]
    async fn test_identical_translation_deduplicates() {
        let chat = CannedChat(Ok(r#"{"en": "hello", "no": "hello"}"#.to_string()));
        let variants = expand_query(&chat, "hello").await;
        assert_eq!(variants, vec!["hello".to_string()]);
    }
}
