//! Request building and reply decoding for the translation backend.
//!
//! The client owns exactly one network call per invocation; retries are the
//! retry controller's concern.

use super::batch::BatchLine;
use super::Translator;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// A single chat-completion capability. Implementations issue one request
/// and hand back the raw reply text; they never retry.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat_complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Wrapper keys probed, in this order, when the backend wraps the reply
/// array in an object instead of returning it bare.
const WRAPPER_KEYS: [&str; 4] = ["translation", "translations", "subtitles", "translatedTexts"];

/// Serializes batches into chat requests and decodes replies into one
/// translated string per input line.
pub struct BatchClient<B> {
    backend: B,
}

impl<B: ChatBackend> BatchClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[derive(Serialize)]
struct RequestLine<'a> {
    index: u32,
    text: &'a str,
}

/// Instruction sent with every batch. It pins the target language, the
/// line-for-line contract and the machine-readable reply shape.
fn system_prompt(target_language: &str) -> String {
    format!(
        "You are a professional translator. Translate each subtitle line in the user \
         message into {target_language}. The lines are consecutive subtitles, so use the \
         surrounding lines as context, but keep a strict line-for-line correspondence: do \
         not merge, split, reorder or add content of your own. Reply with only a JSON \
         array holding one entry per input line, either as plain strings in input order \
         or as objects of the form {{\"index\": <input index>, \"text\": <translation>}}."
    )
}

#[async_trait]
impl<B: ChatBackend> Translator for BatchClient<B> {
    async fn translate_batch(
        &self,
        lines: &[BatchLine],
        target_language: &str,
    ) -> Result<Vec<String>> {
        let payload: Vec<RequestLine> = lines
            .iter()
            .map(|line| RequestLine {
                index: line.index,
                text: &line.text,
            })
            .collect();
        let user = serde_json::to_string(&payload)?;
        let raw = self
            .backend
            .chat_complete(&system_prompt(target_language), &user)
            .await?;
        let value: Value = serde_json::from_str(raw.trim())?;
        decode_reply(normalize(value), lines)
    }
}

/// Unwrap the reply shapes seen in the wild: a bare array is used as is, a
/// recognized wrapper object is unwrapped, anything else passes through so
/// the downstream shape check rejects it.
fn normalize(value: Value) -> Value {
    if value.is_array() {
        return value;
    }
    if let Value::Object(mut map) = value {
        for key in WRAPPER_KEYS {
            if let Some(inner) = map.remove(key) {
                return inner;
            }
        }
        return Value::Object(map);
    }
    value
}

/// Decode a normalized reply into one translated string per input line.
/// Plain strings are taken positionally; `{index, text}` objects are
/// re-correlated against the input indices.
fn decode_reply(value: Value, lines: &[BatchLine]) -> Result<Vec<String>> {
    let Value::Array(items) = value else {
        return Err(anyhow!("backend reply is not an array"));
    };
    let mut positional = Vec::with_capacity(items.len());
    let mut indexed = Vec::new();
    for item in &items {
        match item {
            Value::String(text) => positional.push(text.clone()),
            Value::Object(object) => {
                let index = object.get("index").and_then(Value::as_u64);
                let text = object
                    .get("text")
                    .or_else(|| object.get("content"))
                    .and_then(Value::as_str);
                match (index, text) {
                    (Some(index), Some(text)) => indexed.push((index as u32, text.to_string())),
                    (None, Some(text)) => positional.push(text.to_string()),
                    _ => return Err(anyhow!("unrecognized reply entry: {item}")),
                }
            }
            other => return Err(anyhow!("unrecognized reply entry: {other}")),
        }
    }
    if indexed.is_empty() {
        return Ok(positional);
    }
    if !positional.is_empty() {
        return Err(anyhow!("backend mixed plain and indexed reply entries"));
    }
    let mut by_index: HashMap<u32, String> = indexed.into_iter().collect();
    lines
        .iter()
        .map(|line| {
            by_index
                .remove(&line.index)
                .ok_or_else(|| anyhow!("reply is missing line {}", line.index))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lines(texts: &[&str]) -> Vec<BatchLine> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| BatchLine {
                index: i as u32 + 1,
                text: text.to_string(),
            })
            .collect()
    }

    #[test]
    fn normalizes_bare_array_and_known_wrappers() {
        let expected = json!(["a", "b"]);
        for value in [
            json!(["a", "b"]),
            json!({"translation": ["a", "b"]}),
            json!({"translations": ["a", "b"]}),
            json!({"subtitles": ["a", "b"]}),
            json!({"translatedTexts": ["a", "b"]}),
        ] {
            assert_eq!(normalize(value), expected);
        }
    }

    #[test]
    fn unknown_wrapper_passes_through_and_fails_decoding() {
        let value = normalize(json!({"result": ["a"]}));
        assert!(value.is_object());
        assert!(decode_reply(value, &lines(&["x"])).is_err());
    }

    #[test]
    fn decodes_plain_strings_positionally() {
        let out = decode_reply(json!(["uno", "dos"]), &lines(&["one", "two"])).unwrap();
        assert_eq!(out, vec!["uno", "dos"]);
    }

    #[test]
    fn correlates_indexed_objects_out_of_order() {
        let reply = json!([
            {"index": 2, "text": "dos"},
            {"index": 1, "text": "uno"},
        ]);
        let out = decode_reply(reply, &lines(&["one", "two"])).unwrap();
        assert_eq!(out, vec!["uno", "dos"]);
    }

    #[test]
    fn accepts_content_as_text_key() {
        let reply = json!([{"index": 1, "content": "uno"}]);
        let out = decode_reply(reply, &lines(&["one"])).unwrap();
        assert_eq!(out, vec!["uno"]);
    }

    #[test]
    fn rejects_missing_indexed_line() {
        let reply = json!([{"index": 5, "text": "uno"}]);
        assert!(decode_reply(reply, &lines(&["one"])).is_err());
    }

    #[test]
    fn rejects_mixed_entry_shapes() {
        let reply = json!(["uno", {"index": 2, "text": "dos"}]);
        assert!(decode_reply(reply, &lines(&["one", "two"])).is_err());
    }

    struct CannedBackend {
        reply: String,
    }

    #[async_trait]
    impl ChatBackend for CannedBackend {
        async fn chat_complete(&self, _system: &str, user: &str) -> Result<String> {
            // The payload must be the serialized lines, index included.
            let sent: Value = serde_json::from_str(user)?;
            assert_eq!(sent[0]["index"], 1);
            assert!(sent[0]["text"].is_string());
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn translates_a_batch_through_the_backend() {
        let client = BatchClient::new(CannedBackend {
            reply: r#"{"translations": ["hola", "mundo"]}"#.to_string(),
        });
        let out = client
            .translate_batch(&lines(&["hello", "world"]), "Spanish")
            .await
            .unwrap();
        assert_eq!(out, vec!["hola", "mundo"]);
    }

    #[tokio::test]
    async fn unparseable_reply_is_an_error_not_a_panic() {
        let client = BatchClient::new(CannedBackend {
            reply: "Sorry, I cannot help with that.".to_string(),
        });
        assert!(client
            .translate_batch(&lines(&["hello"]), "Spanish")
            .await
            .is_err());
    }
}
