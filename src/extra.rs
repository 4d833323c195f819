//! Extra headers: the JSON block carried by v3 records.
//!
//! The text is kept exactly as read so an untouched record re-serializes
//! byte-identical. Values are addressed by JSON Pointer (RFC 6901), e.g.
//! `/FDSN/Time/Quality`. Any edit re-renders the whole document in compact
//! form.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{MseedError, Result};

/// Pointer of the v2 data quality indicator (`D`, `R`, `Q` or `M`).
pub const DATA_QUALITY: &str = "/FDSN/DataQuality";
/// Pointer of the v2 record sequence number.
pub const SEQUENCE: &str = "/FDSN/Sequence";
/// Pointer of the Blockette 1001 timing quality percentage.
pub const TIME_QUALITY: &str = "/FDSN/Time/Quality";

/// Verbatim extra-header text with pointer-based access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraHeaders {
    raw: String,
}

impl ExtraHeaders {
    /// Wrap header text without validating it.
    pub(crate) fn verbatim(raw: String) -> Self {
        Self { raw }
    }

    /// Parse header text, which must be empty or a JSON object.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::default();
        headers.replace(text)?;
        Ok(headers)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Length of the serialized text in bytes.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Replace the whole document.
    pub fn replace(&mut self, text: &str) -> Result<()> {
        if !text.is_empty() {
            let value: Value = serde_json::from_str(text)
                .map_err(|e| MseedError::Validation(format!("extra headers: {e}")))?;
            if !value.is_object() {
                return Err(MseedError::Validation(
                    "extra headers must be a JSON object".into(),
                ));
            }
        }
        self.raw = text.to_string();
        Ok(())
    }

    /// Parse the document into a JSON value; empty text is an empty object.
    pub fn to_value(&self) -> Result<Value> {
        if self.raw.is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(&self.raw)
            .map_err(|e| MseedError::Format(format!("malformed extra headers: {e}")))
    }

    /// Value at `pointer`, if present.
    pub fn get(&self, pointer: &str) -> Result<Option<Value>> {
        Ok(self.to_value()?.pointer(pointer).cloned())
    }

    /// Value at `pointer` deserialized as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, pointer: &str) -> Result<Option<T>> {
        self.get(pointer)?
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| MseedError::Validation(format!("extra header {pointer}: {e}")))
            })
            .transpose()
    }

    /// Set the value at `pointer`, creating intermediate objects.
    pub fn set<T: Serialize>(&mut self, pointer: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| MseedError::Validation(format!("extra header {pointer}: {e}")))?;
        let mut root = self.to_value()?;
        let tokens = pointer_tokens(pointer)?;
        let Some((last, parents)) = tokens.split_last() else {
            if !value.is_object() {
                return Err(MseedError::Validation(
                    "extra headers must be a JSON object".into(),
                ));
            }
            return self.store(&value);
        };

        let mut node = &mut root;
        for token in parents {
            let map = object_mut(node, pointer)?;
            node = map
                .entry(token.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        object_mut(node, pointer)?.insert(last.clone(), value);
        self.store(&root)
    }

    /// Remove the value at `pointer`, returning it.
    ///
    /// Objects left empty by the removal are pruned, and an empty document
    /// collapses to no extra headers at all.
    pub fn remove(&mut self, pointer: &str) -> Result<Option<Value>> {
        let mut root = self.to_value()?;
        let tokens = pointer_tokens(pointer)?;
        let Some((last, parents)) = tokens.split_last() else {
            let old = std::mem::take(&mut self.raw);
            return Ok((!old.is_empty()).then_some(root));
        };

        let removed = remove_path(&mut root, parents, last);
        if removed.is_some() {
            self.store(&root)?;
        }
        Ok(removed)
    }

    fn store(&mut self, root: &Value) -> Result<()> {
        self.raw = match root {
            Value::Object(map) if map.is_empty() => String::new(),
            other => serde_json::to_string(other)
                .map_err(|e| MseedError::Validation(format!("extra headers: {e}")))?,
        };
        Ok(())
    }
}

impl fmt::Display for ExtraHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn remove_path(node: &mut Value, parents: &[String], last: &str) -> Option<Value> {
    let map = node.as_object_mut()?;
    match parents.split_first() {
        None => map.remove(last),
        Some((head, rest)) => {
            let child = map.get_mut(head)?;
            let removed = remove_path(child, rest, last);
            if child.as_object().is_some_and(Map::is_empty) {
                map.remove(head);
            }
            removed
        }
    }
}

fn object_mut<'a>(node: &'a mut Value, pointer: &str) -> Result<&'a mut Map<String, Value>> {
    node.as_object_mut().ok_or_else(|| {
        MseedError::Validation(format!("extra header {pointer} crosses a non-object value"))
    })
}

fn pointer_tokens(pointer: &str) -> Result<Vec<String>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let Some(body) = pointer.strip_prefix('/') else {
        return Err(MseedError::Validation(format!(
            "JSON pointer {pointer:?} must start with '/'"
        )));
    };
    Ok(body
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verbatim_text_is_preserved() {
        let text = r#"{ "FDSN": {"Time": {"Quality": 80}},  "Z": 1 }"#;
        let headers = ExtraHeaders::parse(text).unwrap();
        assert_eq!(headers.as_str(), text);
        assert_eq!(headers.get_as::<u8>(TIME_QUALITY).unwrap(), Some(80));
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut headers = ExtraHeaders::default();
        headers.set(TIME_QUALITY, 100).unwrap();
        headers.set(SEQUENCE, 42).unwrap();
        assert_eq!(
            headers.to_value().unwrap(),
            json!({"FDSN": {"Sequence": 42, "Time": {"Quality": 100}}})
        );
    }

    #[test]
    fn test_remove_prunes_empty_objects() {
        let mut headers = ExtraHeaders::parse(r#"{"FDSN":{"Time":{"Quality":5}}}"#).unwrap();
        assert_eq!(headers.remove(TIME_QUALITY).unwrap(), Some(json!(5)));
        assert!(headers.is_empty());
        assert_eq!(headers.remove(TIME_QUALITY).unwrap(), None);
    }

    #[test]
    fn test_replace_rejects_non_objects() {
        let mut headers = ExtraHeaders::default();
        assert!(headers.replace("[1,2]").is_err());
        assert!(headers.replace("{not json").is_err());
        headers.replace(r#"{"a":"b"}"#).unwrap();
        assert_eq!(headers.get("/a").unwrap(), Some(json!("b")));
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut headers = ExtraHeaders::parse(r#"{"FDSN":3}"#).unwrap();
        assert!(matches!(
            headers.set(TIME_QUALITY, 1),
            Err(MseedError::Validation(_))
        ));
    }

    #[test]
    fn test_escaped_pointer_tokens() {
        let mut headers = ExtraHeaders::default();
        headers.set("/a~1b/c~0d", true).unwrap();
        assert_eq!(headers.as_str(), r#"{"a/b":{"c~d":true}}"#);
        assert_eq!(headers.get("/a~1b/c~0d").unwrap(), Some(json!(true)));
    }
}
