//! Opaque mconfig messages.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{MconfigError, Result};

/// Output of synthesis: config key to message. Ordered, so the encoded
/// bundle is deterministic.
pub type MconfigMap = BTreeMap<String, AnyMessage>;

/// A typed message packed as bytes, tagged with the URL of its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyMessage {
    pub type_url: String,
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
}

impl AnyMessage {
    pub fn pack<T: Serialize>(type_url: impl Into<String>, message: &T) -> Result<Self> {
        let type_url = type_url.into();
        let value = serde_json::to_vec(message)
            .map_err(|e| MconfigError::Marshal(format!("pack {}: {}", type_url, e)))?;
        Ok(Self { type_url, value })
    }

    pub fn unpack<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.value)
            .map_err(|e| MconfigError::Marshal(format!("unpack {}: {}", self.type_url, e)))
    }

    pub fn is(&self, type_url: &str) -> bool {
        self.type_url == type_url
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Magmad {
        checkin_interval: u32,
        log_level: String,
    }

    #[test]
    fn pack_unpack() {
        let msg = Magmad {
            checkin_interval: 60,
            log_level: "INFO".into(),
        };
        let any = AnyMessage::pack("type.netgraph/mconfig.Magmad", &msg).unwrap();
        assert!(any.is("type.netgraph/mconfig.Magmad"));
        assert_eq!(any.unpack::<Magmad>().unwrap(), msg);
        assert!(matches!(any.unpack::<Vec<u8>>(), Err(MconfigError::Marshal(_))));
    }

    #[test]
    fn value_is_base64_on_the_wire() {
        let any = AnyMessage {
            type_url: "t".into(),
            value: b"{}".to_vec(),
        };
        let json = serde_json::to_string(&any).unwrap();
        assert_eq!(json, r#"{"type_url":"t","value":"e30="}"#);
        let back: AnyMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, any);
    }
}
