//! Opaque page tokens.
//!
//! A token is the base64 of a small JSON document naming the last entity of
//! the previous page. Entities are always served in `(type, key)` order, so
//! the next page starts strictly after that entity.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use netgraph_types::TypeAndKey;
use serde::{Deserialize, Serialize};

use crate::{StorageError, StorageResult};

#[derive(Debug, Serialize, Deserialize)]
struct PageToken {
    last_included_entity: TypeAndKey,
}

pub(crate) fn encode_page_token(last: &TypeAndKey) -> StorageResult<String> {
    let token = PageToken {
        last_included_entity: last.clone(),
    };
    let json = serde_json::to_vec(&token).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

/// `None` for the empty (first page) token.
pub(crate) fn decode_page_token(token: &str) -> StorageResult<Option<TypeAndKey>> {
    if token.is_empty() {
        return Ok(None);
    }
    let json = STANDARD
        .decode(token)
        .map_err(|e| StorageError::InvalidInput(format!("malformed page token: {}", e)))?;
    let token: PageToken = serde_json::from_slice(&json)
        .map_err(|e| StorageError::InvalidInput(format!("malformed page token: {}", e)))?;
    Ok(Some(token.last_included_entity))
}
