//! Registration document builder.
//!
//! Builds the portable identity-claim document the canonical registry
//! consumes: an ERC-8004 style registration file cross-referencing the
//! hub's chain id, registry contract, and token id. The builder is a
//! pure function of its inputs — the same record and context always
//! produce the same document, which is what makes re-submission after
//! an ambiguous failure safe.
//!
//! Documents are serialized to JSON and carried as a
//! `data:application/json;base64,...` URI. The encoding is invertible;
//! `decode_data_uri` round-trips exactly.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::hub::types::IdentityRecord;

/// Schema type constant for v1 registration documents.
pub const REGISTRATION_V1_TYPE: &str =
    "https://eips.ethereum.org/EIPS/eip-8004#registration-v1";

/// URI prefix for the base64 JSON carrier.
const DATA_URI_PREFIX: &str = "data:application/json;base64,";

/// A portable identity-claim document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationDocument {
    /// Schema type identifier.
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Agent display name.
    pub name: String,

    /// Natural language description of the agent.
    pub description: String,

    /// Agent image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Ordered service endpoints.
    pub services: Vec<ServiceEntry>,

    /// Cross-references into onchain registries.
    pub registrations: Vec<RegistryReference>,

    /// Whether the agent is currently active.
    pub active: bool,

    /// Whether the agent accepts x402 payments.
    #[serde(rename = "x402Support", skip_serializing_if = "Option::is_none")]
    pub x402_support: Option<bool>,
}

/// A named service endpoint in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Service name (e.g., "web", "A2A").
    pub name: String,
    /// Endpoint URL.
    pub endpoint: String,
}

/// Onchain registration cross-reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryReference {
    /// Token id in the source registry.
    #[serde(rename = "agentId")]
    pub agent_id: u64,

    /// Registry identifier: `eip155:<chainId>:<contract>`.
    #[serde(rename = "agentRegistry")]
    pub agent_registry: String,
}

/// Target chain id and contract address to embed in the document.
#[derive(Debug, Clone)]
pub struct CrossRefContext {
    /// EIP-155 chain id of the source registry.
    pub chain_id: u64,
    /// Source registry contract address, 0x-prefixed hex.
    pub registry_address: String,
}

impl CrossRefContext {
    /// CAIP-style registry identifier embedded in documents.
    pub fn registry_id(&self) -> String {
        format!("eip155:{}:{}", self.chain_id, self.registry_address)
    }
}

/// Build the registration document for one identity record.
///
/// Pure and deterministic: no network, no signing, no clock.
pub fn build_document(record: &IdentityRecord, ctx: &CrossRefContext) -> RegistrationDocument {
    let description = if record.framework.is_empty() {
        format!("Autonomous agent {}", record.name)
    } else {
        format!("Autonomous agent {} ({})", record.name, record.framework)
    };

    RegistrationDocument {
        schema_type: REGISTRATION_V1_TYPE.to_string(),
        name: record.name.clone(),
        description,
        image: None,
        services: vec![ServiceEntry {
            name: "agent".to_string(),
            endpoint: record.agent_address.clone(),
        }],
        registrations: vec![RegistryReference {
            agent_id: record.token_id,
            agent_registry: ctx.registry_id(),
        }],
        active: true,
        x402_support: None,
    }
}

/// Serialize a document and wrap it as a base64 data URI.
pub fn to_data_uri(document: &RegistrationDocument) -> String {
    let json = serde_json::to_string(document).expect("document serialization cannot fail");
    format!("{DATA_URI_PREFIX}{}", BASE64.encode(json.as_bytes()))
}

/// Decode a data URI back into a document. Exact inverse of
/// [`to_data_uri`] for documents this crate produced.
pub fn decode_data_uri(uri: &str) -> Result<RegistrationDocument, DocumentError> {
    let payload = uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or(DocumentError::NotADataUri)?;
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| DocumentError::Base64(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(DocumentError::Json)
}

/// Document encode/decode errors.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("not a data:application/json;base64 URI")]
    NotADataUri,
    #[error("invalid base64 payload: {0}")]
    Base64(String),
    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(token_id: u64, name: &str) -> IdentityRecord {
        IdentityRecord {
            token_id,
            name: name.to_string(),
            framework: "eliza".to_string(),
            agent_address: "0x00000000000000000000000000000000000000aa".to_string(),
        }
    }

    fn ctx() -> CrossRefContext {
        CrossRefContext {
            chain_id: 8453,
            registry_address: "0x1111111111111111111111111111111111111111".to_string(),
        }
    }

    #[test]
    fn document_embeds_cross_reference() {
        let doc = build_document(&record(42, "scout"), &ctx());
        assert_eq!(doc.schema_type, REGISTRATION_V1_TYPE);
        assert_eq!(doc.registrations.len(), 1);
        assert_eq!(doc.registrations[0].agent_id, 42);
        assert_eq!(
            doc.registrations[0].agent_registry,
            "eip155:8453:0x1111111111111111111111111111111111111111"
        );
        assert!(doc.active);
    }

    #[test]
    fn builder_is_deterministic() {
        let a = build_document(&record(7, "scout"), &ctx());
        let b = build_document(&record(7, "scout"), &ctx());
        assert_eq!(a, b);
        assert_eq!(to_data_uri(&a), to_data_uri(&b));
    }

    #[test]
    fn data_uri_round_trips_exactly() {
        let doc = build_document(&record(9, "harvester"), &ctx());
        let uri = to_data_uri(&doc);
        assert!(uri.starts_with("data:application/json;base64,"));

        let decoded = decode_data_uri(&uri).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn decoded_json_matches_wire_field_names() {
        let doc = build_document(&record(3, "scout"), &ctx());
        let uri = to_data_uri(&doc);
        let payload = uri.strip_prefix(DATA_URI_PREFIX).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&BASE64.decode(payload).unwrap()).unwrap();

        assert_eq!(json["type"], REGISTRATION_V1_TYPE);
        assert_eq!(json["registrations"][0]["agentId"], 3);
        assert_eq!(json["active"], true);
        // Unset optionals are omitted, not nulled.
        assert!(json.get("image").is_none());
        assert!(json.get("x402Support").is_none());
    }

    #[test]
    fn decode_rejects_foreign_uris() {
        assert!(matches!(
            decode_data_uri("https://example.com/card.json"),
            Err(DocumentError::NotADataUri)
        ));
        assert!(matches!(
            decode_data_uri("data:application/json;base64,!!!"),
            Err(DocumentError::Base64(_))
        ));
    }
}
