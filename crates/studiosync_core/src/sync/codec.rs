//! Document <-> entity codec helpers.
//!
//! The store keeps the document id as the map key; entities carry it as a
//! regular `id` field. Encoding strips the field, decoding injects it.

use crate::store::{Collection, Document, JsonMap};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Generates a fresh store document id.
pub(crate) fn new_doc_id() -> String {
    Uuid::new_v4().to_string()
}

/// Serializes an entity into a document body, without the `id` field.
pub(crate) fn encode_body<T: Serialize>(
    collection: Collection,
    entity: &T,
) -> Result<JsonMap, String> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(mut body)) => {
            body.remove("id");
            Ok(body)
        }
        Ok(_) => Err(format!("{collection} entity did not serialize to an object")),
        Err(err) => Err(format!("{collection} entity failed to serialize: {err}")),
    }
}

/// Deserializes one document into an entity, injecting the id.
pub(crate) fn decode_document<T: DeserializeOwned>(
    document: &Document,
) -> Result<T, serde_json::Error> {
    let mut fields = document.fields.clone();
    fields.insert("id".to_string(), Value::String(document.id.clone()));
    serde_json::from_value(Value::Object(fields))
}

/// Decodes a full snapshot, skipping documents that fail to decode.
///
/// A malformed document must not poison the whole materialized set; it is
/// logged and dropped from the cache until repaired.
pub(crate) fn decode_snapshot<T: DeserializeOwned>(
    collection: Collection,
    documents: &[Document],
) -> Vec<T> {
    let mut rows = Vec::with_capacity(documents.len());
    for document in documents {
        match decode_document(document) {
            Ok(row) => rows.push(row),
            Err(err) => warn!(
                "event=snapshot_decode module=sync status=skip collection={} doc_id={} error={}",
                collection, document.id, err
            ),
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::{decode_document, decode_snapshot, encode_body};
    use crate::model::guardian::Guardian;
    use crate::store::{Collection, Document, JsonMap};
    use serde_json::json;

    #[test]
    fn encode_strips_id_and_decode_injects_it() {
        let guardian = Guardian::with_id("uid-1", "Sato", "sato@example.com");
        let body = encode_body(Collection::Guardians, &guardian).unwrap();
        assert!(!body.contains_key("id"));

        let decoded: Guardian = decode_document(&Document {
            id: "uid-1".to_string(),
            fields: body,
        })
        .unwrap();
        assert_eq!(decoded, guardian);
    }

    #[test]
    fn decode_snapshot_skips_malformed_documents() {
        let good = Guardian::with_id("uid-1", "Sato", "sato@example.com");
        let mut bad_fields = JsonMap::new();
        bad_fields.insert("name".to_string(), json!(42));

        let documents = vec![
            Document {
                id: "uid-1".to_string(),
                fields: encode_body(Collection::Guardians, &good).unwrap(),
            },
            Document {
                id: "uid-2".to_string(),
                fields: bad_fields,
            },
        ];

        let rows: Vec<Guardian> = decode_snapshot(Collection::Guardians, &documents);
        assert_eq!(rows, vec![good]);
    }
}
