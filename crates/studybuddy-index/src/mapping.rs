//! Index definition inferred from the corpus shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{DocumentChunk, VECTOR_SUFFIX};

pub const ID_FIELD: &str = "doc_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldMapping {
    Keyword,
    Text,
    DenseVector {
        dims: usize,
        index: bool,
        similarity: String,
    },
    #[serde(other)]
    Other,
}

impl FieldMapping {
    #[must_use]
    pub fn cosine_vector(dims: usize) -> Self {
        Self::DenseVector {
            dims,
            index: true,
            similarity: "cosine".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MappingMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mappings {
    #[serde(rename = "_meta", default)]
    pub meta: MappingMeta,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 0,
        }
    }
}

/// Body of the index-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub settings: IndexSettings,
    pub mappings: Mappings,
}

impl IndexDefinition {
    /// Dimension shared by the dense-vector fields, if any are mapped.
    #[must_use]
    pub fn info(&self) -> IndexInfo {
        self.mappings.info()
    }
}

/// What a retriever needs to know about an existing index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexInfo {
    pub dims: Option<usize>,
    pub embedding_model: Option<String>,
}

impl Mappings {
    #[must_use]
    pub fn info(&self) -> IndexInfo {
        let dims = self.properties.values().find_map(|m| match m {
            FieldMapping::DenseVector { dims, .. } => Some(*dims),
            _ => None,
        });
        IndexInfo {
            dims,
            embedding_model: self.meta.embedding_model.clone(),
        }
    }
}

/// Identifier becomes `keyword`, `*_vec` fields become cosine `dense_vector`
/// of `dims`, every other attribute is `text`.
#[must_use]
pub fn infer_field_mappings<'a>(
    fields: impl IntoIterator<Item = &'a str>,
    dims: usize,
) -> BTreeMap<String, FieldMapping> {
    fields
        .into_iter()
        .map(|name| {
            let mapping = if name == ID_FIELD {
                FieldMapping::Keyword
            } else if name.ends_with(VECTOR_SUFFIX) {
                FieldMapping::cosine_vector(dims)
            } else {
                FieldMapping::Text
            };
            (name.to_owned(), mapping)
        })
        .collect()
}

/// Build the full index definition for a set of chunks. Optional attributes
/// are mapped only when at least one chunk carries them.
///
/// # Errors
///
/// Returns an error if a chunk cannot be serialized.
pub fn infer_mapping(
    chunks: &[DocumentChunk],
    dims: usize,
    embedding_model: Option<&str>,
) -> Result<IndexDefinition, serde_json::Error> {
    let mut names = std::collections::BTreeSet::new();
    for chunk in chunks {
        if let serde_json::Value::Object(map) = serde_json::to_value(chunk)? {
            names.extend(map.into_iter().map(|(k, _)| k));
        }
    }
    Ok(IndexDefinition {
        settings: IndexSettings::default(),
        mappings: Mappings {
            meta: MappingMeta {
                embedding_model: embedding_model.map(str::to_owned),
            },
            properties: infer_field_mappings(names.iter().map(String::as_str), dims),
        },
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn chunk(document: Option<&str>) -> DocumentChunk {
        DocumentChunk {
            doc_id: "1".into(),
            header: "h".into(),
            subheader: "s".into(),
            doc_text: "t".into(),
            document: document.map(Into::into),
            header_vec: vec![0.0; 3],
            subheader_vec: vec![0.0; 3],
            doc_text_vec: vec![0.0; 3],
        }
    }

    #[test]
    fn infers_keyword_text_and_vectors() {
        let def = infer_mapping(&[chunk(Some("az900.pdf"))], 384, Some("minilm")).unwrap();
        let body = serde_json::to_value(&def).unwrap();

        assert_eq!(
            body["settings"],
            json!({"number_of_shards": 1, "number_of_replicas": 0})
        );
        let props = &body["mappings"]["properties"];
        assert_eq!(props["doc_id"], json!({"type": "keyword"}));
        assert_eq!(props["header"], json!({"type": "text"}));
        assert_eq!(props["document"], json!({"type": "text"}));
        assert_eq!(
            props["doc_text_vec"],
            json!({"type": "dense_vector", "dims": 384, "index": true, "similarity": "cosine"})
        );
        assert_eq!(body["mappings"]["_meta"]["embedding_model"], "minilm");
    }

    #[test]
    fn optional_document_is_mapped_only_when_present() {
        let def = infer_mapping(&[chunk(None)], 3, None).unwrap();
        assert!(!def.mappings.properties.contains_key("document"));
        assert_eq!(def.mappings.properties.len(), 7);
    }

    #[test]
    fn info_reads_dims_and_model() {
        let def = infer_mapping(&[chunk(None)], 3, Some("m")).unwrap();
        assert_eq!(
            def.info(),
            IndexInfo {
                dims: Some(3),
                embedding_model: Some("m".into()),
            }
        );
    }

    #[test]
    fn unknown_field_types_deserialize_as_other() {
        let m: Mappings = serde_json::from_value(json!({
            "properties": {
                "count": {"type": "long"},
                "header": {"type": "text", "fields": {"raw": {"type": "keyword"}}}
            }
        }))
        .unwrap();
        assert_eq!(m.properties["count"], FieldMapping::Other);
        assert_eq!(m.properties["header"], FieldMapping::Text);
        assert_eq!(m.info().dims, None);
    }
}
