use serde::{Deserialize, Serialize};

/// Text attributes searched lexically; each has a `<field>_vec` companion.
pub const TEXT_FIELDS: [&str; 3] = ["header", "subheader", "doc_text"];

/// Attributes returned for every hit.
pub const SOURCE_FIELDS: [&str; 5] = ["doc_id", "header", "subheader", "document", "doc_text"];

pub const VECTOR_SUFFIX: &str = "_vec";

/// One indexed chunk of the study guide, with a dense vector per text field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub doc_id: String,
    pub header: String,
    pub subheader: String,
    pub doc_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    pub header_vec: Vec<f32>,
    pub subheader_vec: Vec<f32>,
    pub doc_text_vec: Vec<f32>,
}

impl DocumentChunk {
    /// Text of a field listed in [`TEXT_FIELDS`].
    #[must_use]
    pub fn text(&self, field: &str) -> Option<&str> {
        match field {
            "header" => Some(&self.header),
            "subheader" => Some(&self.subheader),
            "doc_text" => Some(&self.doc_text),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_result(&self, score: f64) -> SearchResult {
        SearchResult {
            doc_id: self.doc_id.clone(),
            header: self.header.clone(),
            subheader: self.subheader.clone(),
            document: self.document.clone(),
            doc_text: self.doc_text.clone(),
            score,
        }
    }
}

/// A corpus row as read from disk. Vector fields may be absent and are then
/// computed at indexing time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CorpusRecord {
    #[serde(alias = "id")]
    pub doc_id: String,
    pub header: String,
    pub subheader: String,
    pub doc_text: String,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub header_vec: Option<Vec<f32>>,
    #[serde(default)]
    pub subheader_vec: Option<Vec<f32>>,
    #[serde(default)]
    pub doc_text_vec: Option<Vec<f32>>,
}

/// A ranked hit. `score` is the backend's combined score, kept for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub doc_id: String,
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub subheader: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default)]
    pub doc_text: String,
    #[serde(default)]
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_record_accepts_id_alias_and_missing_vectors() {
        let rec: CorpusRecord = serde_json::from_str(
            r#"{"id":"7","header":"Cloud Concepts","subheader":"IaaS","doc_text":"Rent hardware."}"#,
        )
        .unwrap();
        assert_eq!(rec.doc_id, "7");
        assert!(rec.header_vec.is_none());
        assert!(rec.document.is_none());
    }

    #[test]
    fn chunk_serialization_omits_absent_document() {
        let chunk = DocumentChunk {
            doc_id: "1".into(),
            header: "h".into(),
            subheader: "s".into(),
            doc_text: "t".into(),
            document: None,
            header_vec: vec![1.0],
            subheader_vec: vec![1.0],
            doc_text_vec: vec![1.0],
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json.get("document").is_none());
        assert_eq!(json["doc_text_vec"], serde_json::json!([1.0]));
    }

    #[test]
    fn text_accessor_covers_every_text_field() {
        let chunk = DocumentChunk {
            doc_id: "1".into(),
            header: "h".into(),
            subheader: "s".into(),
            doc_text: "t".into(),
            document: Some("guide.pdf".into()),
            header_vec: vec![],
            subheader_vec: vec![],
            doc_text_vec: vec![],
        };
        for field in TEXT_FIELDS {
            assert!(chunk.text(field).is_some(), "{field}");
        }
        assert!(chunk.text("doc_id").is_none());
        assert_eq!(chunk.to_result(2.5).document.as_deref(), Some("guide.pdf"));
    }
}
