//! Document attribute lookups.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded body of `GET /v2/{account}/documents/{id}?expand=AttributeGroups`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentAttributes {
    /// Document name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Canonical document reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Attribute groups keyed by group name; the nesting is server-defined.
    #[serde(default)]
    pub attribute_groups: Map<String, Value>,
    /// Every other field of the response.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocumentAttributes {
    /// Look up `group.field` in the attribute groups, returning the
    /// attribute's `Value` entry when the server wraps it in an object.
    pub fn attribute(&self, group: &str, field: &str) -> Option<&Value> {
        let attr = self.attribute_groups.get(group)?.get(field)?;
        Some(attr.get("Value").unwrap_or(attr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "Name": "Offer.docx",
        "Href": "https://api/v2/acc/documents/d1",
        "CreatedDate": "2025-01-01T00:00:00Z",
        "AttributeGroups": {
            "Contract": {
                "Owner": { "AttributeType": "String", "Value": "Legal" },
                "Flat": 3
            }
        }
    }"#;

    #[test]
    fn decodes_nested_groups() {
        let doc: DocumentAttributes = serde_json::from_str(BODY).unwrap();
        assert_eq!(doc.name.as_deref(), Some("Offer.docx"));
        assert_eq!(doc.attribute("Contract", "Owner"), Some(&Value::from("Legal")));
        assert_eq!(doc.attribute("Contract", "Flat"), Some(&Value::from(3)));
        assert!(doc.attribute("Contract", "Missing").is_none());
        assert!(doc.attribute("Other", "Owner").is_none());
        assert_eq!(doc.extra["CreatedDate"], "2025-01-01T00:00:00Z");
    }

    #[test]
    fn missing_groups_default_to_empty() {
        let doc: DocumentAttributes = serde_json::from_str(r#"{"Name":"x"}"#).unwrap();
        assert!(doc.attribute_groups.is_empty());
    }
}
