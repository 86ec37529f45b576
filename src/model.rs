use serde::{Deserialize, Serialize};

/// Inbound CMS envelope after JSON decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeContent {
    pub source_id: String,
    pub kind: String,
    /// Base64-encoded article XML.
    pub value: String,
    /// Escaped `ObjectMetadata` XML fragment.
    pub attributes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawImageRef {
    pub file_reference: String,
}

/// One `image-set` element from the article body, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawImageSet {
    pub id: String,
    pub small: RawImageRef,
    pub medium: RawImageRef,
    pub large: RawImageRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicationAttributes {
    pub last_publication: String,
    pub initial_publication: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub authority: String,
    pub identifier_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_display_width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_display_width: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageSet {
    pub uuid: String,
    pub identifiers: Vec<Identifier>,
    pub members: Vec<Member>,
    pub publish_reference: String,
    pub last_modified: String,
    pub published_date: String,
    pub first_published_date: String,
    pub can_be_distributed: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_omits_absent_display_widths() {
        let member = Member {
            uuid: "41614f4c-13c5-11e7-9469-afea892e4de3".into(),
            max_display_width: None,
            min_display_width: Some("980px".into()),
        };
        let value = serde_json::to_value(&member).unwrap();
        assert_eq!(value["minDisplayWidth"], "980px");
        assert!(value.get("maxDisplayWidth").is_none());
    }

    #[test]
    fn image_set_uses_wire_field_names() {
        let set = ImageSet {
            uuid: "u".into(),
            identifiers: vec![Identifier {
                authority: "a".into(),
                identifier_value: "u".into(),
            }],
            members: vec![],
            publish_reference: "tid_1".into(),
            last_modified: "lm".into(),
            published_date: "pd".into(),
            first_published_date: "fpd".into(),
            can_be_distributed: "yes".into(),
            kind: "ImageSet".into(),
        };
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["identifiers"][0]["identifierValue"], "u");
        assert_eq!(value["publishReference"], "tid_1");
        assert_eq!(value["firstPublishedDate"], "fpd");
        assert_eq!(value["canBeDistributed"], "yes");
        assert_eq!(value["type"], "ImageSet");
        assert_eq!(value["members"], serde_json::json!([]));
    }
}
