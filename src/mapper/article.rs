use crate::error::ParseError;
use crate::model::RawImageSet;

use super::xml::{self, Node};

const BODY_PATH: [&str; 4] = ["doc", "story", "text", "body"];
const IMAGE_SET_PATH: [&str; 5] = ["doc", "story", "text", "body", "image-set"];

/// Extract the `image-set` elements sitting directly in `doc/story/text/body`,
/// in document order. Missing ids and `fileref`s come back empty.
pub fn parse(source: &[u8]) -> Result<Vec<RawImageSet>, ParseError> {
    let mut sets: Vec<RawImageSet> = Vec::new();
    xml::walk(source, |path, node| {
        let Node::Element(start) = node else {
            return Ok(());
        };
        let name = xml::name_of(start);
        if name == "image-set" && xml::path_is(path, &BODY_PATH) {
            sets.push(RawImageSet {
                id: xml::attribute(start, "id")?,
                ..Default::default()
            });
        } else if xml::path_is(path, &IMAGE_SET_PATH) {
            if let Some(current) = sets.last_mut() {
                let slot = match name.as_str() {
                    "image-small" => &mut current.small,
                    "image-medium" => &mut current.medium,
                    "image-large" => &mut current.large,
                    _ => return Ok(()),
                };
                slot.file_reference = xml::attribute(start, "fileref")?;
            }
        }
        Ok(())
    })
    .map_err(|err| ParseError::XmlSyntax(err.to_string()))?;
    Ok(sets)
}
