use std::borrow::Cow;

use crate::error::ParseError;
use crate::model::PublicationAttributes;

use super::xml::{self, Node};

const LAST_PUBLICATION_PATH: [&str; 4] = [
    "ObjectMetadata",
    "OutputChannels",
    "DIFTcom",
    "DIFTcomLastPublication",
];
const INITIAL_PUBLICATION_PATH: [&str; 4] = [
    "ObjectMetadata",
    "OutputChannels",
    "DIFTcom",
    "DIFTcomInitialPublication",
];

/// Parse the publication timestamps out of the native attributes fragment.
///
/// The fragment may still carry JSON string escapes (`\"`, `\n`). When it
/// has escaped quotes or newlines and no raw quote, it is decoded as the body
/// of a JSON string literal first; otherwise it is used verbatim. Missing
/// timestamps come back empty and are rejected by the assembler.
pub fn parse(source: &str) -> Result<PublicationAttributes, ParseError> {
    let document = unquote(source)?;
    let mut attributes = PublicationAttributes::default();
    xml::walk(document.as_bytes(), |path, node| {
        if let Node::Text(text) = node {
            if xml::path_is(path, &LAST_PUBLICATION_PATH) {
                attributes.last_publication.push_str(text);
            } else if xml::path_is(path, &INITIAL_PUBLICATION_PATH) {
                attributes.initial_publication.push_str(text);
            }
        }
        Ok(())
    })
    .map_err(|err| ParseError::AttributesSyntax(err.to_string()))?;
    Ok(attributes)
}

fn unquote(source: &str) -> Result<Cow<'_, str>, ParseError> {
    if !looks_escaped(source) {
        return Ok(Cow::Borrowed(source));
    }
    let mut literal = String::with_capacity(source.len() + 2);
    literal.push('"');
    for c in source.chars() {
        // Raw control characters are not allowed inside a JSON string.
        match c {
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c => literal.push(c),
        }
    }
    literal.push('"');
    serde_json::from_str::<String>(&literal)
        .map(Cow::Owned)
        .map_err(|err| ParseError::AttributesSyntax(format!("malformed quoting: {err}")))
}

/// True when the fragment carries `\"` or `\n` escapes and no raw quote.
fn looks_escaped(source: &str) -> bool {
    let mut escapes = false;
    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return false,
            '\\' => match chars.next() {
                Some('"') | Some('n') => escapes = true,
                _ => {}
            },
            _ => {}
        }
    }
    escapes
}
