use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum XmlError {
    #[error(transparent)]
    Syntax(#[from] quick_xml::Error),
    #[error(transparent)]
    Attribute(#[from] AttrError),
    #[error("document ended inside <{0}>")]
    Unclosed(String),
    #[error("document has no root element")]
    NoRoot,
}

pub(crate) enum Node<'a, 'e> {
    Element(&'a BytesStart<'e>),
    Text(&'a str),
}

/// Stream `source` and hand every element start and text node to `visit`
/// together with the names of its enclosing elements, outermost first.
pub(crate) fn walk<F>(source: &[u8], mut visit: F) -> Result<(), XmlError>
where
    F: FnMut(&[String], Node<'_, '_>) -> Result<(), XmlError>,
{
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = true;

    let mut path: Vec<String> = Vec::new();
    let mut seen_root = false;
    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                visit(&path, Node::Element(&start))?;
                path.push(name_of(&start));
                seen_root = true;
            }
            Event::Empty(start) => {
                visit(&path, Node::Element(&start))?;
                seen_root = true;
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                visit(&path, Node::Text(&*text))?;
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data);
                visit(&path, Node::Text(&*text))?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = path.pop() {
        return Err(XmlError::Unclosed(open));
    }
    if !seen_root {
        return Err(XmlError::NoRoot);
    }
    Ok(())
}

pub(crate) fn name_of(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

/// Unescaped value of `key`, or empty when the attribute is absent.
pub(crate) fn attribute(start: &BytesStart<'_>, key: &str) -> Result<String, XmlError> {
    match start.try_get_attribute(key)? {
        Some(attr) => Ok(attr.unescape_value()?.into_owned()),
        None => Ok(String::new()),
    }
}

pub(crate) fn path_is(path: &[String], expected: &[&str]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_path_of_each_element() {
        let mut seen = Vec::new();
        walk(b"<a><b/><c>t</c></a>", |path, node| {
            if let Node::Element(start) = node {
                seen.push((path.join("/"), name_of(start)));
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                (String::new(), "a".to_string()),
                ("a".to_string(), "b".to_string()),
                ("a".to_string(), "c".to_string()),
            ]
        );
    }

    #[test]
    fn unclosed_document_is_an_error() {
        let err = walk(b"<a><b>", |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, XmlError::Unclosed(ref name) if name == "b"));
    }

    #[test]
    fn mismatched_end_tag_is_an_error() {
        let err = walk(b"<a><b></c></a>", |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, XmlError::Syntax(_)));
    }

    #[test]
    fn empty_input_has_no_root() {
        assert!(matches!(walk(b"", |_, _| Ok(())), Err(XmlError::NoRoot)));
    }
}
