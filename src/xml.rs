//! Small owned element tree over `quick-xml`, enough for XDXF lexicons.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ConvertError, Result};
use crate::text::normalize_whitespace;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |element| element.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.name == name)
    }

    /// Take the first child element with this name.
    pub fn into_child(self, name: &str) -> Option<XmlElement> {
        self.children.into_iter().find_map(|node| match node {
            XmlNode::Element(element) if element.name == name => Some(element),
            _ => None,
        })
    }

    pub fn into_elements(self) -> impl Iterator<Item = XmlElement> {
        self.children.into_iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// All descendant text, `<br/>` read as a space, whitespace collapsed.
    pub fn text(&self) -> String {
        let mut raw = String::new();
        self.collect_text(&mut raw);
        normalize_whitespace(&raw)
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) if element.name == "br" => out.push(' '),
                XmlNode::Element(element) => element.collect_text(out),
            }
        }
    }
}

fn element_from(start: &BytesStart, source_name: &str) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ConvertError::source_format(source_name, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ConvertError::source_format(source_name, e))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [XmlElement], node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Parse a whole document and return its root element.
///
/// Any well-formedness problem is a `SourceFormat` error: a half-read lexicon is
/// worse than none.
pub fn parse_document(xml: &str, source_name: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(element_from(&e, source_name)?),
            Ok(Event::Empty(e)) => {
                let element = element_from(&e, source_name)?;
                if stack.is_empty() {
                    root.get_or_insert(element);
                } else {
                    attach(&mut stack, XmlNode::Element(element));
                }
            }
            Ok(Event::End(_)) => {
                let Some(element) = stack.pop() else {
                    return Err(ConvertError::source_format(source_name, "unbalanced end tag"));
                };
                if stack.is_empty() {
                    root.get_or_insert(element);
                } else {
                    attach(&mut stack, XmlNode::Element(element));
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| ConvertError::source_format(source_name, e))?;
                attach(&mut stack, XmlNode::Text(text.into_owned()));
            }
            Ok(Event::CData(c)) => {
                attach(&mut stack, XmlNode::Text(String::from_utf8_lossy(&c).into_owned()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConvertError::source_format(
                    source_name,
                    format!("at byte {}: {}", reader.buffer_position(), e),
                ))
            }
            // Declarations, comments, processing instructions, doctype
            Ok(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ConvertError::source_format(
            source_name,
            format!("unclosed element <{}>", open.name),
        ));
    }
    root.ok_or_else(|| ConvertError::source_format(source_name, "no root element"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_tree_with_attributes() {
        let root = parse_document(
            r#"<?xml version="1.0"?><xdxf><lexicon><ar><k>അ</k><def><kref type="syn">ആ</kref></def></ar></lexicon></xdxf>"#,
            "t.xml",
        )
        .unwrap();
        assert_eq!(root.name, "xdxf");
        let ar = root.child("lexicon").unwrap().child("ar").unwrap();
        assert_eq!(ar.child("k").unwrap().text(), "അ");
        let kref = ar.child("def").unwrap().child("kref").unwrap();
        assert_eq!(kref.attribute("type"), Some("syn"));
    }

    #[test]
    fn child_outlives_the_name_it_was_looked_up_with() {
        let root = parse_document("<ar><k>അ</k><k>ആ</k><def/></ar>", "t").unwrap();
        let found = {
            let name = String::from("k");
            root.child(&name)
        };
        assert_eq!(found.map(XmlElement::text).as_deref(), Some("അ"));
        assert_eq!(root.children_named("k").count(), 2);
        assert!(root.child("def").is_some());
        assert!(root.child("gr").is_none());
    }

    #[test]
    fn text_reads_br_as_space_and_collapses() {
        let root = parse_document("<d>ഒന്ന്<br/>രണ്ട്  <i>മൂന്ന്</i>\n</d>", "t").unwrap();
        assert_eq!(root.text(), "ഒന്ന് രണ്ട് മൂന്ന്");
    }

    #[test]
    fn entities_are_unescaped() {
        let root = parse_document("<d>a &amp; b</d>", "t").unwrap();
        assert_eq!(root.text(), "a & b");
    }

    #[test]
    fn mismatched_tags_are_source_errors() {
        let err = parse_document("<a><b></a>", "bad.xml").unwrap_err();
        assert!(matches!(err, ConvertError::SourceFormat { .. }));
    }

    #[test]
    fn unclosed_root_is_a_source_error() {
        assert!(parse_document("<a><b></b>", "bad.xml").is_err());
    }
}
