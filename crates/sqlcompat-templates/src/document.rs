//! Minimal XML tree for mapper documents
//!
//! Mapper bodies interleave SQL text with dynamic elements, so the parser
//! keeps text nodes untrimmed and in document order. Comments, processing
//! instructions and the DOCTYPE are dropped; CDATA sections become text.

use crate::TemplateError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// A node in the mapper document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its attributes and children in document order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get an attribute that must be present
    pub fn required_attribute(&self, name: &'static str) -> Result<&str, TemplateError> {
        self.attribute(name)
            .ok_or_else(|| TemplateError::MissingAttribute {
                element: self.name.clone(),
                attribute: name,
            })
    }

    /// Iterate direct child elements, skipping text
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// This element followed by every descendant element, breadth first
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = vec![self];
        let mut index = 0;
        while index < out.len() {
            let current = out[index];
            out.extend(current.child_elements());
            index += 1;
        }
        out
    }
}

/// Parse a mapper document and return its root element.
pub fn parse_document(xml: &str) -> Result<XmlElement, TemplateError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position() as usize;
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(position, e))?;

        match event {
            Event::Eof => break,
            Event::Start(ref e) => {
                stack.push(start_element(e, position)?);
            }
            Event::Empty(ref e) => {
                let element = start_element(e, position)?;
                attach(&mut stack, &mut root, XmlNode::Element(element), position)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| TemplateError::Xml {
                    position,
                    message: "unexpected closing tag".to_string(),
                })?;
                attach(&mut stack, &mut root, XmlNode::Element(element), position)?;
            }
            Event::Text(ref e) => {
                let text = e.unescape().map_err(|err| xml_error(position, err))?;
                if let Some(parent) = stack.last_mut() {
                    push_text(parent, &text);
                }
            }
            Event::CData(ref e) => {
                let text = String::from_utf8_lossy(e.as_ref());
                if let Some(parent) = stack.last_mut() {
                    push_text(parent, &text);
                }
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(TemplateError::Xml {
            position: xml.len(),
            message: format!("element <{}> is never closed", open.name),
        });
    }

    root.ok_or_else(|| TemplateError::Xml {
        position: 0,
        message: "document has no root element".to_string(),
    })
}

fn start_element(e: &BytesStart<'_>, position: usize) -> Result<XmlElement, TemplateError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()));
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| TemplateError::Xml {
            position,
            message: format!("failed to parse attribute: {}", err),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| xml_error(position, err))?
            .to_string();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    node: XmlNode,
    position: usize,
) -> Result<(), TemplateError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        XmlNode::Element(element) if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        _ => Err(TemplateError::Xml {
            position,
            message: "document has more than one root element".to_string(),
        }),
    }
}

/// Adjacent text and CDATA runs merge into one node
fn push_text(parent: &mut XmlElement, text: &str) {
    if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
        existing.push_str(text);
    } else {
        parent.children.push(XmlNode::Text(text.to_string()));
    }
}

fn xml_error(position: usize, err: impl std::fmt::Display) -> TemplateError {
    TemplateError::Xml {
        position,
        message: err.to_string(),
    }
}
