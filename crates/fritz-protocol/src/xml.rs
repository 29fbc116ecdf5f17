//! Minimal owned XML element tree.
//!
//! Gateway responses are small documents (session info, device lists,
//! statistics). Consumers only need element lookup by tag name, attribute
//! access and text content, so the tree is built eagerly with `quick-xml`
//! and owned by the caller.
//!
//! # Safety Rules
//!
//! - A `<!DOCTYPE ...>` anywhere in the input rejects the whole document,
//!   so no embedded DTD from the gateway is ever trusted.
//! - Only the five predefined entities and character references are
//!   expanded; any other entity reference is an error.
//!
//! # Example
//!
//! ```
//! use fritz_protocol::XmlDocument;
//!
//! let doc = XmlDocument::parse(
//!     "<devicelist version=\"1\"><device identifier=\"08761 0000434\">\
//!      <present>1</present><name>Kitchen</name></device></devicelist>",
//! ).unwrap();
//!
//! let device = doc.find("device").unwrap();
//! assert_eq!(device.attribute("identifier"), Some("08761 0000434"));
//! assert_eq!(device.child_text("name"), Some("Kitchen"));
//! ```

use fritz_core::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Parsed XML document with a single root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: XmlElement,
}

/// One element with its attributes, text content and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlDocument {
    /// Parse a document from a string.
    ///
    /// # Errors
    /// Returns `Error::Xml` if the input is not well-formed, contains a
    /// DOCTYPE declaration, has no root element or more than one.
    pub fn parse(input: &str) -> Result<Self> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event().map_err(|e| xml_error(&reader, e))? {
                Event::DocType(_) => {
                    return Err(Error::Xml(
                        "DOCTYPE declarations are not accepted".to_string(),
                    ));
                }
                Event::Start(start) => stack.push(XmlElement::from_start(&start)?),
                Event::Empty(start) => {
                    let element = XmlElement::from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::Xml(format!("invalid text content: {e}")))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Event::CData(data) => {
                    let data = std::str::from_utf8(&data)
                        .map_err(|e| Error::Xml(format!("CDATA is not UTF-8: {e}")))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(data);
                    }
                }
                Event::Eof => break,
                // Declarations, comments and processing instructions
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::Xml(format!(
                "unexpected end of document inside <{}>",
                open.name
            )));
        }

        root.map(|root| XmlDocument { root })
            .ok_or_else(|| Error::Xml("document has no root element".to_string()))
    }

    /// Parse a document from raw response bytes.
    ///
    /// # Errors
    /// Returns `Error::Xml` if the bytes are not UTF-8 or not a valid
    /// document.
    pub fn parse_bytes(input: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(input)
            .map_err(|e| Error::Xml(format!("response is not UTF-8: {e}")))?;
        Self::parse(text)
    }

    /// The document element.
    #[must_use]
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// First element named `tag`, including the root itself.
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<&XmlElement> {
        if self.root.name == tag {
            Some(&self.root)
        } else {
            self.root.find(tag)
        }
    }

    /// All elements named `tag` in document order, including the root.
    #[must_use]
    pub fn find_all(&self, tag: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        if self.root.name == tag {
            found.push(&self.root);
        }
        self.root.collect(tag, &mut found);
        found
    }

    /// Text of the first element named `tag`.
    #[must_use]
    pub fn text_of(&self, tag: &str) -> Option<&str> {
        self.find(tag).map(XmlElement::text)
    }
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Xml(format!("element name is not UTF-8: {e}")))?
            .to_string();

        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute =
                attribute.map_err(|e| Error::Xml(format!("invalid attribute in <{name}>: {e}")))?;
            let key = std::str::from_utf8(attribute.key.as_ref())
                .map_err(|e| Error::Xml(format!("attribute name is not UTF-8: {e}")))?
                .to_string();
            let value = attribute
                .unescape_value()
                .map_err(|e| Error::Xml(format!("invalid value for {key:?}: {e}")))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(XmlElement {
            name,
            attributes,
            ..Default::default()
        })
    }

    /// Tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text content (surrounding whitespace trimmed).
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct children in document order.
    #[must_use]
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// First direct child named `tag`.
    #[must_use]
    pub fn child(&self, tag: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == tag)
    }

    /// First descendant named `tag` (depth-first, document order).
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|child| {
            if child.name == tag {
                Some(child)
            } else {
                child.find(tag)
            }
        })
    }

    /// All descendants named `tag` in document order.
    #[must_use]
    pub fn find_all(&self, tag: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect(tag, &mut found);
        found
    }

    /// Text of the first descendant named `tag`.
    #[must_use]
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.find(tag).map(XmlElement::text)
    }

    fn collect<'a>(&'a self, tag: &str, found: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == tag {
                found.push(child);
            }
            child.collect(tag, found);
        }
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }

    if root.is_some() {
        return Err(Error::Xml("document has more than one root element".to_string()));
    }
    *root = Some(element);
    Ok(())
}

fn xml_error(reader: &Reader<&[u8]>, error: quick_xml::Error) -> Error {
    Error::Xml(format!(
        "malformed XML at byte {}: {error}",
        reader.buffer_position()
    ))
}
