//! Build an [`Element`] tree from raw bytes using the `quick_xml` event reader

use quick_xml::{
    Reader,
    events::{BytesStart, Event, attributes::AttrError},
};

use crate::element::{Element, Node};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("document has no root element")]
    NoRootElement,

    #[error("element <{name}> is not closed")]
    UnclosedElement { name: String },

    #[error("closing tag </{name}> has no matching opening tag")]
    UnexpectedEndTag { name: String },

    #[error("content after the root element")]
    ContentAfterRoot,

    #[error("text outside the root element")]
    TextOutsideRoot,
}

/// Parse a complete document, returning its root element
pub fn parse(bytes: &[u8]) -> Result<Element, ParseError> {
    let mut reader = Reader::from_reader(bytes);

    let mut builder = TreeBuilder::default();
    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let element = element_from(&start)?;
                builder.open(element)?;
            }
            Event::Empty(start) => {
                let element = element_from(&start)?;
                builder.close(element)?;
            }
            Event::End(end) => {
                let element = builder.stack.pop().ok_or_else(|| {
                    ParseError::UnexpectedEndTag {
                        name: String::from_utf8_lossy(end.name().as_ref()).into_owned(),
                    }
                })?;
                builder.close(element)?;
            }
            Event::Text(text) => builder.text(text.unescape()?.into_owned())?,
            Event::CData(cdata) => builder.text(std::str::from_utf8(&cdata)?.to_owned())?,
            Event::Eof => break,
            // declarations, comments, processing instructions and doctypes carry no content
            _ => {}
        }
    }

    builder.finish()
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, ParseError> {
    let mut element = Element::new(std::str::from_utf8(start.name().as_ref())?);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = std::str::from_utf8(attribute.key.as_ref())?.to_owned();
        let value = attribute.unescape_value()?.into_owned();
        element.push_attribute(key, value);
    }
    Ok(element)
}

#[derive(Debug, Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    root: Option<Element>,
}

impl TreeBuilder {
    fn open(&mut self, element: Element) -> Result<(), ParseError> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(ParseError::ContentAfterRoot);
        }
        self.stack.push(element);
        Ok(())
    }

    fn close(&mut self, element: Element) -> Result<(), ParseError> {
        match self.stack.last_mut() {
            Some(parent) => parent.push(Node::Element(element)),
            None if self.root.is_none() => self.root = Some(element),
            None => return Err(ParseError::ContentAfterRoot),
        }
        Ok(())
    }

    /// Whitespace-only text is layout and is dropped; any other text is kept verbatim.
    fn text(&mut self, text: String) -> Result<(), ParseError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        match self.stack.last_mut() {
            Some(parent) => parent.push(Node::Text(text)),
            None => return Err(ParseError::TextOutsideRoot),
        }
        Ok(())
    }

    fn finish(self) -> Result<Element, ParseError> {
        if let Some(open) = self.stack.last() {
            return Err(ParseError::UnclosedElement {
                name: open.name().to_owned(),
            });
        }
        self.root.ok_or(ParseError::NoRootElement)
    }
}
