//! Turn assembled byte buffers into XML elements
//!
//! [`extract`] parses one complete document and hands back the elements a caller asked for:
//! the root itself, or whatever an optional [`Projection`] derives from it. [`extract_stream`]
//! applies the same to a stream of buffers, typically the output of an accumulator stage.

use observability_deps::tracing::debug;

mod element;
mod parse;
mod projection;
mod stream;

pub use element::{Element, Node};
pub use parse::{ParseError, parse};
pub use projection::{Projected, Projection, Select};
pub use stream::{ExtractStream, StreamError, extract_stream};

/// Error type returned by caller supplied projections
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse document: {0}")]
    Parse(#[from] ParseError),

    #[error("projection failed: {0}")]
    Projection(#[source] BoxError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Parse `buffer` as a single XML document and derive the elements to hand downstream.
///
/// Without a projection the result is the root element alone. With one, the projection is
/// called exactly once with the root and its [`Projected`] value decides the result.
pub fn extract(buffer: &[u8], projection: Option<&dyn Projection>) -> Result<Vec<Element>> {
    let root = parse(buffer)?;

    let elements = match projection {
        None => vec![root],
        Some(projection) => projection
            .project(root)
            .map_err(Error::Projection)?
            .into_elements(),
    };

    debug!(
        bytes = buffer.len(),
        elements = elements.len(),
        "extracted document"
    );
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const DOC: &[u8] = b"<a>1</a>";

    #[test]
    fn no_projection_yields_root() {
        let elements = extract(DOC, None).unwrap();
        assert_eq!(elements, vec![Element::new("a").with_text("1")]);
    }

    #[test]
    fn projection_to_node() {
        let wrap = |root: Element| -> Result<Projected, BoxError> {
            Ok(Projected::Node(Element::new("wrapped").with_child(root)))
        };

        let elements = extract(DOC, Some(&wrap)).unwrap();
        assert_eq!(
            elements,
            vec![Element::new("wrapped").with_child(Element::new("a").with_text("1"))]
        );
    }

    #[test]
    fn projection_to_nothing() {
        let nothing = |_: Element| -> Result<Projected, BoxError> { Ok(Projected::Nothing) };
        assert!(extract(DOC, Some(&nothing)).unwrap().is_empty());
    }

    #[test]
    fn projection_called_once_with_root() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let count = |root: Element| -> Result<Projected, BoxError> {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            assert_eq!(root.name(), "a");
            Ok(Projected::Node(root))
        };

        extract(DOC, Some(&count)).unwrap();
        assert_eq!(calls.into_inner(), 1);
    }

    #[test]
    fn projection_error_propagates() {
        let failing = |_: Element| -> Result<Projected, BoxError> { Err("no schema for <a>".into()) };

        let err = extract(DOC, Some(&failing)).unwrap_err();
        assert!(matches!(err, Error::Projection(_)));
        assert_eq!(err.to_string(), "projection failed: no schema for <a>");
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let err = extract(b"<a>1</b>", None).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Xml(_))));
        assert!(
            std::error::Error::source(&err).is_some(),
            "parse errors wrap their cause"
        );
    }

    #[test]
    fn empty_buffer_is_a_parse_error() {
        let err = extract(b"", None).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::NoRootElement)));
    }

    #[test]
    fn projection_not_called_on_parse_failure() {
        let never = |_: Element| -> Result<Projected, BoxError> { panic!("must not be called") };
        assert!(extract(b"<a>", Some(&never)).is_err());
    }
}
