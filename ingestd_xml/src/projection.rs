use crate::{BoxError, Element};

/// Result of applying a [`Projection`] to a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projected {
    Node(Element),
    Nodes(Vec<Element>),
    Nothing,
}

impl From<Option<Element>> for Projected {
    fn from(value: Option<Element>) -> Self {
        match value {
            Some(e) => Self::Node(e),
            None => Self::Nothing,
        }
    }
}

impl From<Vec<Element>> for Projected {
    fn from(mut value: Vec<Element>) -> Self {
        match value.len() {
            0 => Self::Nothing,
            1 => Self::Node(value.remove(0)),
            _ => Self::Nodes(value),
        }
    }
}

impl Projected {
    pub fn into_elements(self) -> Vec<Element> {
        match self {
            Self::Node(e) => vec![e],
            Self::Nodes(v) => v,
            Self::Nothing => vec![],
        }
    }
}

/// Maps the root of a parsed document to the elements handed downstream.
///
/// Implemented for closures taking the root element, and for [`Select`]. Errors are not
/// handled by the caller; they end the extraction.
pub trait Projection: Send + Sync {
    fn project(&self, root: Element) -> Result<Projected, BoxError>;
}

impl<F> Projection for F
where
    F: Fn(Element) -> Result<Projected, BoxError> + Send + Sync,
{
    fn project(&self, root: Element) -> Result<Projected, BoxError> {
        self(root)
    }
}

/// Projection selecting the elements reached by a child path, see [`Element::select`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    path: String,
}

impl Select {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Projection for Select {
    fn project(&self, root: Element) -> Result<Projected, BoxError> {
        Ok(root.into_select(&self.path).into())
    }
}
