//! Small accessors over `roxmltree` nodes for NCBI efetch responses
//!
//! NCBI's XML schemas are navigated by walking named children and reading
//! attributes; these helpers turn an absent element or attribute into a
//! descriptive error instead of a panic.

use roxmltree::Node;
use thiserror::Error;

/// The response XML did not have the expected shape
#[derive(Debug, Error)]
pub enum XmlError {
    /// An expected element was not present
    #[error("missing expected element in response: {0}")]
    MissingElement(String),

    /// An expected attribute was not present
    #[error("missing expected attribute in response: {0}")]
    MissingAttribute(String),
}

/// Returns the first child element of `node` named `name`.
pub(crate) fn child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Result<Node<'a, 'input>, XmlError> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .ok_or_else(|| XmlError::MissingElement(name.to_string()))
}

/// Returns the trimmed text content of the child element named `name`.
pub(crate) fn child_text(node: Node, name: &str) -> Result<String, XmlError> {
    Ok(text_of(child(node, name)?))
}

/// Returns the trimmed text content of `node` (empty if it has none).
pub(crate) fn text_of(node: Node) -> String {
    node.text().unwrap_or_default().trim().to_string()
}

/// Returns the value of the attribute named `name`.
pub(crate) fn attribute(node: Node, name: &str) -> Result<String, XmlError> {
    node.attribute(name)
        .map(str::to_string)
        .ok_or_else(|| XmlError::MissingAttribute(name.to_string()))
}

/// Returns the first element child of `node`.
///
/// Several NCBI containers (`PLATFORM`, `LIBRARY_LAYOUT`) carry their value
/// as the tag name of their single child element.
pub(crate) fn first_element_child<'a, 'input>(
    node: Node<'a, 'input>,
) -> Result<Node<'a, 'input>, XmlError> {
    node.children().find(Node::is_element).ok_or_else(|| {
        XmlError::MissingElement(format!("child of {}", node.tag_name().name()))
    })
}
