use crate::error::{Error, Result};

/// A decoded `^NAME(sub1,...,subN)` node reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReference {
    /// The global name, upper-cased.
    pub global: String,
    /// Subscripts in order; never empty when parsed.
    pub subscripts: Vec<String>,
}

impl NodeReference {
    /// The first subscript, or `""` when there are none.
    pub fn key(&self) -> &str {
        self.subscripts.first().map_or("", String::as_str)
    }

    /// Subscripts after the key.
    pub fn rest(&self) -> &[String] {
        self.subscripts.get(1..).unwrap_or(&[])
    }
}

/// Parse a node reference such as `^ACN(5877000047,51)`.
///
/// The global name runs from the first `^` to the first `(` after it and the
/// subscript list runs to the last `)`. Subscripts are split on `,` and kept
/// verbatim, so quoted subscripts keep their quotes.
pub fn parse_node_reference(reference: &str) -> Result<NodeReference> {
    let invalid = || Error::InvalidNode(reference.to_string());

    let caret = reference.find('^').ok_or_else(invalid)?;
    let rest = &reference[caret + 1..];

    let open = rest.find('(').ok_or_else(invalid)?;
    let close = rest.rfind(')').ok_or_else(invalid)?;
    if close <= open + 1 {
        return Err(invalid());
    }

    let global = &rest[..open];
    if global.is_empty() {
        return Err(invalid());
    }

    let subscripts = rest[open + 1..close]
        .split(',')
        .map(str::to_string)
        .collect();

    Ok(NodeReference {
        global: global.to_uppercase(),
        subscripts,
    })
}
