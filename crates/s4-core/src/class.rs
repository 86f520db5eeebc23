//! Class names, reserved dispatch tokens, and registry identifiers.
//!
//! A [`ClassName`] is the tag carried alongside every value at the call
//! boundary. The resolver never looks at values themselves, only at these
//! tags. Two tags are reserved: [`ANY`] matches every class at the lowest
//! precedence, and [`MISSING`] marks an argument that was not supplied.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The match-anything token.
pub const ANY: &str = "ANY";

/// The not-supplied token.
pub const MISSING: &str = "missing";

/// Separator used by the canonical rendering of a class tuple.
pub const SIGNATURE_SEPARATOR: char = '#';

/// A unique identifier for a registered class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClassId(pub u32);

/// A unique identifier for a registered generic function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GenericId(pub u32);

/// A unique identifier for a registered method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MethodId(pub u32);

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method#{}", self.0)
    }
}

/// The name of a class, or one of the reserved tokens.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassName(String);

impl ClassName {
    pub fn new(name: impl Into<String>) -> Self {
        ClassName(name.into())
    }

    /// The match-anything token.
    pub fn any() -> Self {
        ClassName(ANY.to_string())
    }

    /// The not-supplied token.
    pub fn missing() -> Self {
        ClassName(MISSING.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_any(&self) -> bool {
        self.0 == ANY
    }

    pub fn is_missing(&self) -> bool {
        self.0 == MISSING
    }

    /// Whether this name is one of the reserved tokens and so cannot be
    /// registered as a class.
    pub fn is_reserved(&self) -> bool {
        self.is_any() || self.is_missing()
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassName {
    fn from(name: &str) -> Self {
        ClassName(name.to_string())
    }
}

impl From<String> for ClassName {
    fn from(name: String) -> Self {
        ClassName(name)
    }
}

impl Borrow<str> for ClassName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ClassName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build a class tuple from anything string-like.
///
/// `classes(["Car", "Inspector"])` is shorthand for a `Vec<ClassName>`.
pub fn classes<I, S>(names: I) -> Vec<ClassName>
where
    I: IntoIterator<Item = S>,
    S: Into<ClassName>,
{
    names.into_iter().map(Into::into).collect()
}

/// Render a class tuple canonically: names joined with `#`.
///
/// The rendering is the tie-break key between equally distant signatures and
/// the label used in diagnostics.
pub fn render_signature(classes: &[ClassName]) -> String {
    let mut out = String::new();
    for (i, class) in classes.iter().enumerate() {
        if i > 0 {
            out.push(SIGNATURE_SEPARATOR);
        }
        out.push_str(class.as_str());
    }
    out
}
