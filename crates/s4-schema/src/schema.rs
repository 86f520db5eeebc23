//! The serde model of an `s4.toml` schema file.

use std::ops::Range;
use std::path::Path;

use serde::Deserialize;
use toml::Spanned;

use s4_core::DispatchConfig;

use crate::error::SchemaError;

/// A parsed `s4.toml` file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassEntry>,
    #[serde(default, rename = "union")]
    pub unions: Vec<UnionEntry>,
    #[serde(default, rename = "generic")]
    pub generics: Vec<GenericEntry>,
    #[serde(default, rename = "method")]
    pub methods: Vec<MethodEntry>,
}

/// One `[[class]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassEntry {
    pub name: Spanned<String>,
    /// Direct parents, nearest first.
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub sealed: bool,
}

/// One `[[union]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnionEntry {
    pub name: Spanned<String>,
    pub members: Vec<String>,
}

/// One `[[generic]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenericEntry {
    pub name: Spanned<String>,
    pub params: Vec<String>,
}

/// One `[[method]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodEntry {
    pub generic: String,
    pub signature: Spanned<Vec<String>>,
    /// What the handler returns. Defaults to the canonical rendering of the
    /// signature.
    #[serde(default)]
    pub label: Option<String>,
    /// Append `" > "` and the next method's result.
    #[serde(default)]
    pub next: bool,
}

impl MethodEntry {
    pub fn span(&self) -> Range<usize> {
        self.signature.span()
    }
}

impl Schema {
    /// Read and parse a schema file.
    pub fn from_file(path: &Path) -> Result<Schema, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_str(&content)
    }

    /// Parse a schema from TOML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Schema, SchemaError> {
        toml::from_str(content).map_err(|e: toml::de::Error| SchemaError::Parse {
            message: e.message().to_string(),
            span: e.span(),
        })
    }
}
