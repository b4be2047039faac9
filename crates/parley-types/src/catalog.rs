//! Reference catalog entries.
//!
//! The catalog is the allow-list of `(code, description)` pairs an extracted
//! interest must match exactly to be kept.

use serde::{Deserialize, Serialize};

/// One allowed interest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    pub description: String,
}

impl CatalogEntry {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }

    /// The line form `<code> <description>` the analysis service emits.
    pub fn line(&self) -> String {
        format!("{} {}", self.code, self.description)
    }
}

/// TOML file shape accepted by `parley catalog import`.
///
/// ```toml
/// [[entries]]
/// code = "A01"
/// description = "Autos usados"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub entries: Vec<CatalogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_form() {
        assert_eq!(CatalogEntry::new("A01", "Autos usados").line(), "A01 Autos usados");
    }

    #[test]
    fn test_catalog_file_from_toml() {
        let file: CatalogFile = toml::from_str(
            r#"
[[entries]]
code = "A01"
description = "Autos usados"

[[entries]]
code = "B02"
description = "Motos"
"#,
        )
        .unwrap();
        assert_eq!(file.entries.len(), 2);
        assert_eq!(file.entries[1], CatalogEntry::new("B02", "Motos"));
    }

    #[test]
    fn test_empty_catalog_file() {
        let file: CatalogFile = toml::from_str("").unwrap();
        assert!(file.entries.is_empty());
    }
}
