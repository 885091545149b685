use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::CatalogError;
use crate::platform::{is_primary, is_secondary, Platform};

static SHORTCUT_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/shortcuts");
const CATALOG_FILE: &str = "catalog.json";

static GLOBAL: OnceLock<Result<Catalog, CatalogError>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformLabels {
    pub mac: String,
    pub other: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutDefinition {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub sequence: Vec<String>,
    pub labels: PlatformLabels,
}

/// How a target sequence is recognized, decided by its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Primary modifier held while the second key is struck.
    Chord,
    /// Secondary modifier, then each following key within the step timeout.
    Ordered,
}

impl ShortcutDefinition {
    pub fn label(&self, platform: Platform) -> &str {
        match platform {
            Platform::Mac => &self.labels.mac,
            Platform::Other => &self.labels.other,
        }
    }

    pub fn mode(&self) -> Result<RecognitionMode, CatalogError> {
        let len = self.sequence.len();
        if len < 2 {
            return Err(CatalogError::DegenerateSequence {
                id: self.id.clone(),
                len,
            });
        }
        let first = self.sequence[0].as_str();
        match len {
            2 if is_primary(first) => Ok(RecognitionMode::Chord),
            n if n > 2 && is_secondary(first) => Ok(RecognitionMode::Ordered),
            _ => Err(CatalogError::UnsupportedShape {
                id: self.id.clone(),
            }),
        }
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    shortcuts: Vec<ShortcutDefinition>,
}

/// Static shortcut configuration. Loaded once, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<ShortcutDefinition>,
}

impl Catalog {
    /// Process-wide catalog parsed from the embedded definitions on first use.
    ///
    /// A defective embedded file is reported on every call rather than
    /// surfacing later as unknown ids.
    pub fn global() -> Result<&'static Catalog, CatalogError> {
        GLOBAL.get_or_init(Catalog::load).as_ref().map_err(Clone::clone)
    }

    pub fn load() -> Result<Self, CatalogError> {
        let contents = SHORTCUT_DIR
            .get_file(CATALOG_FILE)
            .and_then(|f| f.contents_utf8())
            .ok_or_else(|| CatalogError::Parse(format!("{CATALOG_FILE} is not embedded")))?;
        Self::from_json(contents)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_definitions(file.shortcuts)
    }

    pub fn from_definitions(entries: Vec<ShortcutDefinition>) -> Result<Self, CatalogError> {
        let catalog = Self { entries };
        catalog.validate()?;
        tracing::debug!(shortcuts = catalog.len(), "shortcut catalog loaded");
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for def in &self.entries {
            if !seen.insert(def.id.as_str()) {
                return Err(CatalogError::DuplicateId(def.id.clone()));
            }
            def.mode()?;
        }
        Ok(())
    }

    pub fn lookup(&self, id: &str) -> Result<&ShortcutDefinition, CatalogError> {
        self.entries
            .iter()
            .find(|def| def.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|def| def.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShortcutDefinition> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn definition(id: &str, sequence: &[&str]) -> ShortcutDefinition {
    ShortcutDefinition {
        id: id.to_string(),
        display_name: id.to_string(),
        description: String::new(),
        sequence: sequence.iter().map(|s| s.to_string()).collect(),
        labels: PlatformLabels {
            mac: id.to_string(),
            other: id.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn embedded_catalog_is_valid() {
        let catalog = Catalog::load().unwrap();
        assert!(catalog.len() >= 2);
        for def in catalog.iter() {
            assert!(def.mode().is_ok(), "{} has an unsupported shape", def.id);
            assert!(!def.labels.mac.is_empty());
            assert!(!def.labels.other.is_empty());
        }
    }

    #[test]
    fn global_catalog_matches_embedded_file() {
        let global: Vec<&str> = Catalog::global().unwrap().ids().collect();
        let loaded = Catalog::load().unwrap();
        assert_eq!(global, loaded.ids().collect::<Vec<_>>());
    }

    #[test]
    fn embedded_catalog_has_both_modes() {
        let catalog = Catalog::global().unwrap();
        assert_eq!(
            catalog.lookup("duplicate").unwrap().mode(),
            Ok(RecognitionMode::Chord)
        );
        let align_top = catalog.lookup("align-top").unwrap();
        assert_eq!(align_top.sequence, vec!["alt", "x", "a", "t"]);
        assert_eq!(align_top.mode(), Ok(RecognitionMode::Ordered));
    }

    #[test]
    fn lookup_unknown_id() {
        let catalog = Catalog::global().unwrap();
        assert_matches!(catalog.lookup("nope"), Err(CatalogError::NotFound(id)) if id == "nope");
    }

    #[test]
    fn rejects_short_sequences() {
        let err = Catalog::from_definitions(vec![definition("lonely", &["ctrl"])]).unwrap_err();
        assert_matches!(err, CatalogError::DegenerateSequence { len: 1, .. });
    }

    #[test]
    fn rejects_unsupported_shapes() {
        let err = Catalog::from_definitions(vec![definition("odd", &["x", "y", "z"])]).unwrap_err();
        assert_matches!(err, CatalogError::UnsupportedShape { .. });
        let err = Catalog::from_definitions(vec![definition("long-chord", &["ctrl", "k", "c"])])
            .unwrap_err();
        assert_matches!(err, CatalogError::UnsupportedShape { .. });
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Catalog::from_definitions(vec![
            definition("dup", &["ctrl", "d"]),
            definition("dup", &["ctrl", "g"]),
        ])
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateId("dup".into()));
    }

    #[test]
    fn parse_errors_are_reported() {
        assert_matches!(Catalog::from_json("{"), Err(CatalogError::Parse(_)));
    }

    #[test]
    fn labels_follow_platform() {
        let def = Catalog::global().unwrap().lookup("duplicate").unwrap();
        assert_eq!(def.label(Platform::Mac), "⌘D");
        assert_eq!(def.label(Platform::Other), "Ctrl+D");
    }
}
