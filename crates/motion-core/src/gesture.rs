//! Gesture definitions: named paths of movement directions.
//!
//! Definitions are read once at engine construction, from a TOML document:
//!
//! ```toml
//! [[gesture]]
//! name = "digit-2"
//! path = "RDLDR"
//! ```
//!
//! Path letters are `L R U D F B` (left, right, up, down, forward,
//! backward), case-insensitive.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::types::Direction;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GestureError {
    #[error("cannot read gesture definitions: {0}")]
    Io(String),
    #[error("malformed gesture document: {0}")]
    Parse(String),
    #[error("gesture {name:?}: unknown direction letter {letter:?}")]
    UnknownLetter { name: String, letter: char },
    #[error("gesture {0:?} has an empty path")]
    EmptyPath(String),
    #[error("gesture with empty name")]
    EmptyName,
    #[error("duplicate gesture name {0:?}")]
    Duplicate(String),
}

/// A named sequence of movement directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureDefinition {
    pub name: String,
    pub directions: Vec<Direction>,
}

impl GestureDefinition {
    /// Build a definition from a path string such as `"RDLDR"`.
    pub fn parse(name: &str, path: &str) -> Result<Self, GestureError> {
        if name.trim().is_empty() {
            return Err(GestureError::EmptyName);
        }
        let directions = path
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|letter| {
                Direction::from_letter(letter).ok_or_else(|| GestureError::UnknownLetter {
                    name: name.to_string(),
                    letter,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if directions.is_empty() {
            return Err(GestureError::EmptyPath(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            directions,
        })
    }

    /// The path as letters, e.g. `"RDLDR"`.
    pub fn path(&self) -> String {
        self.directions.iter().filter_map(|d| d.letter()).collect()
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct GestureDocument {
    #[serde(default)]
    gesture: Vec<GestureEntry>,
}

#[derive(Debug, Deserialize)]
struct GestureEntry {
    name: String,
    path: String,
}

/// The registered gestures of one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GestureSet {
    gestures: Vec<GestureDefinition>,
}

impl GestureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three digit gestures shipped with the library.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        for (name, path) in [("digit-1", "DD"), ("digit-2", "RDLDR"), ("digit-3", "RDLRDL")] {
            // Builtin paths only use valid letters and distinct names.
            if let Ok(def) = GestureDefinition::parse(name, path) {
                set.gestures.push(def);
            }
        }
        set
    }

    pub fn from_toml_str(content: &str) -> Result<Self, GestureError> {
        let doc: GestureDocument =
            toml::from_str(content).map_err(|e| GestureError::Parse(e.to_string()))?;

        let mut set = Self::new();
        for entry in doc.gesture {
            set.register(GestureDefinition::parse(&entry.name, &entry.path)?)?;
        }
        Ok(set)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, GestureError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GestureError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn register(&mut self, def: GestureDefinition) -> Result<(), GestureError> {
        if self.gestures.iter().any(|g| g.name == def.name) {
            return Err(GestureError::Duplicate(def.name));
        }
        info!(name = %def.name, path = %def.path(), "gesture registered");
        self.gestures.push(def);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &GestureDefinition> {
        self.gestures.iter()
    }

    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }

    /// Length of the longest registered path.
    pub fn longest_path(&self) -> usize {
        self.gestures.iter().map(GestureDefinition::len).max().unwrap_or(0)
    }
}
