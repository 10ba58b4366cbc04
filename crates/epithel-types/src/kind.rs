//! Element kinds of an epithelium.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A category of tissue component, each stored in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Vertices (junction points).
    Vert,
    /// Oriented half-edges.
    Edge,
    /// Polygonal faces.
    Face,
    /// Polyhedral cells (bulk tissues only).
    Cell,
}

impl ElementKind {
    /// All kinds in canonical order.
    pub const ALL: [Self; 4] = [Self::Vert, Self::Edge, Self::Face, Self::Cell];

    /// Return the lowercase table name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vert => "vert",
            Self::Edge => "edge",
            Self::Face => "face",
            Self::Cell => "cell",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vert" | "vertex" => Ok(Self::Vert),
            "edge" => Ok(Self::Edge),
            "face" => Ok(Self::Face),
            "cell" => Ok(Self::Cell),
            other => Err(format!("unknown element kind: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_names() {
        assert_eq!("vert".parse::<ElementKind>(), Ok(ElementKind::Vert));
        assert_eq!("vertex".parse::<ElementKind>(), Ok(ElementKind::Vert));
        assert_eq!("cell".parse::<ElementKind>(), Ok(ElementKind::Cell));
        assert!("node".parse::<ElementKind>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&ElementKind::Face).ok();
        assert_eq!(json.as_deref(), Some("\"face\""));
    }
}
