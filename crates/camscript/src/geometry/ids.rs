use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a CAD element. Ids are only unique within one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymbolType {
    Point,
    Line,
    Arc,
    Circle,
    /// A free-form path (polyline or Bézier sketch).
    Sketch,
}

impl SymbolType {
    /// Numeric code written to documents.
    pub fn code(self) -> i32 {
        match self {
            SymbolType::Point => 1,
            SymbolType::Line => 2,
            SymbolType::Arc => 3,
            SymbolType::Circle => 4,
            SymbolType::Sketch => 5,
        }
    }

    /// Inverse of [`SymbolType::code`].
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(SymbolType::Point),
            2 => Some(SymbolType::Line),
            3 => Some(SymbolType::Arc),
            4 => Some(SymbolType::Circle),
            5 => Some(SymbolType::Sketch),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SymbolType::Point => "point",
            SymbolType::Line => "line",
            SymbolType::Arc => "arc",
            SymbolType::Circle => "circle",
            SymbolType::Sketch => "sketch",
        }
    }
}

/// Identifier of a CAD element within its [`SymbolType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Indirect reference to a CAD element, resolved on demand.
///
/// Both halves are needed: the same id can exist under several types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolReference {
    pub symbol_type: SymbolType,
    pub id: SymbolId,
}

impl SymbolReference {
    pub fn new(symbol_type: SymbolType, id: SymbolId) -> Self {
        Self { symbol_type, id }
    }
}

impl fmt::Display for SymbolReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.symbol_type.name(), self.id)
    }
}
