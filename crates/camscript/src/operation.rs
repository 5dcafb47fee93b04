use crate::adaptive::AdaptiveParams;
use crate::drilling::DrillingParams;
use crate::error::Result;
use crate::geometry::SymbolReference;
use crate::locating::LocatingParams;
use crate::pocket::PocketParams;
use crate::profile::ProfileParams;
use crate::script::{comment_text, EmitContext};
use crate::zigzag::ZigZagParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique identifier for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(Ulid);

impl OperationId {
    /// Create a new OperationId with a random ULID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Create an OperationId from a ULID.
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Get the underlying ULID.
    pub fn ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of machining operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Profile,
    Pocket,
    ZigZag,
    Adaptive,
    Drilling,
    Locating,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::Profile,
        OperationKind::Pocket,
        OperationKind::ZigZag,
        OperationKind::Adaptive,
        OperationKind::Drilling,
        OperationKind::Locating,
    ];

    /// Element name used in documents.
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Profile => "Profile",
            OperationKind::Pocket => "Pocket",
            OperationKind::ZigZag => "ZigZag",
            OperationKind::Adaptive => "Adaptive",
            OperationKind::Drilling => "Drilling",
            OperationKind::Locating => "Locating",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Heights and depths shared by the cutting operations (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthParams {
    /// Height the tool retracts to between moves.
    pub clearance_height: f64,
    /// Height the tool rapids down to before feeding.
    pub rapid_down_to_height: f64,
    pub start_depth: f64,
    pub step_down: f64,
    pub final_depth: f64,
}

impl Default for DepthParams {
    fn default() -> Self {
        Self {
            clearance_height: 5.0,
            rapid_down_to_height: 2.0,
            start_depth: 0.0,
            step_down: 1.0,
            final_depth: -1.0,
        }
    }
}

/// Kind-specific settings of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationParams {
    Profile(ProfileParams),
    Pocket(PocketParams),
    ZigZag(ZigZagParams),
    Adaptive(AdaptiveParams),
    Drilling(DrillingParams),
    Locating(LocatingParams),
}

impl OperationParams {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationParams::Profile(_) => OperationKind::Profile,
            OperationParams::Pocket(_) => OperationKind::Pocket,
            OperationParams::ZigZag(_) => OperationKind::ZigZag,
            OperationParams::Adaptive(_) => OperationKind::Adaptive,
            OperationParams::Drilling(_) => OperationKind::Drilling,
            OperationParams::Locating(_) => OperationKind::Locating,
        }
    }

    /// Default settings for a kind.
    pub fn default_for(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Profile => OperationParams::Profile(ProfileParams::default()),
            OperationKind::Pocket => OperationParams::Pocket(PocketParams::default()),
            OperationKind::ZigZag => OperationParams::ZigZag(ZigZagParams::default()),
            OperationKind::Adaptive => OperationParams::Adaptive(AdaptiveParams::default()),
            OperationKind::Drilling => OperationParams::Drilling(DrillingParams::default()),
            OperationKind::Locating => OperationParams::Locating(LocatingParams::default()),
        }
    }

    /// The CAD elements this operation works on, if it references any.
    pub fn symbols(&self) -> &[SymbolReference] {
        match self {
            OperationParams::Profile(p) => &p.symbols,
            OperationParams::Pocket(p) => &p.symbols,
            OperationParams::Drilling(p) => &p.symbols,
            OperationParams::Locating(p) => &p.symbols,
            OperationParams::ZigZag(_) | OperationParams::Adaptive(_) => &[],
        }
    }

    pub fn symbols_mut(&mut self) -> Option<&mut Vec<SymbolReference>> {
        match self {
            OperationParams::Profile(p) => Some(&mut p.symbols),
            OperationParams::Pocket(p) => Some(&mut p.symbols),
            OperationParams::Drilling(p) => Some(&mut p.symbols),
            OperationParams::Locating(p) => Some(&mut p.symbols),
            OperationParams::ZigZag(_) | OperationParams::Adaptive(_) => None,
        }
    }
}

/// A single machining operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub title: String,
    /// Inactive operations keep their place in the program but emit no body.
    pub active: bool,
    /// Sort key; equal keys keep insertion order.
    pub execution_order: i32,
    /// Tool table number, 0 when the operation needs no tool.
    pub tool_number: u32,
    pub params: OperationParams,
}

impl Operation {
    pub fn new(title: impl Into<String>, params: OperationParams) -> Self {
        Self {
            id: OperationId::new(),
            title: title.into(),
            active: true,
            execution_order: 0,
            tool_number: 0,
            params,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.params.kind()
    }

    pub fn with_order(mut self, execution_order: i32) -> Self {
        self.execution_order = execution_order;
        self
    }

    pub fn with_tool(mut self, tool_number: u32) -> Self {
        self.tool_number = tool_number;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Write this operation's body into the context.
    pub fn append_directives(&self, ctx: &mut EmitContext<'_>) -> Result<()> {
        ctx.line(format!("# {}", comment_text(&self.title)));
        match &self.params {
            OperationParams::Profile(p) => p.append_directives(self, ctx),
            OperationParams::Pocket(p) => p.append_directives(self, ctx),
            OperationParams::ZigZag(p) => p.append_directives(self, ctx),
            OperationParams::Adaptive(p) => p.append_directives(self, ctx),
            OperationParams::Drilling(p) => p.append_directives(ctx),
            OperationParams::Locating(p) => p.append_directives(ctx),
        }
    }
}
