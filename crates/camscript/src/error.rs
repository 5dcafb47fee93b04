//! Error types for program assembly.

use crate::geometry::ids::SymbolReference;
use crate::operation::OperationId;
use thiserror::Error;

/// Errors raised while building or assembling a CAM program.
#[derive(Error, Debug)]
pub enum CamError {
    /// A symbol reference points at geometry that no longer exists.
    #[error("unresolved symbol reference {0}")]
    UnresolvedReference(SymbolReference),

    /// A container was asked to hold an object kind it does not accept.
    #[error("{container} cannot hold {kind} objects")]
    InvalidChild {
        container: &'static str,
        kind: &'static str,
    },

    /// The intersection backend could not handle a pair of elements.
    #[error("geometry query failed: {0}")]
    GeometryQuery(String),

    /// An operation needs a cutting tool that is not in the tool table.
    #[error("tool {tool_number} is not in the tool table")]
    MissingTool { tool_number: u32 },

    /// A tool cannot be put in the tool table under this number.
    #[error("tool number {tool_number} {reason}")]
    InvalidTool {
        tool_number: u32,
        reason: &'static str,
    },

    /// An operation's own parameters cannot produce a body.
    #[error("{0}")]
    Operation(String),

    /// A number that would be written into the script is infinite or NaN.
    #[error("{0} is not a finite number")]
    NonFinite(&'static str),

    /// Emission of one operation failed, so the whole program was abandoned.
    #[error("operation '{title}' ({operation}) failed: {source}")]
    Assembly {
        operation: OperationId,
        title: String,
        #[source]
        source: Box<CamError>,
    },

    /// The persisted document does not have the expected structure.
    #[error("malformed program document: {0}")]
    Xml(String),
}

/// Result type for program operations.
pub type Result<T> = std::result::Result<T, CamError>;
