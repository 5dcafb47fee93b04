mod adaptive;
mod config;
mod drilling;
mod error;
pub mod geometry;
mod locating;
mod operation;
mod operations;
mod pocket;
mod profile;
mod program;
mod script;
mod tool_library;
mod types;
pub mod xml;
mod zigzag;

pub use adaptive::AdaptiveParams;
pub use config::*;
pub use drilling::DrillingParams;
pub use error::{CamError, Result};
pub use geometry::*;
pub use locating::{find_locations, LocatingParams};
pub use operation::*;
pub use operations::*;
pub use pocket::PocketParams;
pub use profile::{curve_spans, ProfileParams, Span, ToolSide};
pub use program::*;
pub use script::*;
pub use tool_library::*;
pub use types::*;
pub use zigzag::{ZigZagDirection, ZigZagParams};
