//! Locating cycles: move above each location derived from the selected
//! geometry and pause so the operator can work by hand (tapping, for
//! example), then resume to the next location.

use crate::error::Result;
use crate::geometry::{reduce, resolve_all, sort_by_proximity, LocationPoint, SymbolReference};
use crate::script::EmitContext;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatingParams {
    /// Elements whose points, isolated circle centres and crossings are visited.
    pub symbols: Vec<SymbolReference>,
    /// Height above each location the machine stops at (mm).
    pub standoff: f64,
    /// Visit locations nearest-first instead of in selection order.
    pub sort_locations: bool,
}

impl Default for LocatingParams {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            standoff: 5.0,
            sort_locations: true,
        }
    }
}

/// Resolve the selection and reduce it to the locations to visit.
pub fn find_locations(
    ctx: &EmitContext<'_>,
    symbols: &[SymbolReference],
    sort_locations: bool,
) -> Vec<LocationPoint> {
    let handles = resolve_all(ctx.geometry, symbols);
    let locations = reduce(&handles);
    if sort_locations {
        sort_by_proximity(&locations, LocationPoint::new(0.0, 0.0, 0.0))
    } else {
        locations
    }
}

impl LocatingParams {
    pub fn append_directives(&self, ctx: &mut EmitContext<'_>) -> Result<()> {
        let locations = find_locations(ctx, &self.symbols, self.sort_locations);
        if locations.is_empty() {
            warn!("locating operation found no locations");
            return Ok(());
        }

        for location in locations {
            ctx.line(format!(
                "rapid(x={}, y={})",
                ctx.length(location.x),
                ctx.length(location.y)
            ));
            ctx.line(format!("rapid(z={})", ctx.length(location.z + self.standoff)));
            ctx.line("program_stop(optional=False)");
        }
        Ok(())
    }
}
