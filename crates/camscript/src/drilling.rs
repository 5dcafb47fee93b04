use crate::error::{CamError, Result};
use crate::geometry::SymbolReference;
use crate::locating::find_locations;
use crate::script::EmitContext;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings of a canned drilling cycle at every location found in the selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillingParams {
    pub symbols: Vec<SymbolReference>,
    /// Retract height above the starting Z (R word).
    pub standoff: f64,
    /// Pause at the bottom of the hole, in seconds.
    pub dwell: f64,
    /// Hole depth below the location.
    pub depth: f64,
    /// Peck increment; 0 drills in one plunge.
    pub peck_depth: f64,
    pub sort_locations: bool,
}

impl Default for DrillingParams {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            standoff: 5.0,
            dwell: 0.0,
            depth: 10.0,
            peck_depth: 0.0,
            sort_locations: true,
        }
    }
}

impl DrillingParams {
    pub fn append_directives(&self, ctx: &mut EmitContext<'_>) -> Result<()> {
        if self.depth <= 0.0 {
            return Err(CamError::Operation(format!(
                "drilling depth {} must be positive",
                self.depth
            )));
        }
        let locations = find_locations(ctx, &self.symbols, self.sort_locations);
        if locations.is_empty() {
            warn!("drilling found no hole locations, skipping the cycle");
            return Ok(());
        }

        for location in locations {
            ctx.line(format!(
                "drill(x={}, y={}, z={}, depth={}, standoff={}, dwell={}, peck_depth={})",
                ctx.length(location.x),
                ctx.length(location.y),
                ctx.length(location.z),
                ctx.length(self.depth),
                ctx.length(self.standoff),
                ctx.number(self.dwell),
                ctx.length(self.peck_depth)
            ));
        }
        ctx.line("end_canned_cycle()");
        Ok(())
    }
}
