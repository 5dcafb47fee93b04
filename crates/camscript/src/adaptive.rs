use crate::error::{CamError, Result};
use crate::geometry::Point3;
use crate::operation::{Operation, OperationKind};
use crate::script::{quote, EmitContext};
use serde::{Deserialize, Serialize};

/// Settings of an adaptive roughing pass over the solids the host exports as STL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveParams {
    pub leadoff_dz: f64,
    pub leadoff_len: f64,
    pub leadoff_rad: f64,
    pub retract_z_height: f64,
    pub leadoff_sample_step: f64,
    pub sample_step: f64,
    pub step_down: f64,
    pub clear_cusp_height: f64,
    pub hold_back_offset: f64,
    pub step_over: f64,
    /// Where the cutter enters the stock.
    pub start: Point3,
    /// Stock boundary, lower corner.
    pub box_min: Point3,
    /// Stock boundary, upper corner.
    pub box_max: Point3,
    pub clearance_height: f64,
    pub rapid_down_to_height: f64,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            leadoff_dz: 0.1,
            leadoff_len: 1.1,
            leadoff_rad: 0.6,
            retract_z_height: 5.0,
            leadoff_sample_step: 0.6,
            sample_step: 0.4,
            step_down: 5.0,
            clear_cusp_height: 0.9,
            hold_back_offset: 1.5,
            step_over: 1.0,
            start: Point3::new(-40.0, -40.0, 0.0),
            box_min: Point3::new(-30.0, -30.0, -10.0),
            box_max: Point3::new(30.0, 30.0, 0.0),
            clearance_height: 5.0,
            rapid_down_to_height: 2.0,
        }
    }
}

impl AdaptiveParams {
    pub fn append_directives(&self, operation: &Operation, ctx: &mut EmitContext<'_>) -> Result<()> {
        let tool = ctx.require_tool(operation.tool_number)?;
        if tool.diameter <= 0.0 {
            return Err(CamError::Operation(format!(
                "tool {} has no diameter for the cutter model",
                tool.tool_number
            )));
        }
        let flat_radius = (tool.radius() - tool.corner_radius).max(0.0);

        let settings = [
            ("setleadoffdz", self.leadoff_dz),
            ("setleadofflen", self.leadoff_len),
            ("setleadoffrad", self.leadoff_rad),
            ("setretractzheight", self.retract_z_height),
            ("setleadoffsamplestep", self.leadoff_sample_step),
            ("settoolcornerrad", tool.corner_radius),
            ("settoolflatrad", flat_radius),
            ("setsamplestep", self.sample_step),
            ("setstepdown", self.step_down),
            ("setclearcuspheight", self.clear_cusp_height),
            ("setholdbackoffset", self.hold_back_offset),
            ("setstepover", self.step_over),
        ];
        for (call, value) in settings {
            let value = ctx.length(value);
            ctx.line(format!("actp.{call}({value})"));
        }

        let stl = ctx.next_stl_file(OperationKind::Adaptive);
        ctx.line(format!(
            "actp.makerough({}, {}, {}, {}, {}, {}, {})",
            quote(&stl),
            ctx.length(self.start.x),
            ctx.length(self.start.y),
            ctx.length(self.box_min.x),
            ctx.length(self.box_min.y),
            ctx.length(self.box_max.x),
            ctx.length(self.box_max.y)
        ));
        ctx.line(format!(
            "actp_funcs.cut({}, {}, {})",
            ctx.length(self.clearance_height),
            ctx.length(self.rapid_down_to_height),
            ctx.length(self.box_min.z)
        ));
        ctx.line("");
        Ok(())
    }
}
