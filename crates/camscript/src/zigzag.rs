use crate::error::{CamError, Result};
use crate::geometry::Point3;
use crate::operation::{Operation, OperationKind};
use crate::script::{quote, EmitContext};
use crate::types::ToolKind;
use serde::{Deserialize, Serialize};

/// Raster direction of a zig-zag finishing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZigZagDirection {
    X,
    Y,
}

impl ZigZagDirection {
    pub fn code(self) -> i32 {
        match self {
            ZigZagDirection::X => 0,
            ZigZagDirection::Y => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ZigZagDirection::X),
            1 => Some(ZigZagDirection::Y),
            _ => None,
        }
    }
}

/// Settings of a 3D drop-cutter raster over the solids the host exports as STL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZigZagParams {
    /// Lower corner of the area to machine.
    pub box_min: Point3,
    /// Upper corner of the area to machine.
    pub box_max: Point3,
    /// Distance between raster lines (mm).
    pub step_over: f64,
    pub direction: ZigZagDirection,
    pub clearance_height: f64,
}

impl Default for ZigZagParams {
    fn default() -> Self {
        Self {
            box_min: Point3::new(-7.0, -7.0, -10.0),
            box_max: Point3::new(7.0, 7.0, 0.0),
            step_over: 1.0,
            direction: ZigZagDirection::X,
            clearance_height: 5.0,
        }
    }
}

impl ZigZagParams {
    pub fn append_directives(&self, operation: &Operation, ctx: &mut EmitContext<'_>) -> Result<()> {
        let tool = ctx.require_tool(operation.tool_number)?;
        if tool.diameter <= 0.0 {
            return Err(CamError::Operation(format!(
                "tool {} has no diameter for the cutter model",
                tool.tool_number
            )));
        }
        if self.step_over <= 0.0 {
            return Err(CamError::Operation("zig-zag step over must be positive".into()));
        }

        let radius = ctx.length(tool.radius());
        let cutter = if tool.kind == ToolKind::BallEndMill {
            format!("SphericalCutter({radius}, Point(0,0,7))")
        } else if tool.corner_radius > 0.0 {
            format!(
                "ToroidalCutter({radius}, {}, Point(0,0,7))",
                ctx.length(tool.corner_radius)
            )
        } else {
            format!("CylindricalCutter({radius}, Point(0,0,7))")
        };

        let stl = ctx.next_stl_file(OperationKind::ZigZag);
        ctx.line(format!("c = {cutter}"));
        ctx.line(format!("model = ImportModel({})", quote(&stl)));
        ctx.line("pg = DropCutter(c, model)");
        ctx.line(format!(
            "pathlist = pg.GenerateToolPath({}, {}, {}, {}, {}, {}, {}, {}, {})",
            ctx.length(self.box_min.x),
            ctx.length(self.box_max.x),
            ctx.length(self.box_min.y),
            ctx.length(self.box_max.y),
            ctx.length(self.box_min.z),
            ctx.length(self.box_max.z),
            ctx.length(self.step_over),
            ctx.length(self.step_over),
            self.direction.code()
        ));
        ctx.line(format!(
            "h = HeeksCNCExporter({})",
            ctx.length(self.clearance_height)
        ));
        ctx.line("h.AddPathList(pathlist)");
        ctx.line("");
        Ok(())
    }
}
