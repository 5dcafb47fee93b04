use crate::error::{CamError, Result};
use crate::operation::{DepthParams, Operation};
use crate::profile::{curve_spans, resolve_curves};
use crate::geometry::SymbolReference;
use crate::script::{py_bool, EmitContext};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings of a 2D pocketing operation clearing the inside of closed curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PocketParams {
    /// Closed curves bounding the pocket; inner curves become islands.
    pub symbols: Vec<SymbolReference>,
    pub depths: DepthParams,
    /// Distance between passes (mm).
    pub stepover: f64,
    pub extra_offset: f64,
    /// Start in the middle and work outwards.
    pub from_center: bool,
    pub keep_tool_down: bool,
    pub use_zig_zag: bool,
    /// Raster angle in degrees, only used with zig-zag clearing.
    pub zig_angle: f64,
}

impl Default for PocketParams {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            depths: DepthParams::default(),
            stepover: 1.0,
            extra_offset: 0.0,
            from_center: true,
            keep_tool_down: false,
            use_zig_zag: false,
            zig_angle: 0.0,
        }
    }
}

impl PocketParams {
    /// Emit an `area.Area` built from the closed curves, then the pocket call.
    pub fn append_directives(&self, operation: &Operation, ctx: &mut EmitContext<'_>) -> Result<()> {
        let tool = ctx.require_tool(operation.tool_number)?;
        if tool.diameter <= 0.0 {
            return Err(CamError::Operation(format!(
                "tool {} has no diameter to clear with",
                tool.tool_number
            )));
        }

        let curves: Vec<_> = resolve_curves(ctx, &self.symbols)
            .into_iter()
            .filter(|curve| {
                let closed = curve.is_closed();
                if !closed {
                    warn!(operation = %operation.id, "pocket ignores an open curve");
                }
                closed
            })
            .collect();
        if curves.is_empty() {
            warn!(operation = %operation.id, "pocket has no closed curves to clear");
            return Ok(());
        }

        ctx.line("a = area.Area()");
        for curve in &curves {
            ctx.line("c = area.Curve()");
            for span in curve_spans(curve) {
                ctx.line(format!(
                    "c.append(area.Vertex({}, area.Point({}, {}), area.Point({}, {})))",
                    span.kind,
                    ctx.length(span.x),
                    ctx.length(span.y),
                    ctx.length(span.cx),
                    ctx.length(span.cy)
                ));
            }
            ctx.line("a.append(c)");
        }

        let d = &self.depths;
        ctx.line(format!(
            "area_funcs.pocket(a, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
            ctx.length(tool.radius()),
            ctx.length(self.extra_offset),
            ctx.length(d.rapid_down_to_height),
            ctx.length(d.start_depth),
            ctx.length(d.final_depth),
            ctx.length(self.stepover),
            ctx.length(d.step_down),
            ctx.length(d.clearance_height),
            py_bool(self.from_center),
            py_bool(self.keep_tool_down),
            py_bool(self.use_zig_zag),
            ctx.number(self.zig_angle)
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ShapeRegistry;
    use crate::operation::OperationParams;
    use crate::script::ScriptOptions;
    use crate::tool_library::Tools;
    use crate::types::{CuttingTool, ToolKind};

    #[test]
    fn test_pocket_skips_open_curves() {
        let mut shapes = ShapeRegistry::new();
        let circle = shapes.create_circle((0.0, 0.0), 10.0);
        let line = shapes.create_line((0.0, 0.0), (5.0, 5.0));
        let mut tools = Tools::new();
        tools
            .add(CuttingTool::new(2, "3mm Endmill", ToolKind::EndMill, 3.0))
            .unwrap();
        let options = ScriptOptions::default();
        let mut ctx = EmitContext::new(&shapes, &tools, 1.0, &options);

        let params = PocketParams {
            symbols: vec![circle, line],
            ..PocketParams::default()
        };
        let op = Operation::new("Pocket", OperationParams::Pocket(params.clone())).with_tool(2);
        params.append_directives(&op, &mut ctx).expect("pocket should emit");
        let lines = ctx.take_lines();

        assert_eq!(lines.iter().filter(|l| *l == "c = area.Curve()").count(), 1);
        assert_eq!(
            lines.last().unwrap(),
            "area_funcs.pocket(a, 1.5, 0, 2, 0, -1, 1, 1, 5, True, False, False, 0)"
        );
    }

    #[test]
    fn test_pocket_in_inches_scales_lengths() {
        let mut shapes = ShapeRegistry::new();
        let circle = shapes.create_circle((25.4, 0.0), 12.7);
        let mut tools = Tools::new();
        tools
            .add(CuttingTool::new(1, "Half inch", ToolKind::EndMill, 12.7))
            .unwrap();
        let options = ScriptOptions::default();
        let mut ctx = EmitContext::new(&shapes, &tools, 25.4, &options);
        let params = PocketParams {
            symbols: vec![circle],
            ..PocketParams::default()
        };
        let op = Operation::new("Pocket", OperationParams::Pocket(params.clone())).with_tool(1);
        params.append_directives(&op, &mut ctx).unwrap();
        let lines = ctx.take_lines();
        assert_eq!(lines[2], "c.append(area.Vertex(0, area.Point(1.5, 0), area.Point(0, 0)))");
    }

    #[test]
    fn test_pocket_with_only_open_curves_emits_nothing() {
        let mut shapes = ShapeRegistry::new();
        let line = shapes.create_line((0.0, 0.0), (5.0, 5.0));
        let mut tools = Tools::new();
        tools
            .add(CuttingTool::new(1, "Endmill", ToolKind::EndMill, 3.0))
            .unwrap();
        let options = ScriptOptions::default();
        let mut ctx = EmitContext::new(&shapes, &tools, 1.0, &options);
        let params = PocketParams {
            symbols: vec![line],
            ..PocketParams::default()
        };
        let op = Operation::new("Pocket", OperationParams::Pocket(params.clone())).with_tool(1);
        params.append_directives(&op, &mut ctx).unwrap();
        assert!(ctx.take_lines().is_empty());
    }
}
