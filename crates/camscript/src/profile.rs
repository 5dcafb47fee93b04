use crate::error::{CamError, Result};
use crate::geometry::intersect::FLATTEN_TOLERANCE;
use crate::geometry::{resolve_all, Curve, Geometry, SymbolReference};
use crate::operation::{DepthParams, Operation};
use crate::script::EmitContext;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::warn;

/// Which side of the curve the tool runs on, looking along the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolSide {
    Left,
    Right,
    On,
}

impl ToolSide {
    pub fn name(self) -> &'static str {
        match self {
            ToolSide::Left => "left",
            ToolSide::Right => "right",
            ToolSide::On => "on",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(ToolSide::Left),
            "right" => Some(ToolSide::Right),
            "on" => Some(ToolSide::On),
            _ => None,
        }
    }
}

/// Settings of a 2D profile cut along one or more curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileParams {
    /// The curves to cut along.
    pub symbols: Vec<SymbolReference>,
    pub side: ToolSide,
    pub depths: DepthParams,
    /// Additional offset beyond the tool radius, e.g. to leave a finishing allowance.
    pub extra_offset: f64,
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            side: ToolSide::On,
            depths: DepthParams::default(),
            extra_offset: 0.0,
        }
    }
}

/// One span of a curve in the toolchain's vertex form.
///
/// `kind` is 0 for a straight move, 1 for a counter-clockwise arc and -1 for
/// a clockwise arc; arcs carry their centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub kind: i32,
    pub x: f64,
    pub y: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Span {
    fn line_to(x: f64, y: f64) -> Self {
        Self {
            kind: 0,
            x,
            y,
            cx: 0.0,
            cy: 0.0,
        }
    }

    fn arc_to(kind: i32, x: f64, y: f64, cx: f64, cy: f64) -> Self {
        Self { kind, x, y, cx, cy }
    }
}

/// Break a curve into vertex spans. The first span is always a move to the start.
pub fn curve_spans(curve: &Curve) -> Vec<Span> {
    match curve {
        Curve::Line(line) => vec![
            Span::line_to(line.p0.x, line.p0.y),
            Span::line_to(line.p1.x, line.p1.y),
        ],
        Curve::Circle(circle) => circle_spans(circle.center.x, circle.center.y, circle.radius),
        Curve::Arc(arc) => {
            let (cx, cy, r) = (arc.center.x, arc.center.y, arc.radii.x);
            if arc.sweep_angle.abs() >= TAU {
                return circle_spans(cx, cy, r);
            }
            let end_angle = arc.start_angle + arc.sweep_angle;
            let kind = if arc.sweep_angle > 0.0 { 1 } else { -1 };
            vec![
                Span::line_to(cx + r * arc.start_angle.cos(), cy + r * arc.start_angle.sin()),
                Span::arc_to(kind, cx + r * end_angle.cos(), cy + r * end_angle.sin(), cx, cy),
            ]
        }
        Curve::BezPath(_) => curve
            .flatten(FLATTEN_TOLERANCE)
            .into_iter()
            .map(|(x, y)| Span::line_to(x, y))
            .collect(),
    }
}

fn circle_spans(cx: f64, cy: f64, r: f64) -> Vec<Span> {
    vec![
        Span::line_to(cx + r, cy),
        Span::arc_to(1, cx - r, cy, cx, cy),
        Span::arc_to(1, cx + r, cy, cx, cy),
    ]
}

/// Resolve the referenced curves, ignoring points and deleted elements.
pub(crate) fn resolve_curves(ctx: &EmitContext<'_>, symbols: &[SymbolReference]) -> Vec<Curve> {
    resolve_all(ctx.geometry, symbols)
        .into_iter()
        .filter_map(|geometry| match geometry {
            Geometry::Curve(curve) => Some(curve),
            Geometry::Point(_) => None,
        })
        .collect()
}

impl ProfileParams {
    /// Emit one `kurve` per curve followed by the profile call.
    pub fn append_directives(&self, operation: &Operation, ctx: &mut EmitContext<'_>) -> Result<()> {
        let tool = ctx.require_tool(operation.tool_number)?;
        if tool.diameter <= 0.0 {
            return Err(CamError::Operation(format!(
                "tool {} has no diameter to offset by",
                tool.tool_number
            )));
        }

        let curves = resolve_curves(ctx, &self.symbols);
        if curves.is_empty() {
            warn!(operation = %operation.id, "profile has no curves to cut");
            return Ok(());
        }

        let d = &self.depths;
        for curve in &curves {
            ctx.line("k = kurve.new()");
            for span in curve_spans(curve) {
                ctx.line(format!(
                    "kurve.add_point(k, {}, {}, {}, {}, {})",
                    span.kind,
                    ctx.length(span.x),
                    ctx.length(span.y),
                    ctx.length(span.cx),
                    ctx.length(span.cy)
                ));
            }
            ctx.line(format!(
                "kurve_funcs.profile(k, '{}', {}, {}, {}, {}, {}, {}, {})",
                self.side.name(),
                ctx.length(tool.radius()),
                ctx.length(self.extra_offset),
                ctx.length(d.clearance_height),
                ctx.length(d.rapid_down_to_height),
                ctx.length(d.start_depth),
                ctx.length(d.step_down),
                ctx.length(d.final_depth)
            ));
        }
        Ok(())
    }
}
