use crate::script::{format_number, quote};
use serde::{Deserialize, Serialize};

/// Represents a single cutting tool in the tool table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingTool {
    /// Number operations use to select this tool. Never 0.
    pub tool_number: u32,
    pub title: String,
    /// The specific geometry of the tool.
    pub kind: ToolKind,
    pub diameter: f64,
    /// Length offset applied by the controller; 0 when unknown.
    pub tool_length_offset: f64,
    /// Radius of the rounded corner at the tip, 0 for a square end mill.
    pub corner_radius: f64,
}

/// Defines the geometric type of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolKind {
    Drill,
    CentreDrill,
    /// A flat-bottomed cylindrical cutter.
    EndMill,
    SlotCutter,
    /// A cylindrical cutter with a hemispherical tip.
    BallEndMill,
    Chamfer,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Drill => "drill",
            ToolKind::CentreDrill => "centre_drill",
            ToolKind::EndMill => "end_mill",
            ToolKind::SlotCutter => "slot_cutter",
            ToolKind::BallEndMill => "ball_end_mill",
            ToolKind::Chamfer => "chamfer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "drill" => Some(ToolKind::Drill),
            "centre_drill" => Some(ToolKind::CentreDrill),
            "end_mill" => Some(ToolKind::EndMill),
            "slot_cutter" => Some(ToolKind::SlotCutter),
            "ball_end_mill" => Some(ToolKind::BallEndMill),
            "chamfer" => Some(ToolKind::Chamfer),
            _ => None,
        }
    }
}

impl CuttingTool {
    pub fn new(tool_number: u32, title: impl Into<String>, kind: ToolKind, diameter: f64) -> Self {
        Self {
            tool_number,
            title: title.into(),
            kind,
            diameter,
            tool_length_offset: 0.0,
            corner_radius: if kind == ToolKind::BallEndMill {
                diameter / 2.0
            } else {
                0.0
            },
        }
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    /// The `tool_defn(...)` line declaring this tool to the NC toolchain.
    ///
    /// Unknown values are written as `None`.
    pub fn definition_line(&self, unit_scale: f64) -> String {
        let name = if self.title.is_empty() {
            "None".to_string()
        } else {
            quote(&self.title)
        };
        let radius = if self.diameter > 0.0 && self.diameter.is_finite() {
            format_number(self.radius() / unit_scale)
        } else {
            "None".to_string()
        };
        let length = if self.tool_length_offset > 0.0 && self.tool_length_offset.is_finite() {
            format_number(self.tool_length_offset / unit_scale)
        } else {
            "None".to_string()
        };
        format!(
            "tool_defn( id={}, name={}, radius={}, length={})",
            self.tool_number, name, radius, length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_construction() {
        let tool = CuttingTool::new(1, "6mm Endmill", ToolKind::EndMill, 6.0);
        assert_eq!(tool.radius(), 3.0);
        assert_eq!(tool.corner_radius, 0.0);
    }

    #[test]
    fn test_ball_end_mill_corner_radius() {
        let tool = CuttingTool::new(2, "Ball", ToolKind::BallEndMill, 8.0);
        assert_eq!(tool.corner_radius, 4.0);
    }

    #[test]
    fn test_definition_line() {
        let mut tool = CuttingTool::new(1, "6mm Endmill", ToolKind::EndMill, 6.0);
        tool.tool_length_offset = 40.0;
        assert_eq!(
            tool.definition_line(1.0),
            "tool_defn( id=1, name='6mm Endmill', radius=3, length=40)"
        );
    }

    #[test]
    fn test_definition_line_in_inches_with_unknowns() {
        let tool = CuttingTool::new(4, "", ToolKind::Drill, 25.4);
        assert_eq!(
            tool.definition_line(25.4),
            "tool_defn( id=4, name=None, radius=0.5, length=None)"
        );
    }

    #[test]
    fn test_definition_line_keeps_line_breaks_inside_the_name() {
        let mut tool = CuttingTool::new(3, "bad\nname", ToolKind::EndMill, 2.0);
        tool.tool_length_offset = f64::INFINITY;
        let line = tool.definition_line(1.0);
        assert_eq!(line.lines().count(), 1);
        assert_eq!(line, "tool_defn( id=3, name='bad\\nname', radius=1, length=None)");
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [
            ToolKind::Drill,
            ToolKind::CentreDrill,
            ToolKind::EndMill,
            ToolKind::SlotCutter,
            ToolKind::BallEndMill,
            ToolKind::Chamfer,
        ] {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
    }
}
