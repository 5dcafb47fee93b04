//! The generated program: an ordered stream of directives rendered as a
//! line-oriented Python script for the downstream NC toolchain.

use crate::error::{CamError, Result};
use crate::geometry::GeometryStore;
use crate::operation::{Operation, OperationId, OperationKind};
use crate::tool_library::Tools;
use crate::types::CuttingTool;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::path::PathBuf;

/// One unit of emitted script output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    /// A framing line: imports, mode calls, tool definitions, blank lines.
    Line(String),
    /// Switch the active cutting tool.
    ToolChange { tool_number: u32 },
    /// The body of one active operation.
    Operation {
        id: OperationId,
        kind: OperationKind,
        lines: Vec<String>,
    },
}

impl Directive {
    fn render(&self, out: &mut String) {
        match self {
            Directive::Line(line) => {
                out.push_str(line);
                out.push('\n');
            }
            Directive::ToolChange { tool_number } => {
                out.push_str(&format!("tool_change( id={tool_number})\n"));
            }
            Directive::Operation { lines, .. } => {
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
    }
}

/// A fully assembled program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub directives: Vec<Directive>,
}

impl Script {
    /// Render the directives as script text.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for directive in &self.directives {
            directive.render(&mut out);
        }
        out
    }

    /// Tool numbers in the order they are switched to.
    pub fn tool_changes(&self) -> Vec<u32> {
        self.directives
            .iter()
            .filter_map(|d| match d {
                Directive::ToolChange { tool_number } => Some(*tool_number),
                _ => None,
            })
            .collect()
    }

    /// Ids of the operations that produced a body, in output order.
    pub fn operation_ids(&self) -> Vec<OperationId> {
        self.directives
            .iter()
            .filter_map(|d| match d {
                Directive::Operation { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// The tool-change and operation directives, without framing lines.
    pub fn body(&self) -> Vec<&Directive> {
        self.directives
            .iter()
            .filter(|d| !matches!(d, Directive::Line(_)))
            .collect()
    }
}

/// Walk operations in order, switching tools whenever the next operation
/// needs a different one, and emitting bodies for active operations.
///
/// Inactive operations still take part in the tool check; they only skip
/// their own body.
pub fn interleave<'o, F>(sorted: &[&'o Operation], mut emit: F) -> Result<Vec<Directive>>
where
    F: FnMut(&'o Operation) -> Result<Vec<String>>,
{
    let mut directives = Vec::new();
    let mut current_tool = 0u32;

    for operation in sorted {
        if operation.tool_number > 0 && operation.tool_number != current_tool {
            directives.push(Directive::ToolChange {
                tool_number: operation.tool_number,
            });
            current_tool = operation.tool_number;
        }

        if operation.active {
            let lines = emit(operation).map_err(|err| CamError::Assembly {
                operation: operation.id,
                title: operation.title.clone(),
                source: Box::new(err),
            })?;
            directives.push(Directive::Operation {
                id: operation.id,
                kind: operation.kind(),
                lines,
            });
        }
    }

    Ok(directives)
}

/// Target platform of the generated script; only the path preamble differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Environment the script is generated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptOptions {
    pub platform: Platform,
    /// Directory holding the NC Python modules, added to `sys.path` on Unix.
    pub lib_dir: String,
    /// Directory where the host writes STL exports for ZigZag and Adaptive.
    pub stl_dir: PathBuf,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            lib_dir: crate::config::DEFAULT_LIB_DIR.to_string(),
            stl_dir: std::env::temp_dir(),
        }
    }
}

/// Everything an operation needs to write its body.
pub struct EmitContext<'a> {
    pub geometry: &'a dyn GeometryStore,
    pub tools: &'a Tools,
    /// 1.0 for millimetres, 25.4 for inches.
    pub unit_scale: f64,
    pub options: &'a ScriptOptions,
    zigzag_files: u32,
    adaptive_files: u32,
    lines: Vec<String>,
    non_finite: Cell<bool>,
}

impl<'a> EmitContext<'a> {
    pub fn new(
        geometry: &'a dyn GeometryStore,
        tools: &'a Tools,
        unit_scale: f64,
        options: &'a ScriptOptions,
    ) -> Self {
        Self {
            geometry,
            tools,
            unit_scale,
            options,
            zigzag_files: 1,
            adaptive_files: 1,
            lines: Vec::new(),
            non_finite: Cell::new(false),
        }
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Take the lines written since the last call.
    pub fn take_lines(&mut self) -> Vec<String> {
        self.non_finite.set(false);
        std::mem::take(&mut self.lines)
    }

    /// Take the lines written since the last call, failing if any number
    /// formatted in the meantime was infinite or NaN.
    pub fn finish(&mut self) -> Result<Vec<String>> {
        let non_finite = self.non_finite.get();
        let lines = self.take_lines();
        if non_finite {
            return Err(CamError::NonFinite("an operation parameter"));
        }
        Ok(lines)
    }

    /// Format a length in program units.
    pub fn length(&self, mm: f64) -> String {
        self.number(mm / self.unit_scale)
    }

    /// Format a unitless number such as a dwell time or an angle.
    pub fn number(&self, value: f64) -> String {
        if !value.is_finite() {
            self.non_finite.set(true);
        }
        format_number(value)
    }

    /// Look up the tool an operation needs.
    pub fn require_tool(&self, tool_number: u32) -> Result<&'a CuttingTool> {
        if tool_number == 0 {
            return Err(CamError::Operation(
                "operation needs a cutting tool but none is selected".into(),
            ));
        }
        self.tools
            .find(tool_number)
            .ok_or(CamError::MissingTool { tool_number })
    }

    /// Path of the next STL export for the given operation kind.
    pub fn next_stl_file(&mut self, kind: OperationKind) -> String {
        let (prefix, counter) = match kind {
            OperationKind::Adaptive => ("adaptive", &mut self.adaptive_files),
            _ => ("zigzag", &mut self.zigzag_files),
        };
        let name = format!("{prefix}{counter}.stl");
        *counter += 1;
        self.options.stl_dir.join(name).to_string_lossy().into_owned()
    }
}

/// Format a number the way the script expects: up to six decimals, no
/// trailing zeros. Magnitudes past 1e15 have no fractional digits to round.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() || value.abs() >= 1e15 {
        return format!("{value}");
    }
    let rounded = (value * 1e6).round() / 1e6;
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{rounded}")
}

/// Quote a string as a Python single-quoted literal. Control characters
/// are escaped so the literal never spans more than one line.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

/// Flatten text for a `#` comment: line breaks and other control
/// characters become spaces.
pub fn comment_text(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

pub fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drilling::DrillingParams;
    use crate::operation::OperationParams;
    use crate::pocket::PocketParams;
    use crate::profile::ProfileParams;

    fn op(params: OperationParams, order: i32, tool: u32, active: bool) -> Operation {
        let mut operation = Operation::new("op", params);
        operation.execution_order = order;
        operation.tool_number = tool;
        operation.active = active;
        operation
    }

    fn fake_body(operation: &Operation) -> Result<Vec<String>> {
        Ok(vec![format!("# {}", operation.kind().name())])
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(25.4), "25.4");
        assert_eq!(format_number(-0.0000001), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(1e300), format!("{}", 1e300));
        assert_eq!(format_number(-4e15), "-4000000000000000");
    }

    #[test]
    fn test_non_finite_numbers_fail_the_operation() {
        let shapes = crate::geometry::ShapeRegistry::new();
        let tools = Tools::new();
        let options = ScriptOptions::default();
        let mut ctx = EmitContext::new(&shapes, &tools, 1.0, &options);
        ctx.line(format!("rapid(z={})", ctx.length(f64::INFINITY)));
        assert!(matches!(ctx.finish(), Err(CamError::NonFinite(_))));

        ctx.line(format!("rapid(z={})", ctx.length(2.0)));
        assert_eq!(ctx.finish().unwrap(), vec!["rapid(z=2)"]);

        ctx.line(format!("dwell({})", ctx.number(f64::NAN)));
        assert!(ctx.finish().is_err());
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("it's"), "'it\\'s'");
        assert_eq!(quote("a\\b"), "'a\\\\b'");
        assert_eq!(quote("bad\nname"), "'bad\\nname'");
        assert_eq!(quote("a\r\tb\u{7}"), "'a\\r\\tb\\u0007'");
    }

    #[test]
    fn test_comment_text_stays_on_one_line() {
        assert_eq!(
            comment_text("Holes\nimport os\r\n"),
            "Holes import os  "
        );
        assert_eq!(comment_text("Pocket (2)"), "Pocket (2)");
    }

    #[test]
    fn test_tool_change_rendering() {
        let script = Script {
            directives: vec![Directive::ToolChange { tool_number: 3 }],
        };
        assert_eq!(script.text(), "tool_change( id=3)\n");
    }

    #[test]
    fn test_one_change_per_run_of_tools() {
        let ops = vec![
            op(OperationParams::Profile(ProfileParams::default()), 1, 1, true),
            op(OperationParams::Profile(ProfileParams::default()), 2, 1, true),
            op(OperationParams::Pocket(PocketParams::default()), 3, 2, true),
            op(OperationParams::Profile(ProfileParams::default()), 4, 1, true),
        ];
        let refs: Vec<&Operation> = ops.iter().collect();
        let directives = interleave(&refs, fake_body).unwrap();
        let script = Script { directives };
        assert_eq!(script.tool_changes(), vec![1, 2, 1]);
    }

    #[test]
    fn test_one_change_per_maximal_run_with_inactive_operations() {
        // Small linear congruential generator so the sequences are reproducible.
        let mut seed = 0x2545_f491_u64;
        let mut next = move |bound: u64| {
            seed = seed
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (seed >> 33) % bound
        };

        for _ in 0..200 {
            let len = 1 + next(12) as usize;
            let ops: Vec<Operation> = (0..len)
                .map(|i| {
                    op(
                        OperationParams::Profile(ProfileParams::default()),
                        i as i32,
                        next(4) as u32,
                        next(3) != 0,
                    )
                })
                .collect();
            let refs: Vec<&Operation> = ops.iter().collect();
            let script = Script {
                directives: interleave(&refs, fake_body).unwrap(),
            };

            let tools: Vec<u32> = ops.iter().map(|o| o.tool_number).collect();
            let mut runs: Vec<u32> = tools.iter().copied().filter(|&t| t > 0).collect();
            runs.dedup();
            assert_eq!(script.tool_changes(), runs, "tools {tools:?}");

            let active: Vec<OperationId> =
                ops.iter().filter(|o| o.active).map(|o| o.id).collect();
            assert_eq!(script.operation_ids(), active);
        }
    }

    #[test]
    fn test_tool_zero_never_changes_tool() {
        let ops = vec![
            op(OperationParams::Drilling(DrillingParams::default()), 1, 0, true),
            op(OperationParams::Drilling(DrillingParams::default()), 2, 0, true),
        ];
        let refs: Vec<&Operation> = ops.iter().collect();
        let script = Script {
            directives: interleave(&refs, fake_body).unwrap(),
        };
        assert!(script.tool_changes().is_empty());
        assert_eq!(script.operation_ids().len(), 2);
    }

    #[test]
    fn test_inactive_operation_still_changes_tool() {
        let ops = vec![
            op(OperationParams::Profile(ProfileParams::default()), 1, 1, true),
            op(OperationParams::Pocket(PocketParams::default()), 2, 2, false),
            op(OperationParams::Profile(ProfileParams::default()), 3, 1, true),
        ];
        let refs: Vec<&Operation> = ops.iter().collect();
        let script = Script {
            directives: interleave(&refs, fake_body).unwrap(),
        };
        assert_eq!(script.tool_changes(), vec![1, 2, 1]);
        assert_eq!(script.operation_ids(), vec![ops[0].id, ops[2].id]);
    }

    #[test]
    fn test_emitter_failure_aborts_with_operation_identity() {
        let ops = vec![op(OperationParams::Profile(ProfileParams::default()), 1, 1, true)];
        let refs: Vec<&Operation> = ops.iter().collect();
        let err = interleave(&refs, |_| Err(CamError::Operation("boom".into()))).unwrap_err();
        match err {
            CamError::Assembly { operation, .. } => assert_eq!(operation, ops[0].id),
            other => panic!("Expected Assembly error, got {other:?}"),
        }
    }
}
