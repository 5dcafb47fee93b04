//! The program document: machine settings, operations, tool table and the
//! last generated script.

use crate::config::ProgramConfig;
use crate::error::{CamError, Result};
use crate::geometry::GeometryStore;
use crate::operation::OperationKind;
use crate::operations::Operations;
use crate::script::{format_number, interleave, quote, Directive, EmitContext, Platform, Script, ScriptOptions};
use crate::tool_library::Tools;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Millimetres per inch; also the stored unit value of imperial programs.
pub const INCH: f64 = 25.4;

/// Which representation of the program the user last worked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramUserType {
    Unknown,
    /// The operation tree drives the script.
    Tree,
    /// The script was edited by hand.
    Script,
    /// The NC output was edited by hand.
    NcCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDocument {
    /// Python module for the target machine, e.g. `nc.iso`.
    pub machine: String,
    pub output_file: String,
    /// Stored unit value; anything above 25.0 is treated as inches.
    pub units: f64,
    pub operations: Operations,
    pub tools: Tools,
    script: String,
    pub script_edited: bool,
    pub nc_code_edited: bool,
}

impl ProgramDocument {
    /// Create an empty program with the remembered settings.
    pub fn new(config: &ProgramConfig) -> Self {
        Self {
            machine: config.machine.clone(),
            output_file: config.output_file.clone(),
            units: config.units,
            operations: Operations::new(),
            tools: Tools::new(),
            script: String::new(),
            script_edited: false,
            nc_code_edited: false,
        }
    }

    /// Divisor turning millimetres into program units.
    pub fn unit_scale(&self) -> f64 {
        if self.is_imperial() {
            INCH
        } else {
            1.0
        }
    }

    pub fn is_imperial(&self) -> bool {
        self.units > 25.0
    }

    pub fn set_machine(&mut self, machine: impl Into<String>, config: &mut ProgramConfig) {
        self.machine = machine.into();
        config.machine = self.machine.clone();
    }

    pub fn set_output_file(&mut self, output_file: impl Into<String>, config: &mut ProgramConfig) {
        self.output_file = output_file.into();
        config.output_file = self.output_file.clone();
    }

    /// Apply the units choice list: 0 is millimetres, anything else inches.
    pub fn set_units_choice(&mut self, choice: usize, config: &mut ProgramConfig) {
        self.units = if choice == 0 { 1.0 } else { INCH };
        config.units = self.units;
    }

    /// The last successfully generated script.
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Replace the script with hand-edited text.
    pub fn set_script(&mut self, script: impl Into<String>) {
        self.script = script.into();
        self.script_edited = true;
    }

    pub(crate) fn restore_script(&mut self, script: String) {
        self.script = script;
    }

    pub fn user_type(&self) -> ProgramUserType {
        if self.nc_code_edited {
            ProgramUserType::NcCode
        } else if self.script_edited {
            ProgramUserType::Script
        } else if !self.operations.is_empty() {
            ProgramUserType::Tree
        } else {
            ProgramUserType::Unknown
        }
    }

    /// Build the whole program from the operations and tool table.
    pub fn assemble(&self, geometry: &dyn GeometryStore, options: &ScriptOptions) -> Result<Script> {
        if !self.units.is_finite() {
            return Err(CamError::NonFinite("the program units"));
        }
        let mut lines: Vec<String> = Vec::new();

        if options.platform == Platform::Unix {
            lines.push("import sys".into());
            lines.push(format!("sys.path.insert(0,{})", quote(&options.lib_dir)));
        }

        if self.operations.contains_kind(OperationKind::Profile) {
            lines.push("import kurve".into());
            lines.push("import kurve_funcs".into());
        }
        if self.operations.contains_kind(OperationKind::Pocket) {
            lines.push("import area".into());
            lines.push(format!("area.set_units({})", format_number(self.units)));
            lines.push("import area_funcs".into());
        }
        if self.operations.contains_kind(OperationKind::ZigZag) {
            if options.platform == Platform::Windows {
                lines.push("import sys".into());
            }
            lines.push("sys.path.insert(0,'PyCam/trunk')".into());
            lines.push(String::new());
            lines.extend(
                [
                    "from pycam.Geometry import *",
                    "from pycam.Cutters.SphericalCutter import *",
                    "from pycam.Cutters.CylindricalCutter import *",
                    "from pycam.Cutters.ToroidalCutter import *",
                    "from pycam.Importers.STLImporter import ImportModel",
                    "from pycam.PathGenerators.DropCutter import DropCutter",
                    "from PyCamToHeeks import HeeksCNCExporter",
                ]
                .map(String::from),
            );
            lines.push(String::new());
        }
        if self.operations.contains_kind(OperationKind::Adaptive) {
            lines.push("import actp_funcs".into());
            lines.push("import actp".into());
            lines.push(String::new());
        }

        lines.push("from nc.nc import *".into());
        lines.push(format!("import {}", self.machine));
        lines.push(String::new());
        lines.push(format!("output({})", quote(&self.output_file)));
        lines.push("absolute()".into());
        lines.push(if self.is_imperial() { "imperial()" } else { "metric()" }.into());
        lines.push("set_plane(0)".into());
        lines.push(String::new());

        let unit_scale = self.unit_scale();
        for tool in self.tools.iter() {
            lines.push(tool.definition_line(unit_scale));
        }

        let mut directives: Vec<Directive> = lines.into_iter().map(Directive::Line).collect();

        let sorted = self.operations.sorted();
        let mut ctx = EmitContext::new(geometry, &self.tools, unit_scale, options);
        directives.extend(interleave(&sorted, |operation| {
            operation.append_directives(&mut ctx)?;
            ctx.finish()
        })?);

        debug!(directives = directives.len(), "assembled program");
        Ok(Script { directives })
    }

    /// Regenerate the script. The stored script only changes when every
    /// operation emitted successfully.
    pub fn rewrite_program(
        &mut self,
        geometry: &dyn GeometryStore,
        options: &ScriptOptions,
    ) -> Result<Script> {
        let script = self.assemble(geometry, options)?;
        self.script = script.text();
        self.script_edited = false;
        info!(
            operations = self.operations.len(),
            tools = self.tools.len(),
            bytes = self.script.len(),
            "rewrote program"
        );
        Ok(script)
    }

    /// Write the document as XML.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        crate::xml::save_document(self, path)
    }

    /// Read a document written by [`ProgramDocument::save_to_path`].
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        crate::xml::load_document(path)
    }
}
