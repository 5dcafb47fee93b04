use crate::error::{CamError, Result as CamResult};
use crate::operations::TreeObject;
use crate::types::CuttingTool;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// The tool table of a program. Also persisted on its own as a JSON tool library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Tools {
    tools: Vec<CuttingTool>,
}

impl Tools {
    /// Create an empty table.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Add a child object. Only cutting tools are accepted; tool numbers must
    /// be non-zero and unique, and sizes finite.
    pub fn add(&mut self, object: impl Into<TreeObject>) -> CamResult<usize> {
        let tool = match object.into() {
            TreeObject::CuttingTool(tool) => tool,
            other => {
                return Err(CamError::InvalidChild {
                    container: "Tools",
                    kind: other.type_name(),
                })
            }
        };
        if tool.tool_number == 0 {
            return Err(CamError::InvalidTool {
                tool_number: 0,
                reason: "is reserved for operations without a tool",
            });
        }
        let sizes = [tool.diameter, tool.tool_length_offset, tool.corner_radius];
        if sizes.iter().any(|size| !size.is_finite()) {
            return Err(CamError::InvalidTool {
                tool_number: tool.tool_number,
                reason: "has a size that is not a finite number",
            });
        }
        if self.find(tool.tool_number).is_some() {
            return Err(CamError::InvalidTool {
                tool_number: tool.tool_number,
                reason: "is already in the tool table",
            });
        }
        self.tools.push(tool);
        Ok(self.tools.len() - 1)
    }

    /// Find the tool with the given number.
    pub fn find(&self, tool_number: u32) -> Option<&CuttingTool> {
        self.tools.iter().find(|t| t.tool_number == tool_number)
    }

    pub fn find_mut(&mut self, tool_number: u32) -> Option<&mut CuttingTool> {
        self.tools.iter_mut().find(|t| t.tool_number == tool_number)
    }

    /// Remove the tool with the given number, returning it.
    pub fn remove(&mut self, tool_number: u32) -> Option<CuttingTool> {
        let index = self
            .tools
            .iter()
            .position(|t| t.tool_number == tool_number)?;
        Some(self.tools.remove(index))
    }

    /// Tools in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &CuttingTool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Load a library from the provided path. Missing files yield an empty
    /// library; entries `add` would refuse are skipped with a warning.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::new());
        }

        let data =
            fs::read(path).with_context(|| format!("read tool library {}", path.display()))?;
        let stored: Tools = serde_json::from_slice(&data).context("deserialize tool library")?;

        let mut library = Self::new();
        for tool in stored.tools {
            let tool_number = tool.tool_number;
            if let Err(e) = library.add(tool) {
                warn!(tool_number, path = %path.display(), "skipping tool library entry: {e}");
            }
        }
        Ok(library)
    }

    /// Persist the library to the provided path, ensuring the directory exists.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create tool library directory {}", parent.display()))?;
        }

        let data =
            serde_json::to_vec_pretty(self).context("serialize tool library to JSON bytes")?;
        fs::write(path, data).with_context(|| format!("write tool library {}", path.display()))
    }

    /// The default library path (`~/.camscript/tools.json`).
    pub fn default_library_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
        Ok(home.join(".camscript").join("tools.json"))
    }
}
