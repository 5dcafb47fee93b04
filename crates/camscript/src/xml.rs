//! XML persistence of program documents.
//!
//! A document is a `Program` element holding `Operations` and `Tools`.
//! Reading is lenient: attributes that fail to parse keep their default
//! values and unknown elements are skipped.

use crate::adaptive::AdaptiveParams;
use crate::config::ProgramConfig;
use crate::drilling::DrillingParams;
use crate::error::{CamError, Result};
use crate::geometry::{Point3, SymbolId, SymbolReference, SymbolType};
use crate::locating::LocatingParams;
use crate::operation::{DepthParams, Operation, OperationId, OperationKind, OperationParams};
use crate::pocket::PocketParams;
use crate::profile::{ProfileParams, ToolSide};
use crate::program::{ProgramDocument, INCH};
use crate::types::{CuttingTool, ToolKind};
use crate::zigzag::{ZigZagDirection, ZigZagParams};
use anyhow::Context;
use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

fn xml_error(err: impl std::fmt::Display) -> CamError {
    CamError::Xml(err.to_string())
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Attribute values in document order.
#[derive(Default)]
struct AttrList(Vec<(&'static str, String)>);

impl AttrList {
    fn str(&mut self, key: &'static str, value: &str) -> &mut Self {
        self.0.push((key, value.to_string()));
        self
    }

    fn num(&mut self, key: &'static str, value: impl ToString) -> &mut Self {
        self.0.push((key, value.to_string()));
        self
    }

    fn flag(&mut self, key: &'static str, value: bool) -> &mut Self {
        self.0.push((key, if value { "1" } else { "0" }.to_string()));
        self
    }

    fn point(&mut self, prefix: [&'static str; 3], point: Point3) -> &mut Self {
        self.num(prefix[0], point.x)
            .num(prefix[1], point.y)
            .num(prefix[2], point.z)
    }

    fn depths(&mut self, depths: &DepthParams) -> &mut Self {
        self.num("clearance_height", depths.clearance_height)
            .num("rapid_down_to_height", depths.rapid_down_to_height)
            .num("start_depth", depths.start_depth)
            .num("step_down", depths.step_down)
            .num("final_depth", depths.final_depth)
    }

    fn element(&self, name: &'static str) -> BytesStart<'static> {
        let mut elem = BytesStart::new(name);
        for (key, value) in &self.0 {
            let value = escape_attribute(value);
            elem.push_attribute(Attribute::from((key.as_bytes(), value.as_bytes())));
        }
        elem
    }
}

/// Escape markup and whitespace that attribute normalisation would otherwise
/// turn into spaces.
fn escape_attribute(value: &str) -> String {
    escape(value)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}

struct DocumentWriter {
    writer: Writer<Vec<u8>>,
}

impl DocumentWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(xml_error)
    }

    fn start(&mut self, name: &'static str, attrs: &AttrList) -> Result<()> {
        self.event(Event::Start(attrs.element(name)))
    }

    fn empty(&mut self, name: &'static str, attrs: &AttrList) -> Result<()> {
        self.event(Event::Empty(attrs.element(name)))
    }

    fn end(&mut self, name: &'static str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(xml_error)
    }
}

/// Units are stored as exactly 1.0 or 25.4.
fn normalized_units(units: f64) -> f64 {
    if units > 25.0 {
        INCH
    } else {
        1.0
    }
}

/// Serialize a program document.
pub fn write_program(doc: &ProgramDocument) -> Result<String> {
    let mut out = DocumentWriter::new();
    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut program = AttrList::default();
    program
        .str("machine", &doc.machine)
        .str("output_file", &doc.output_file)
        .str("program", doc.script())
        .num("units", normalized_units(doc.units));
    out.start("Program", &program)?;

    out.start("Operations", &AttrList::default())?;
    for operation in doc.operations.iter() {
        write_operation(&mut out, operation)?;
    }
    out.end("Operations")?;

    out.start("Tools", &AttrList::default())?;
    for tool in doc.tools.iter() {
        let mut attrs = AttrList::default();
        attrs
            .num("tool_number", tool.tool_number)
            .str("title", &tool.title)
            .str("kind", tool.kind.name())
            .num("diameter", tool.diameter)
            .num("tool_length_offset", tool.tool_length_offset)
            .num("corner_radius", tool.corner_radius);
        out.empty("CuttingTool", &attrs)?;
    }
    out.end("Tools")?;

    out.end("Program")?;
    out.finish()
}

fn write_operation(out: &mut DocumentWriter, operation: &Operation) -> Result<()> {
    let mut attrs = AttrList::default();
    attrs
        .str("id", &operation.id.to_string())
        .str("title", &operation.title)
        .flag("active", operation.active)
        .num("execution_order", operation.execution_order)
        .num("tool_number", operation.tool_number);

    match &operation.params {
        OperationParams::Profile(p) => {
            attrs
                .str("side", p.side.name())
                .num("extra_offset", p.extra_offset)
                .depths(&p.depths);
        }
        OperationParams::Pocket(p) => {
            attrs
                .depths(&p.depths)
                .num("stepover", p.stepover)
                .num("extra_offset", p.extra_offset)
                .flag("from_center", p.from_center)
                .flag("keep_tool_down", p.keep_tool_down)
                .flag("use_zig_zag", p.use_zig_zag)
                .num("zig_angle", p.zig_angle);
        }
        OperationParams::ZigZag(p) => {
            attrs
                .point(["minx", "miny", "minz"], p.box_min)
                .point(["maxx", "maxy", "maxz"], p.box_max)
                .num("step_over", p.step_over)
                .num("direction", p.direction.code())
                .num("clearance_height", p.clearance_height);
        }
        OperationParams::Adaptive(p) => {
            attrs
                .num("leadoff_dz", p.leadoff_dz)
                .num("leadoff_len", p.leadoff_len)
                .num("leadoff_rad", p.leadoff_rad)
                .num("retract_z_height", p.retract_z_height)
                .num("leadoff_sample_step", p.leadoff_sample_step)
                .num("sample_step", p.sample_step)
                .num("step_down", p.step_down)
                .num("clear_cusp_height", p.clear_cusp_height)
                .num("hold_back_offset", p.hold_back_offset)
                .num("step_over", p.step_over)
                .point(["startx", "starty", "startz"], p.start)
                .point(["minx", "miny", "minz"], p.box_min)
                .point(["maxx", "maxy", "maxz"], p.box_max)
                .num("clearance_height", p.clearance_height)
                .num("rapid_down_to_height", p.rapid_down_to_height);
        }
        OperationParams::Drilling(p) => {
            attrs
                .num("standoff", p.standoff)
                .num("dwell", p.dwell)
                .num("depth", p.depth)
                .num("peck_depth", p.peck_depth)
                .flag("sort_locations", p.sort_locations);
        }
        OperationParams::Locating(p) => {
            attrs
                .num("standoff", p.standoff)
                .flag("sort_locations", p.sort_locations);
        }
    }

    let name = operation.kind().name();
    let symbols = operation.params.symbols();
    if symbols.is_empty() {
        return out.empty(name, &attrs);
    }
    out.start(name, &attrs)?;
    for symbol in symbols {
        let mut attrs = AttrList::default();
        attrs
            .num("type", symbol.symbol_type.code())
            .num("id", symbol.id.value());
        out.empty("symbol", &attrs)?;
    }
    out.end(name)
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// A parsed element with its attributes and child elements.
#[derive(Debug)]
struct Element {
    name: String,
    attributes: HashMap<String, String>,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = HashMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(xml_error)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(xml_error)?.into_owned();
            attributes.insert(key, value);
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    fn attrs(&self) -> Attrs<'_> {
        Attrs { element: self }
    }
}

fn parse_elements(text: &str) -> Result<Vec<Element>> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut roots = Vec::new();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => roots.push(element),
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| CamError::Xml("unexpected closing tag".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => roots.push(element),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if let Some(open) = stack.last() {
        return Err(CamError::Xml(format!("element {} is not closed", open.name)));
    }
    Ok(roots)
}

/// Lenient typed access to an element's attributes.
struct Attrs<'e> {
    element: &'e Element,
}

impl Attrs<'_> {
    fn raw(&self, key: &str) -> Option<&str> {
        self.element.attributes.get(key).map(String::as_str)
    }

    /// Overwrite `target` when the attribute is present and parses.
    fn parse<T: FromStr>(&self, key: &str, target: &mut T) {
        if let Some(raw) = self.raw(key) {
            match raw.trim().parse() {
                Ok(value) => *target = value,
                Err(_) => debug!(
                    element = %self.element.name,
                    attribute = key,
                    value = raw,
                    "keeping default for unparsable attribute"
                ),
            }
        }
    }

    fn string(&self, key: &str, target: &mut String) {
        if let Some(raw) = self.raw(key) {
            *target = raw.to_string();
        }
    }

    fn flag(&self, key: &str, target: &mut bool) {
        match self.raw(key).map(str::trim) {
            Some("1") | Some("true") => *target = true,
            Some("0") | Some("false") => *target = false,
            Some(other) => debug!(
                element = %self.element.name,
                attribute = key,
                value = other,
                "keeping default for unparsable flag"
            ),
            None => {}
        }
    }

    fn point(&self, keys: [&str; 3], target: &mut Point3) {
        self.parse(keys[0], &mut target.x);
        self.parse(keys[1], &mut target.y);
        self.parse(keys[2], &mut target.z);
    }

    fn depths(&self, target: &mut DepthParams) {
        self.parse("clearance_height", &mut target.clearance_height);
        self.parse("rapid_down_to_height", &mut target.rapid_down_to_height);
        self.parse("start_depth", &mut target.start_depth);
        self.parse("step_down", &mut target.step_down);
        self.parse("final_depth", &mut target.final_depth);
    }
}

/// Parse a program document. Units are kept as stored.
pub fn read_program(text: &str) -> Result<ProgramDocument> {
    let roots = parse_elements(text)?;
    let program = roots
        .iter()
        .find_map(|root| root.find("Program"))
        .ok_or_else(|| CamError::Xml("no Program element".into()))?;

    let mut doc = ProgramDocument::new(&ProgramConfig::default());
    let attrs = program.attrs();
    attrs.string("machine", &mut doc.machine);
    attrs.string("output_file", &mut doc.output_file);
    attrs.parse("units", &mut doc.units);
    if let Some(script) = attrs.raw("program") {
        doc.restore_script(script.to_string());
    }

    for child in &program.children {
        match child.name.as_str() {
            "Operations" => {
                for element in &child.children {
                    match read_operation(element) {
                        Some(operation) => {
                            doc.operations.add(operation)?;
                        }
                        None => warn!(element = %element.name, "skipping unknown operation element"),
                    }
                }
            }
            "Tools" => {
                for element in &child.children {
                    if element.name != "CuttingTool" {
                        warn!(element = %element.name, "skipping unknown tool element");
                        continue;
                    }
                    let tool = read_tool(element);
                    if let Err(err) = doc.tools.add(tool) {
                        warn!(%err, "skipping tool");
                    }
                }
            }
            other => warn!(element = other, "skipping unknown program element"),
        }
    }

    Ok(doc)
}

fn read_tool(element: &Element) -> CuttingTool {
    let attrs = element.attrs();
    let kind = attrs
        .raw("kind")
        .and_then(ToolKind::from_name)
        .unwrap_or(ToolKind::EndMill);
    let mut tool = CuttingTool::new(0, String::new(), kind, 0.0);
    attrs.parse("tool_number", &mut tool.tool_number);
    attrs.string("title", &mut tool.title);
    attrs.parse("diameter", &mut tool.diameter);
    attrs.parse("tool_length_offset", &mut tool.tool_length_offset);
    attrs.parse("corner_radius", &mut tool.corner_radius);
    tool
}

fn read_symbols(element: &Element) -> Vec<SymbolReference> {
    element
        .children
        .iter()
        .filter(|child| child.name == "symbol")
        .filter_map(|child| {
            let attrs = child.attrs();
            let mut code = 0i32;
            let mut id = 0u32;
            attrs.parse("type", &mut code);
            attrs.parse("id", &mut id);
            match SymbolType::from_code(code) {
                Some(symbol_type) => Some(SymbolReference::new(symbol_type, SymbolId::new(id))),
                None => {
                    warn!(code, id, "skipping symbol of unknown type");
                    None
                }
            }
        })
        .collect()
}

fn read_operation(element: &Element) -> Option<Operation> {
    let kind = OperationKind::from_name(&element.name)?;
    let attrs = element.attrs();
    let symbols = read_symbols(element);

    let params = match kind {
        OperationKind::Profile => {
            let mut p = ProfileParams {
                symbols,
                ..ProfileParams::default()
            };
            if let Some(side) = attrs.raw("side").and_then(ToolSide::from_name) {
                p.side = side;
            }
            attrs.parse("extra_offset", &mut p.extra_offset);
            attrs.depths(&mut p.depths);
            OperationParams::Profile(p)
        }
        OperationKind::Pocket => {
            let mut p = PocketParams {
                symbols,
                ..PocketParams::default()
            };
            attrs.depths(&mut p.depths);
            attrs.parse("stepover", &mut p.stepover);
            attrs.parse("extra_offset", &mut p.extra_offset);
            attrs.flag("from_center", &mut p.from_center);
            attrs.flag("keep_tool_down", &mut p.keep_tool_down);
            attrs.flag("use_zig_zag", &mut p.use_zig_zag);
            attrs.parse("zig_angle", &mut p.zig_angle);
            OperationParams::Pocket(p)
        }
        OperationKind::ZigZag => {
            let mut p = ZigZagParams::default();
            attrs.point(["minx", "miny", "minz"], &mut p.box_min);
            attrs.point(["maxx", "maxy", "maxz"], &mut p.box_max);
            attrs.parse("step_over", &mut p.step_over);
            let mut direction = p.direction.code();
            attrs.parse("direction", &mut direction);
            p.direction = ZigZagDirection::from_code(direction).unwrap_or(p.direction);
            attrs.parse("clearance_height", &mut p.clearance_height);
            OperationParams::ZigZag(p)
        }
        OperationKind::Adaptive => {
            let mut p = AdaptiveParams::default();
            attrs.parse("leadoff_dz", &mut p.leadoff_dz);
            attrs.parse("leadoff_len", &mut p.leadoff_len);
            attrs.parse("leadoff_rad", &mut p.leadoff_rad);
            attrs.parse("retract_z_height", &mut p.retract_z_height);
            attrs.parse("leadoff_sample_step", &mut p.leadoff_sample_step);
            attrs.parse("sample_step", &mut p.sample_step);
            attrs.parse("step_down", &mut p.step_down);
            attrs.parse("clear_cusp_height", &mut p.clear_cusp_height);
            attrs.parse("hold_back_offset", &mut p.hold_back_offset);
            attrs.parse("step_over", &mut p.step_over);
            attrs.point(["startx", "starty", "startz"], &mut p.start);
            attrs.point(["minx", "miny", "minz"], &mut p.box_min);
            attrs.point(["maxx", "maxy", "maxz"], &mut p.box_max);
            attrs.parse("clearance_height", &mut p.clearance_height);
            attrs.parse("rapid_down_to_height", &mut p.rapid_down_to_height);
            OperationParams::Adaptive(p)
        }
        OperationKind::Drilling => {
            let mut p = DrillingParams {
                symbols,
                ..DrillingParams::default()
            };
            attrs.parse("standoff", &mut p.standoff);
            attrs.parse("dwell", &mut p.dwell);
            attrs.parse("depth", &mut p.depth);
            attrs.parse("peck_depth", &mut p.peck_depth);
            attrs.flag("sort_locations", &mut p.sort_locations);
            OperationParams::Drilling(p)
        }
        OperationKind::Locating => {
            let mut p = LocatingParams {
                symbols,
                ..LocatingParams::default()
            };
            attrs.parse("standoff", &mut p.standoff);
            attrs.flag("sort_locations", &mut p.sort_locations);
            OperationParams::Locating(p)
        }
    };

    let mut operation = Operation::new(String::new(), params);
    if let Some(raw) = attrs.raw("id") {
        match raw.parse() {
            Ok(ulid) => operation.id = OperationId::from_ulid(ulid),
            Err(_) => debug!(value = raw, "operation id is not a ULID, assigning a new one"),
        }
    }
    attrs.string("title", &mut operation.title);
    attrs.flag("active", &mut operation.active);
    attrs.parse("execution_order", &mut operation.execution_order);
    attrs.parse("tool_number", &mut operation.tool_number);
    Some(operation)
}

/// Write a document to disk.
pub fn save_document<P: AsRef<Path>>(doc: &ProgramDocument, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    let text = write_program(doc).context("serialize program document")?;
    fs::write(path, text).with_context(|| format!("write program {}", path.display()))
}

/// Read a document from disk.
pub fn load_document<P: AsRef<Path>>(path: P) -> anyhow::Result<ProgramDocument> {
    let path = path.as_ref();
    let text =
        fs::read_to_string(path).with_context(|| format!("read program {}", path.display()))?;
    read_program(&text).with_context(|| format!("parse program {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProgramDocument {
        let mut doc = ProgramDocument::new(&ProgramConfig::default());
        doc.machine = "nc.emc2".into();
        doc.tools
            .add(CuttingTool::new(1, "6mm <flat>", ToolKind::EndMill, 6.0))
            .unwrap();
        let circle = SymbolReference::new(SymbolType::Circle, SymbolId::new(7));
        doc.operations
            .add(
                Operation::new(
                    "Holes",
                    OperationParams::Drilling(DrillingParams {
                        symbols: vec![circle],
                        peck_depth: 2.5,
                        ..DrillingParams::default()
                    }),
                )
                .with_order(2)
                .with_tool(1),
            )
            .unwrap();
        doc.operations
            .add(
                Operation::new("Finish", OperationParams::ZigZag(ZigZagParams::default()))
                    .with_active(false),
            )
            .unwrap();
        doc
    }

    #[test]
    fn test_document_round_trip() {
        let mut doc = sample();
        doc.restore_script("import sys\noutput('a \"b\"')\n".into());
        let text = write_program(&doc).unwrap();
        assert!(text.contains("&#10;"));

        let read = read_program(&text).unwrap();
        assert_eq!(read.machine, "nc.emc2");
        assert_eq!(read.script(), doc.script());
        assert_eq!(read.operations, doc.operations);
        assert_eq!(read.tools, doc.tools);
    }

    #[test]
    fn test_units_are_normalized_on_write_and_kept_on_read() {
        let mut doc = sample();
        doc.units = 30.0;
        let text = write_program(&doc).unwrap();
        assert_eq!(read_program(&text).unwrap().units, 25.4);

        let raw = r#"<Program machine="nc.iso" units="3.5"><Operations/><Tools/></Program>"#;
        let read = read_program(raw).unwrap();
        assert_eq!(read.units, 3.5);
        assert_eq!(read.unit_scale(), 1.0);
    }

    #[test]
    fn test_lenient_attributes_and_unknown_elements() {
        let raw = r#"<?xml version="1.0"?>
<HeeksCAD_Document>
  <Program units="lots" output_file="/tmp/x.tap">
    <Operations>
      <Engrave id="nope"/>
      <Locating title="Taps" standoff="high" execution_order="4">
        <symbol type="1" id="3"/>
        <symbol type="99" id="1"/>
      </Locating>
    </Operations>
    <Tools>
      <Holder/>
      <CuttingTool tool_number="2" kind="drill" diameter="3"/>
    </Tools>
  </Program>
</HeeksCAD_Document>"#;
        let doc = read_program(raw).unwrap();
        assert_eq!(doc.units, 1.0);
        assert_eq!(doc.output_file, "/tmp/x.tap");
        assert_eq!(doc.operations.len(), 1);

        let op = doc.operations.iter().next().unwrap();
        assert_eq!(op.title, "Taps");
        assert_eq!(op.execution_order, 4);
        match &op.params {
            OperationParams::Locating(p) => {
                assert_eq!(p.standoff, LocatingParams::default().standoff);
                assert_eq!(
                    p.symbols,
                    vec![SymbolReference::new(SymbolType::Point, SymbolId::new(3))]
                );
            }
            other => panic!("Expected Locating params, got {other:?}"),
        }
        assert_eq!(doc.tools.find(2).map(|t| t.kind), Some(ToolKind::Drill));
    }

    #[test]
    fn test_repeated_operation_ids_are_made_unique() {
        let raw = r#"<Program units="1">
    <Operations>
      <Locating id="01ARZ3NDEKTSV4RRFFQ69G5FAV" title="First"/>
      <Locating id="01ARZ3NDEKTSV4RRFFQ69G5FAV" title="Second"/>
    </Operations>
    <Tools/>
  </Program>"#;
        let doc = read_program(raw).unwrap();
        let ops: Vec<&Operation> = doc.operations.iter().collect();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].id.to_string(), "01ARZ3NDEKTSV4RRFFQ69G5FAV");
        assert_eq!(ops[1].title, "Second");
        assert_ne!(ops[0].id, ops[1].id);
    }

    #[test]
    fn test_non_finite_units_are_read_but_never_assembled() {
        let raw = r#"<Program units="inf"><Operations/><Tools/></Program>"#;
        let doc = read_program(raw).unwrap();
        assert!(doc.units.is_infinite());
        assert!(matches!(
            doc.assemble(&crate::geometry::ShapeRegistry::new(), &Default::default()),
            Err(CamError::NonFinite(_))
        ));
    }

    #[test]
    fn test_missing_program_element() {
        assert!(matches!(
            read_program("<Document/>"),
            Err(CamError::Xml(_))
        ));
    }
}
