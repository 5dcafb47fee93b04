use camscript::*;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let demo = args.get(1).map(|s| s.as_str()).unwrap_or("plate");

    match demo {
        "plate" => demo_plate(),
        "holes" => demo_holes(),
        _ => {
            println!("Usage: camscript [plate|holes]");
            println!("  plate  - Profile and pocket a mounting plate (default)");
            println!("  holes  - Drill at the crossings of a grid of lines");
        }
    }
}

fn load_config() -> ProgramConfig {
    let loaded = ProgramConfig::default_config_path().and_then(ProgramConfig::load_from_path);
    match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Using default settings: {e:#}");
            ProgramConfig::default()
        }
    }
}

fn demo_plate() {
    println!("camscript - Mounting plate");
    println!("==========================\n");

    let config = load_config();
    let mut shapes = ShapeRegistry::new();
    let mut outline = kurbo::BezPath::new();
    outline.move_to((0.0, 0.0));
    outline.line_to((100.0, 0.0));
    outline.line_to((100.0, 60.0));
    outline.line_to((0.0, 60.0));
    outline.close_path();
    let outline = shapes.create_sketch(outline);
    let recess = shapes.create_circle((50.0, 30.0), 15.0);
    let bolt_a = shapes.create_circle((10.0, 10.0), 2.5);
    let bolt_b = shapes.create_circle((90.0, 50.0), 2.5);

    let mut doc = ProgramDocument::new(&config);
    let tools = [
        CuttingTool::new(1, "6mm Endmill", ToolKind::EndMill, 6.0),
        CuttingTool::new(2, "5mm Drill", ToolKind::Drill, 5.0),
    ];
    for tool in tools {
        if let Err(e) = doc.tools.add(tool) {
            eprintln!("Error: {e}");
            return;
        }
    }

    let operations = [
        Operation::new(
            "Recess",
            OperationParams::Pocket(PocketParams {
                symbols: vec![recess],
                ..PocketParams::default()
            }),
        )
        .with_order(1)
        .with_tool(1),
        Operation::new(
            "Bolt holes",
            OperationParams::Drilling(DrillingParams {
                symbols: vec![bolt_a, bolt_b],
                depth: 6.0,
                ..DrillingParams::default()
            }),
        )
        .with_order(2)
        .with_tool(2),
        Operation::new(
            "Cut out",
            OperationParams::Profile(ProfileParams {
                symbols: vec![outline],
                side: ToolSide::Right,
                ..ProfileParams::default()
            }),
        )
        .with_order(3)
        .with_tool(1),
    ];
    for operation in operations {
        if let Err(e) = doc.operations.add(operation) {
            eprintln!("Error: {e}");
            return;
        }
    }

    print_program(&mut doc, &shapes, &config);
}

fn demo_holes() {
    println!("camscript - Drilling at line crossings");
    println!("======================================\n");

    let config = load_config();
    let mut shapes = ShapeRegistry::new();
    let mut symbols = Vec::new();
    for i in 0..3 {
        let offset = 10.0 + 20.0 * i as f64;
        symbols.push(shapes.create_line((offset, 0.0), (offset, 60.0)));
        symbols.push(shapes.create_line((0.0, offset), (60.0, offset)));
    }

    let mut doc = ProgramDocument::new(&config);
    if let Err(e) = doc
        .tools
        .add(CuttingTool::new(1, "3mm Drill", ToolKind::Drill, 3.0))
    {
        eprintln!("Error: {e}");
        return;
    }
    let drilling = Operation::new(
        "Grid",
        OperationParams::Drilling(DrillingParams {
            symbols,
            ..DrillingParams::default()
        }),
    )
    .with_tool(1);
    if let Err(e) = doc.operations.add(drilling) {
        eprintln!("Error: {e}");
        return;
    }

    print_program(&mut doc, &shapes, &config);
}

fn print_program(doc: &mut ProgramDocument, shapes: &ShapeRegistry, config: &ProgramConfig) {
    match doc.rewrite_program(shapes, &config.script_options()) {
        Ok(script) => {
            println!(
                "{} operation(s), {} tool change(s)\n",
                script.operation_ids().len(),
                script.tool_changes().len()
            );
            print!("{}", doc.script());
        }
        Err(e) => eprintln!("Error: {e}"),
    }
}
