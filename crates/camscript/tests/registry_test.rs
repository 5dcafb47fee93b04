use camscript::*;

struct Counter {
    seen: usize,
}

impl ModificationListener for Counter {
    fn was_modified(&mut self, _operation: &Operation) {
        self.seen += 1;
    }
}

#[test]
fn test_rejected_add_leaves_registries_unchanged() {
    let mut ops = Operations::new();
    ops.add(Operation::new(
        "Outline",
        OperationParams::Profile(ProfileParams::default()),
    ))
    .unwrap();
    let mut tools = Tools::new();
    tools
        .add(CuttingTool::new(1, "Endmill", ToolKind::EndMill, 6.0))
        .unwrap();
    let (ops_before, tools_before) = (ops.clone(), tools.clone());

    let err = ops.add(TreeObject::NcCode("G0 X0".into())).unwrap_err();
    assert!(matches!(err, CamError::InvalidChild { container: "Operations", .. }));
    let err = tools
        .add(Operation::new(
            "Stray",
            OperationParams::Pocket(PocketParams::default()),
        ))
        .unwrap_err();
    assert_eq!(err.to_string(), "Tools cannot hold Operation objects");

    assert_eq!(ops, ops_before);
    assert_eq!(tools, tools_before);
}

#[test]
fn test_set_all_commands_drive_the_program() {
    let mut shapes = ShapeRegistry::new();
    let spot = shapes.create_point(2.0, 2.0, 0.0);
    let mut doc = ProgramDocument::new(&ProgramConfig::default());
    for title in ["A", "B", "C"] {
        doc.operations
            .add(
                Operation::new(
                    title,
                    OperationParams::Locating(LocatingParams {
                        symbols: vec![spot],
                        ..LocatingParams::default()
                    }),
                )
                .with_active(title != "B"),
            )
            .unwrap();
    }

    let mut counter = Counter { seen: 0 };
    SetAllInactive::new(&mut doc.operations, &mut counter).run();
    assert_eq!(counter.seen, 2);
    let options = ScriptOptions::default();
    assert!(doc.assemble(&shapes, &options).unwrap().operation_ids().is_empty());

    let mut counter = Counter { seen: 0 };
    let command = SetAllActive::new(&mut doc.operations, &mut counter);
    assert_eq!(command.title(), "Set All Active");
    command.run();
    assert_eq!(counter.seen, 3);
    assert_eq!(doc.assemble(&shapes, &options).unwrap().operation_ids().len(), 3);
}

#[test]
fn test_removing_an_operation_drops_its_imports() {
    let mut doc = ProgramDocument::new(&ProgramConfig::default());
    let pocket = Operation::new("Pocket", OperationParams::Pocket(PocketParams::default()))
        .with_active(false);
    let id = pocket.id;
    doc.operations.add(pocket).unwrap();
    let options = ScriptOptions::default();
    let shapes = ShapeRegistry::new();
    assert!(doc.assemble(&shapes, &options).unwrap().text().contains("import area\n"));

    doc.operations.remove(id);
    assert!(!doc.assemble(&shapes, &options).unwrap().text().contains("import area"));
    assert_eq!(doc.user_type(), ProgramUserType::Unknown);
}
