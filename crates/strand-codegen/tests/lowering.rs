use strand_codegen::{lower_process, CodeGenerator, CodegenError, CodegenOptions};
use strand_netlist::{
    load_design, BinaryOp, DelayAmount, Design, Expression, ProcessKind, Scope, ScopeKind,
    SignalDecl, SourceSpan, Statement,
};

fn lower_text(design: &Design) -> String {
    let mut gen = CodeGenerator::new(CodegenOptions {
        parallel: false,
        declarations: false,
    });
    gen.generate(design).unwrap().text
}

fn single_scope() -> (Design, strand_netlist::ScopeId) {
    let mut design = Design::new("gen");
    let top = design
        .add_scope(None, Scope::new("top", ScopeKind::Module))
        .unwrap();
    (design, top)
}

#[test]
fn test_constant_assignment_sets_every_bit() {
    let (mut design, top) = single_scope();
    let x = design.add_signal(top, SignalDecl::new("x", 4)).unwrap();
    let value = Expression::number("4'b1010".parse().unwrap());
    design
        .add_process(
            top,
            ProcessKind::Initial,
            Statement::assign(x, value),
            SourceSpan::unknown(),
        )
        .unwrap();

    assert_eq!(
        lower_text(&design),
        "    .scope S_top;\n\
         T_00000\n\
         \x20   %set V_top.x[0], 0;\n\
         \x20   %set V_top.x[1], 1;\n\
         \x20   %set V_top.x[2], 0;\n\
         \x20   %set V_top.x[3], 1;\n\
         \x20   %end;\n\
         \x20   .thread T_00000;\n"
    );
}

#[test]
fn test_empty_always_loops_forever() {
    let (mut design, top) = single_scope();
    design
        .add_process(top, ProcessKind::Always, Statement::Noop, SourceSpan::unknown())
        .unwrap();
    assert_eq!(
        lower_text(&design),
        "    .scope S_top;\nT_00000\n    %jmp T_00000;\n    .thread T_00000;\n"
    );
}

#[test]
fn test_set_fans_out_through_nexus() {
    let json = r#"{"scopes": [{"name": "top",
        "signals": [{"name": "a", "width": 2}, {"name": "b", "width": 2}],
        "connections": [["a", "b"]],
        "processes": [{"kind": "initial",
            "body": {"kind": "assign", "lval": "a", "rval": "2'bxz"}}]}]}"#;
    let design = load_design(json).unwrap();
    let text = lower_text(&design);
    let sets: Vec<&str> = text.lines().filter(|l| l.contains("%set")).collect();
    assert_eq!(
        sets,
        vec![
            "    %set V_top.a[0], 3;",
            "    %set V_top.b[0], 3;",
            "    %set V_top.a[1], 2;",
            "    %set V_top.b[1], 2;",
        ]
    );
}

#[test]
fn test_conditional_with_both_branches() {
    let json = r#"{"scopes": [{"name": "top",
        "signals": [{"name": "en"}, {"name": "q"}],
        "processes": [{"kind": "initial", "body": {"kind": "condit", "cond": "en",
            "then": {"kind": "assign", "lval": "q", "rval": "1'b1"},
            "else": {"kind": "assign", "lval": "q", "rval": "1'b0"}}}]}]}"#;
    let design = load_design(json).unwrap();
    let lines: Vec<String> = lower_text(&design).lines().map(String::from).collect();
    assert_eq!(
        lines,
        vec![
            "    .scope S_top;",
            "T_00000",
            "    %load 4, V_top.en[0];",
            "    %jmp/0  T_00000.0, 4;",
            "    %set V_top.q[0], 1;",
            "    %jmp T_00000.1;",
            "T_00000.0",
            "    %set V_top.q[0], 0;",
            "T_00000.1",
            "    %end;",
            "    .thread T_00000;",
        ]
    );
}

#[test]
fn test_unknown_constant_condition_reads_its_register() {
    let json = r#"{"scopes": [{"name": "top",
        "signals": [{"name": "q"}],
        "processes": [{"kind": "initial", "body": {"kind": "condit", "cond": "1'bx",
            "then": {"kind": "assign", "lval": "q", "rval": "1'b1"}}}]}]}"#;
    let design = load_design(json).unwrap();
    let lines: Vec<String> = lower_text(&design).lines().map(String::from).collect();
    // register 2 holds x; %jmp/0 falls through on it
    assert_eq!(
        lines[2..5],
        [
            "    %jmp/0  T_00000.0, 2;",
            "    %set V_top.q[0], 1;",
            "T_00000.0",
        ]
    );
}

#[test]
fn test_conditional_without_else_and_wide_condition() {
    let json = r#"{"scopes": [{"name": "top",
        "signals": [{"name": "a", "width": 2}, {"name": "b", "width": 2}],
        "processes": [{"kind": "initial", "body": {"kind": "condit",
            "cond": {"op": "and", "args": ["a", {"op": "bit_not", "args": ["b"]}]},
            "then": {"kind": "systask", "name": "$finish"}}}]}]}"#;
    let design = load_design(json).unwrap();
    let lines: Vec<String> = lower_text(&design).lines().map(String::from).collect();
    assert_eq!(
        lines[2..],
        [
            "    %load 4, V_top.a[0];",
            "    %load 5, V_top.a[1];",
            "    %load 6, V_top.b[0];",
            "    %load 7, V_top.b[1];",
            "    %inv 6, 2;",
            "    %and 4, 6, 2;",
            "    %or/r 8, 4, 2;",
            "    %jmp/0  T_00000.0, 8;",
            "    %vpi_call \"$finish\";",
            "T_00000.0",
            "    %end;",
            "    .thread T_00000;",
        ]
    );
}

#[test]
fn test_delay_and_system_task() {
    let (mut design, top) = single_scope();
    let x = design.add_signal(top, SignalDecl::new("x", 1)).unwrap();
    let body = Statement::delay(
        DelayAmount::Ticks(25),
        Statement::systask(
            "$display",
            vec![Expression::string("x=%b"), Expression::signal(x)],
        ),
    );
    design
        .add_process(top, ProcessKind::Initial, body, SourceSpan::unknown())
        .unwrap();
    let text = lower_text(&design);
    assert!(text.contains("    %delay 25;\n    %vpi_call \"$display\", \"x=%b\", ?;\n"));
}

#[test]
fn test_unsupported_statements_are_skipped() {
    let (mut design, top) = single_scope();
    let x = design.add_signal(top, SignalDecl::new("x", 1)).unwrap();
    let y = design.add_signal(top, SignalDecl::new("y", 1)).unwrap();
    let body = Statement::Block(vec![
        Statement::assign(
            x,
            Expression::binary(BinaryOp::BitAnd, Expression::signal(y), Expression::integer(1)),
        ),
        Statement::Forever {
            body: Box::new(Statement::Noop),
            span: SourceSpan::new("t.v", 4, 1),
        },
        Statement::delay(
            DelayAmount::Runtime(Expression::signal(y)),
            Statement::Noop,
        ),
        Statement::assign(x, Expression::integer(0)),
    ]);
    let proc = design
        .add_process(top, ProcessKind::Initial, body, SourceSpan::unknown())
        .unwrap();

    let lowered = lower_process(&design, design.process(proc).unwrap(), 0).unwrap();
    assert_eq!(lowered.diagnostics.error_count(), 3);
    let messages: Vec<String> = lowered.diagnostics.iter().map(|d| d.to_string()).collect();
    assert!(messages[0].contains("Unsupported assignment"));
    assert_eq!(messages[1], "t.v:4:1: error: Unable to draw statement type forever");
    assert!(messages[2].ends_with("Unable to draw statement type delayx"));

    // the last assignment still lowers
    let sets = lowered
        .instructions
        .iter()
        .filter(|i| i.to_string().contains("%set"))
        .count();
    assert_eq!(sets, 1);
}

#[test]
fn test_unresolved_delay_is_fatal() {
    let (mut design, top) = single_scope();
    let body = Statement::delay(DelayAmount::Pending(Expression::integer(1)), Statement::Noop);
    let proc = design
        .add_process(top, ProcessKind::Initial, body, SourceSpan::unknown())
        .unwrap();
    let err = lower_process(&design, design.process(proc).unwrap(), 0).unwrap_err();
    assert!(matches!(err, CodegenError::UnresolvedDelay { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_threads_number_globally_and_labels_per_process() {
    let json = r#"{"scopes": [{"name": "top",
        "signals": [{"name": "c"}],
        "processes": [
            {"kind": "initial", "body": {"kind": "condit", "cond": "c", "then": {"kind": "noop"}}},
            {"kind": "initial", "body": {"kind": "condit", "cond": "c", "then": {"kind": "noop"}}},
            {"kind": "always", "body": {"kind": "noop"}}
        ]}]}"#;
    let design = load_design(json).unwrap();
    let serial = lower_text(&design);
    assert!(serial.contains("T_00000.0\n"));
    assert!(serial.contains("T_00001.0\n"));
    assert!(serial.contains("    .thread T_00002;\n"));

    let mut parallel = CodeGenerator::new(CodegenOptions {
        parallel: true,
        declarations: false,
    });
    assert_eq!(parallel.generate(&design).unwrap().text, serial);
    assert_eq!(parallel.next_thread(), 3);
    let again = parallel.generate(&design).unwrap().text;
    assert!(again.contains("    .thread T_00005;\n"));
}

#[test]
fn test_declarations() {
    let json = r#"{"scopes": [{"name": "top",
        "signals": [{"name": "bus", "width": 8}],
        "scopes": [{"name": "u", "signals": [{"name": "bit"}]}]}]}"#;
    let design = load_design(json).unwrap();
    let mut gen = CodeGenerator::new(CodegenOptions::default());
    let text = gen.generate(&design).unwrap().text;
    assert_eq!(
        text,
        "S_top .scope \"top\";\n\
         S_top.u .scope \"top.u\";\n\
         V_top.bus .var \"bus\", 7, 0;\n\
         V_top.u.bit .var \"bit\", 0, 0;\n"
    );
}
