use strand_elab::resolve_design;
use strand_netlist::{load_design, DelayAmount, DelayValue, Diagnostics, Statement};

const NETLIST: &str = r#"{
    "scopes": [{
        "name": "top",
        "time_unit": -9,
        "time_precision": -12,
        "parameters": {"T": 1.5},
        "signals": [{"name": "a"}, {"name": "b"}, {"name": "y"}, {"name": "sel", "width": 2}],
        "nodes": [
            {"type": "logic", "name": "g1", "op": "and", "delay": ["T", 2]},
            {"type": "logic", "name": "g2", "op": "or", "delay": ["sel"]}
        ],
        "connections": [["g1[0]", "y"], ["g1[1]", "a"], ["g1[2]", "b"]],
        "processes": [{"kind": "initial", "body": {"kind": "block", "stmts": [
            {"kind": "delay", "amount": "T", "body": {"kind": "noop"}},
            {"kind": "delay", "amount": {"op": "add", "args": ["sel", 1]},
             "body": {"kind": "noop"}}
        ]}}]
    }]
}"#;

#[test]
fn test_resolves_nodes_and_statements() {
    let mut design = load_design(NETLIST).unwrap();
    let mut diags = Diagnostics::new();
    let stats = resolve_design(&mut design, &mut diags).unwrap();
    assert!(diags.is_empty());
    assert_eq!(stats.node_specs, 2);
    assert_eq!(stats.statements, 2);

    let g1 = design.nodes().find(|n| n.name == "g1").unwrap();
    assert_eq!(g1.delays.rise, Some(DelayValue::Ticks(1500)));
    assert_eq!(g1.delays.fall, Some(DelayValue::Ticks(2000)));
    assert_eq!(g1.delays.decay, Some(DelayValue::Ticks(1500)));

    // a gate delay driven by a signal references that signal
    let top = design.find_scope("top").unwrap();
    let sel = design.find_signal(top, "sel").unwrap();
    let g2 = design.nodes().find(|n| n.name == "g2").unwrap();
    assert_eq!(g2.delays.rise, Some(DelayValue::Net(sel)));
    assert_eq!(design.signal(sel).unwrap().eref(), 4);

    let Statement::Block(stmts) = &design.processes()[0].body else {
        panic!("expected a block");
    };
    assert!(matches!(
        &stmts[0],
        Statement::Delay { amount: DelayAmount::Ticks(1500), .. }
    ));
    assert!(matches!(
        &stmts[1],
        Statement::Delay { amount: DelayAmount::Runtime(_), .. }
    ));
}

#[test]
fn test_unbound_delay_name_is_fatal() {
    let json = r#"{"scopes": [{"name": "top", "processes": [{"kind": "initial",
        "body": {"kind": "delay", "amount": "nowhere", "body": {"kind": "noop"}}}]}]}"#;
    let mut design = load_design(json).unwrap();
    let err = resolve_design(&mut design, &mut Diagnostics::new()).unwrap_err();
    assert!(err.is_fatal());
    // the process body is left in place
    assert!(matches!(
        design.processes()[0].body,
        Statement::Delay { amount: DelayAmount::Pending(_), .. }
    ));
}
