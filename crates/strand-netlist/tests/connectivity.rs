use strand_netlist::{
    Design, Edge, Expression, Pin, ProcessKind, Scope, ScopeKind, SignalDecl, SourceSpan,
    Statement,
};

fn top() -> (Design, strand_netlist::ScopeId) {
    let mut design = Design::new("conn");
    let top = design
        .add_scope(None, Scope::new("top", ScopeKind::Module))
        .unwrap();
    (design, top)
}

#[test]
fn test_chain_of_connections_shares_one_nexus() {
    let (mut design, top) = top();
    let sigs: Vec<_> = (0..5)
        .map(|i| design.add_signal(top, SignalDecl::new(format!("n{}", i), 1)).unwrap())
        .collect();
    for pair in sigs.windows(2) {
        design.connect_signals(pair[0], pair[1]).unwrap();
    }
    assert_eq!(design.connectivity().nexus_count(), 1);
    let nex = design.nexus_of(Pin::signal(sigs[4], 0)).unwrap();
    assert_eq!(design.connectivity().members(nex).count(), 5);

    // removing the middle keeps the rest together
    design.delete_signal(sigs[2]).unwrap();
    assert_eq!(design.connectivity().nexus_count(), 1);
    assert_eq!(
        design.nexus_of(Pin::signal(sigs[0], 0)),
        design.nexus_of(Pin::signal(sigs[4], 0))
    );
    design.validate().unwrap();
}

#[test]
fn test_deleting_event_releases_probe_pins() {
    let (mut design, top) = top();
    let clk = design.add_signal(top, SignalDecl::new("clk", 1)).unwrap();
    let ev = design.add_event(top, "ev").unwrap();
    design
        .add_probe(ev, Edge::Any, &[Pin::signal(clk, 0)])
        .unwrap();
    let nex = design.nexus_of(Pin::signal(clk, 0)).unwrap();
    assert_eq!(design.connectivity().members(nex).count(), 2);

    design.delete_event(ev).unwrap();
    assert_eq!(design.nodes().count(), 0);
    let nex = design.nexus_of(Pin::signal(clk, 0)).unwrap();
    assert_eq!(design.connectivity().members(nex).count(), 1);
    design.validate().unwrap();
}

#[test]
fn test_live_event_cannot_be_deleted() {
    let (mut design, top) = top();
    let ev = design.add_event(top, "go").unwrap();
    design
        .add_process(
            top,
            ProcessKind::Initial,
            Statement::trigger(ev),
            SourceSpan::unknown(),
        )
        .unwrap();
    assert_eq!(design.event(ev).unwrap().ntrig(), 1);
    assert!(design.delete_event(ev).is_err());
}

#[test]
fn test_stale_handles_are_reported() {
    let (mut design, top) = top();
    let x = design.add_signal(top, SignalDecl::new("x", 1)).unwrap();
    design.delete_signal(x).unwrap();
    assert!(design.signal(x).is_err());
    assert!(design.delete_signal(x).is_err());
    let body = Statement::assign(x, Expression::integer(1));
    assert!(design
        .add_process(top, ProcessKind::Initial, body, SourceSpan::unknown())
        .is_err());
}
