//! End-to-end trace-loop scenarios, driven through the public channel API
//! exactly as a controller would, rather than through the crate's private
//! `Interpreter` surface.

use pretty_assertions::assert_eq;
use pytrace::snapshot::SnapValue;
use pytrace::{spawn_trace, Action, ProtocolResult};

fn started(results: &std::sync::mpsc::Receiver<ProtocolResult>) {
    assert!(matches!(results.recv().unwrap(), ProtocolResult::Started));
}

#[test]
fn self_referential_list_snapshot_points_back_to_itself() {
    let (actions, results, handle) = spawn_trace("script.py", "a = []\na.append(a)\nb = 1\n", false);
    actions.send(Action::Start).unwrap();
    started(&results);

    let second = loop {
        actions.send(Action::Step).unwrap();
        match results.recv().unwrap() {
            ProtocolResult::Data { snapshot: Some(snap), .. } if snap.heap.values().any(|r| !r.members.is_empty()) => break snap,
            ProtocolResult::Data { finish: false, .. } => panic!("program ended before the append ran"),
            _ => continue,
        }
    };

    assert_eq!(second.heap.len(), 1);
    let (id, record) = second.heap.iter().next().unwrap();
    assert_eq!(record.kind, "alist");
    assert_eq!(record.members.len(), 1);
    assert_eq!(record.members[0].value, SnapValue::Ref([id.clone()]));

    actions.send(Action::Quit).unwrap();
    let _ = results.recv();
    handle.join().unwrap();
}

#[test]
fn user_defined_instance_reports_its_single_attribute() {
    let source = "class C:\n    def __init__(self):\n        self.x = 1\nc = C()\n";
    let (actions, results, handle) = spawn_trace("script.py", source, false);
    actions.send(Action::Start).unwrap();
    started(&results);

    let snapshot = loop {
        actions.send(Action::Step).unwrap();
        match results.recv().unwrap() {
            ProtocolResult::Data { snapshot: Some(snap), .. } if snap.heap.values().any(|r| r.user_defined && !r.members.is_empty()) => break snap,
            ProtocolResult::Data { finish: false, .. } => panic!("program ended before construction completed"),
            _ => continue,
        }
    };

    let record = snapshot.heap.values().find(|r| r.user_defined).unwrap();
    assert!(record.user_defined);
    assert_eq!(record.members.len(), 1);
    assert_eq!(record.members[0].key, SnapValue::Text("x".to_owned()));
    assert_eq!(record.members[0].value, SnapValue::Num(1.0));

    actions.send(Action::Quit).unwrap();
    let _ = results.recv();
    handle.join().unwrap();
}

#[test]
fn eval_failure_is_a_product_and_the_run_keeps_going() {
    let (actions, results, handle) = spawn_trace("script.py", "a = 1\nb = 2\n", false);
    actions.send(Action::Start).unwrap();
    started(&results);

    actions.send(Action::Eval { expression: "undefined_name".to_owned(), inspect: false }).unwrap();
    match results.recv().unwrap() {
        ProtocolResult::Product { product: pytrace::protocol::ProductValue::Failed { kind, .. }, .. } => {
            assert_eq!(kind, "NameError");
        }
        other => panic!("expected a failed product, got {other:?}"),
    }

    actions.send(Action::Step).unwrap();
    assert!(matches!(results.recv().unwrap(), ProtocolResult::Data { finish: true, .. }));

    actions.send(Action::Quit).unwrap();
    let _ = results.recv();
    handle.join().unwrap();
}

#[test]
fn empty_source_still_starts_and_terminates_with_no_steps() {
    let (actions, results, handle) = spawn_trace("script.py", "", false);
    actions.send(Action::Start).unwrap();
    started(&results);
    actions.send(Action::Step).unwrap();
    assert!(matches!(results.recv().unwrap(), ProtocolResult::Data { finish: false, snapshot: None }));
    handle.join().unwrap();
}
