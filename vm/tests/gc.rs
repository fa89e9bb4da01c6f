mod common;

use ast::build::*;
use common::{define_counter, eval, small_vm};
use object::ObjectKind;

#[test]
fn locals_stay_reachable_across_collections() {
    let mut vm = small_vm(64);
    define_counter(&mut vm);
    let unit = block(vec![
        assign(
            "kept",
            array(vec![array(vec![number("1"), number("2")]), string("x")]),
        ),
        statement(keyword(symbol("Counter"), "churn:", vec![number("2000")])),
        keyword(symbol("kept"), "formatString:", vec![string("{0} {1}")]),
    ]);

    assert_eq!(eval(&mut vm, &unit).unwrap(), "#(1 2) x");
    let stats = vm.heap.stats();
    assert!(stats.cycles > 0);
    assert!(stats.released > 0);
}

#[test]
fn garbage_is_recycled_instead_of_growing_pools() {
    let mut vm = small_vm(64);
    define_counter(&mut vm);
    let before = vm.heap.capacity(ObjectKind::Array);

    let unit = block(vec![keyword(symbol("Counter"), "churn:", vec![number("5000")])]);
    assert_eq!(eval(&mut vm, &unit).unwrap(), "0");

    // 5000 arrays went through a pool that never needed to double
    assert_eq!(vm.heap.capacity(ObjectKind::Array), before);
}

#[test]
fn pools_never_shrink() {
    let mut vm = small_vm(64);
    define_counter(&mut vm);
    let before: Vec<usize> =
        ObjectKind::ALL.iter().map(|kind| vm.heap.capacity(*kind)).collect();

    let unit = block(vec![keyword(symbol("Counter"), "churn:", vec![number("3000")])]);
    eval(&mut vm, &unit).unwrap();
    vm.collect_garbage(true);

    for (kind, before) in ObjectKind::ALL.iter().zip(before) {
        assert!(vm.heap.capacity(*kind) >= before, "{kind} shrank");
    }
}

#[test]
fn explicit_collections_release_unreachable_results() {
    let mut vm = small_vm(256);
    let unit = block(vec![unary(
        array(vec![number("1"), number("2"), number("3")]),
        "size",
    )]);
    assert_eq!(eval(&mut vm, &unit).unwrap(), "3");

    let live = vm.heap.live(ObjectKind::Array);
    let counts = vm.collect_garbage(true);
    assert!(counts.released > 0);
    assert!(vm.heap.live(ObjectKind::Array) < live);
}

#[test]
fn globals_survive_full_collections() {
    let mut vm = small_vm(64);
    define_counter(&mut vm);
    for _ in 0..3 {
        vm.collect_garbage(true);
    }
    let unit = block(vec![keyword(symbol("Counter"), "down:", vec![number("3")])]);
    assert_eq!(eval(&mut vm, &unit).unwrap(), "0");
}

#[test]
fn released_results_do_not_alias_new_objects() {
    let mut vm = small_vm(64);
    let first = vm
        .run(&block(vec![array(vec![number("1"), number("2")])]))
        .unwrap();
    assert_eq!(vm.display(first), "#(1 2)");

    vm.collect_garbage(true);
    let second = vm
        .run(&block(vec![array(vec![number("7"), number("8"), number("9")])]))
        .unwrap();

    assert!(!vm.heap.contains(first));
    assert_ne!(first, second);
    assert_eq!(vm.display(first), "<dead>");
    assert_eq!(vm.display(second), "#(7 8 9)");
}
