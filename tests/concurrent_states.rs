//! Parallel (orthogonal) regions: simultaneous entry, per-region
//! transitions, fan-out on exit, and the ambiguous-pivot guard.

use statechart::{ChartBuilder, ChartError, Sequence, StateTemplate};

/// root -> a (parallel: b { d, e }, c { f, g }), z
fn parallel_chart() -> ChartBuilder {
    ChartBuilder::new()
        .initial("a")
        .substate(
            StateTemplate::new("a")
                .parallel()
                .substate(
                    StateTemplate::new("b")
                        .initial("d")
                        .substate(StateTemplate::new("d"))
                        .substate(StateTemplate::new("e")),
                )
                .substate(
                    StateTemplate::new("c")
                        .initial("f")
                        .substate(StateTemplate::new("f"))
                        .substate(StateTemplate::new("g")),
                ),
        )
        .substate(StateTemplate::new("z"))
        .with_monitor()
}

#[test]
fn initialization_enters_every_region() {
    let mut chart = parallel_chart().build().unwrap();
    chart.initialize().unwrap();

    assert_eq!(chart.current_states(), vec!["d", "f"]);
    assert_eq!(chart.current_state_count(), 2);
    let expected = Sequence::new().entered(&["__root__", "a", "b", "d", "c", "f"]);
    assert!(chart.monitor().unwrap().matches(&expected));
}

#[test]
fn transition_within_one_region_leaves_the_other_alone() {
    let mut chart = parallel_chart().build().unwrap();
    chart.initialize().unwrap();
    chart.monitor_mut().unwrap().reset();

    chart.goto_state("e").unwrap();

    assert_eq!(chart.current_states(), vec!["f", "e"]);
    let expected = Sequence::new().exited(&["d"]).entered(&["e"]);
    assert!(chart.monitor().unwrap().matches(&expected));
}

#[test]
fn leaving_a_parallel_state_exits_all_regions_leaf_first() {
    let mut chart = parallel_chart().build().unwrap();
    chart.initialize().unwrap();
    chart.monitor_mut().unwrap().reset();

    chart.goto_state("z").unwrap();

    assert_eq!(chart.current_states(), vec!["z"]);
    let expected = Sequence::new()
        .exited(&["d", "b", "f", "c", "a"])
        .entered(&["z"]);
    assert!(chart.monitor().unwrap().matches(&expected));
}

#[test]
fn reentering_a_parallel_state_restores_every_region() {
    let mut chart = parallel_chart().build().unwrap();
    chart.initialize().unwrap();
    chart.goto_state("z").unwrap();
    chart.monitor_mut().unwrap().reset();

    chart.goto_state("a").unwrap();

    assert_eq!(chart.current_states(), vec!["d", "f"]);
    let expected = Sequence::new()
        .exited(&["z"])
        .entered(&["a", "b", "d", "c", "f"]);
    assert!(chart.monitor().unwrap().matches(&expected));
}

#[test]
fn cross_region_transition_is_rejected() {
    let mut chart = parallel_chart().build().unwrap();
    chart.initialize().unwrap();

    // d and f only meet at the parallel state a, which cannot arbitrate
    // an exclusive transition between its regions.
    let result = chart.goto_state_from("f", "d");
    assert!(matches!(result, Err(ChartError::AmbiguousPivot(n)) if n == "a"));
    assert_eq!(chart.current_states(), vec!["d", "f"]);
}

#[test]
fn explicit_entry_into_one_region_still_populates_the_others() {
    let mut chart = parallel_chart().build().unwrap();
    chart.initialize().unwrap();
    chart.goto_state("z").unwrap();
    chart.monitor_mut().unwrap().reset();

    // Target a leaf inside region b; region c must come up alongside.
    chart.goto_state("e").unwrap();

    assert_eq!(chart.current_states(), vec!["e", "f"]);
    let expected = Sequence::new()
        .exited(&["z"])
        .entered(&["a", "b", "e", "c", "f"]);
    assert!(chart.monitor().unwrap().matches(&expected));
}

#[test]
fn region_queries_scope_to_their_subtree() {
    let mut chart = parallel_chart().build().unwrap();
    chart.initialize().unwrap();

    assert_eq!(chart.current_substates_of("b"), vec!["d"]);
    assert_eq!(chart.current_substates_of("c"), vec!["f"]);
    assert_eq!(chart.current_substates_of("a"), vec!["d", "f"]);
    assert!(chart.is_current_substate_of("a", "f"));
    assert!(!chart.is_current_substate_of("b", "f"));

    assert!(chart.is_parallel_child("b"));
    assert!(chart.is_parallel_child("c"));
    assert!(!chart.is_parallel_child("d"));
    assert!(!chart.is_parallel_child("a"));
}
