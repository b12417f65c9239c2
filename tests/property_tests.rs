//! Property-based tests over randomly generated state trees.
//!
//! These tests use proptest to check structural invariants that must
//! hold for any chart shape: where the current-state set may live,
//! which transitions can fail, and that transitions are reproducible.

use proptest::prelude::*;
use statechart::{ChartBuilder, ChartError, StateTemplate, Statechart};

/// Abstract tree shape; names are assigned in a deterministic pre-order
/// pass so every generated chart has unique state names.
#[derive(Clone, Debug)]
struct Shape {
    parallel: bool,
    children: Vec<Shape>,
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    let leaf = Just(Shape {
        parallel: false,
        children: Vec::new(),
    });
    leaf.prop_recursive(3, 24, 4, |inner| {
        (any::<bool>(), prop::collection::vec(inner, 1..4)).prop_map(|(parallel, children)| Shape {
            parallel,
            children,
        })
    })
}

fn to_template(shape: &Shape, counter: &mut usize) -> StateTemplate {
    let name = format!("s{}", *counter);
    *counter += 1;
    let mut template = StateTemplate::new(name);
    if shape.parallel && !shape.children.is_empty() {
        template = template.parallel();
    }
    for child in &shape.children {
        template = template.substate(to_template(child, counter));
    }
    template
}

fn leaf_names(template: &StateTemplate, out: &mut Vec<String>) {
    if template.substates.is_empty() {
        out.push(template.name.clone());
        return;
    }
    for child in &template.substates {
        leaf_names(child, out);
    }
}

/// Leaves the chart must occupy right after initialization: the first
/// child at every exclusive level, every child at parallel levels.
fn expected_initial_leaves(template: &StateTemplate, out: &mut Vec<String>) {
    if template.substates.is_empty() {
        out.push(template.name.clone());
        return;
    }
    if template.parallel {
        for child in &template.substates {
            expected_initial_leaves(child, out);
        }
    } else {
        expected_initial_leaves(&template.substates[0], out);
    }
}

/// Every exclusive state may host current leaves in at most one child
/// subtree.
fn assert_exclusivity(template: &StateTemplate, chart: &Statechart) {
    if !template.parallel {
        let occupied = template
            .substates
            .iter()
            .filter(|child| !chart.current_substates_of(&child.name).is_empty())
            .count();
        assert!(
            occupied <= 1,
            "state {} has current leaves in {} child subtrees",
            template.name,
            occupied
        );
    }
    for child in &template.substates {
        assert_exclusivity(child, chart);
    }
}

fn build_chart(shape: &Shape) -> (StateTemplate, Statechart) {
    let mut counter = 0;
    let template = to_template(shape, &mut counter);
    let chart = ChartBuilder::new()
        .initial(template.name.clone())
        .substate(template.clone())
        .build()
        .unwrap();
    (template, chart)
}

proptest! {
    #[test]
    fn initialization_occupies_the_default_leaves(shape in arb_shape()) {
        let (template, mut chart) = build_chart(&shape);
        chart.initialize().unwrap();

        let mut expected = Vec::new();
        expected_initial_leaves(&template, &mut expected);
        let current: Vec<String> =
            chart.current_states().iter().map(|s| s.to_string()).collect();

        let mut lhs = current.clone();
        let mut rhs = expected;
        lhs.sort();
        rhs.sort();
        prop_assert_eq!(lhs, rhs);
        assert_exclusivity(&template, &chart);
    }

    #[test]
    fn transitions_land_on_the_target_or_fail_on_a_parallel_pivot(
        shape in arb_shape(),
        pick in any::<prop::sample::Index>(),
    ) {
        let (template, mut chart) = build_chart(&shape);
        chart.initialize().unwrap();

        let mut leaves = Vec::new();
        leaf_names(&template, &mut leaves);
        let target = pick.get(&leaves).clone();

        match chart.goto_state(&target) {
            Ok(()) => {
                prop_assert!(chart.is_current(&target), "target {} not current", target);
                prop_assert!(!chart.current_states().is_empty());
                assert_exclusivity(&template, &chart);
            }
            Err(ChartError::AmbiguousPivot(_)) => {
                // Legal refusal: target and anchor only meet at a
                // parallel state. The chart must be untouched.
                let mut expected = Vec::new();
                expected_initial_leaves(&template, &mut expected);
                prop_assert_eq!(chart.current_state_count(), expected.len());
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn repeating_a_transition_reaches_the_same_configuration(
        shape in arb_shape(),
        pick in any::<prop::sample::Index>(),
    ) {
        let (template, mut chart) = build_chart(&shape);
        chart.initialize().unwrap();

        let mut leaves = Vec::new();
        leaf_names(&template, &mut leaves);
        let target = pick.get(&leaves).clone();

        if chart.goto_state(&target).is_err() {
            return Ok(());
        }
        let first: Vec<String> =
            chart.current_states().iter().map(|s| s.to_string()).collect();

        // Anchor the repeat at the target itself: it is current now, so
        // this is a self-transition and must reproduce the
        // configuration.
        chart.goto_state_from(&target, &target).unwrap();
        let second: Vec<String> =
            chart.current_states().iter().map(|s| s.to_string()).collect();

        let mut lhs = first;
        let mut rhs = second;
        lhs.sort();
        rhs.sort();
        prop_assert_eq!(lhs, rhs);
    }
}
