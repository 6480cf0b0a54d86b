use crate::ComponentState::{self, *};

#[test]
fn states_are_totally_ordered() {
    let ordered = [Constructed, Initializing, Ready, Active, Finishing, Finished];
    for pair in ordered.windows(2) {
        assert!(pair[0] < pair[1]);
        assert!(pair[0].can_transition_to(pair[1]));
    }
}

#[test]
fn no_backward_transitions() {
    let all = [Constructed, Initializing, Ready, Active, Finishing, Finished];
    for from in all {
        for to in all {
            if to <= from {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }
}

#[test]
fn terminal_path_reachable_from_any_started_state() {
    for from in [Initializing, Ready, Active] {
        assert!(from.can_transition_to(Finishing));
        assert!(!from.can_transition_to(Finished));
    }
    assert!(Constructed.can_transition_to(Finished));
    assert!(!Constructed.can_transition_to(Ready));
    assert!(Finishing.is_terminating());
    assert!(!ComponentState::Active.is_terminating());
}
