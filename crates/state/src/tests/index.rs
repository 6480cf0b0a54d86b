use crate::index::StateIndex;

#[test]
fn earlier_wraps_within_history() {
    let index = StateIndex::new(1, 10, 4);
    let back = index.earlier(3).expect("in range");
    assert_eq!(back.index(), 2);
    assert_eq!(back.ticks(), 7);
}

#[test]
fn earlier_before_first_cycle_is_none() {
    let index = StateIndex::new(2, 2, 8);
    assert!(index.earlier(2).is_some());
    assert!(index.earlier(3).is_none());
}

#[test]
fn next_advances_row_and_tick() {
    let index = StateIndex::new(3, 5, 4);
    let next = index.next();
    assert_eq!(next.index(), 0);
    assert_eq!(next.ticks(), 6);
}
