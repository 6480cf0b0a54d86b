use crate::builtin;
use crate::error::StateTableError;
use crate::table::StateTable;

#[test]
fn history_length_has_a_minimum() {
    let table = StateTable::new("tiny", 1);
    assert_eq!(table.history_length(), 3);
}

#[test]
fn builtin_columns_are_registered() {
    let table = StateTable::new("t", 8);
    let names = table.element_names();
    for name in [builtin::TOC, builtin::TIC, builtin::PERIOD] {
        assert!(names.iter().any(|n| n == name), "missing {name}");
    }
}

#[test]
fn duplicate_element_is_rejected() {
    let mut table = StateTable::new("t", 8);
    table.add_element("Count", 0_u32).expect("first");
    assert_eq!(
        table.add_element("Count", 0_u32).unwrap_err(),
        StateTableError::DuplicateElement("Count".into())
    );
}

#[test]
fn initial_value_is_readable_before_first_advance() {
    let mut table = StateTable::new("t", 8);
    table.add_element("Gain", 1.5_f64).expect("add");
    let gain = table.accessor::<f64>("Gain").expect("accessor");
    assert_eq!(gain.latest(), Ok(1.5));
}

#[test]
fn values_become_visible_after_advance() {
    let mut table = StateTable::new("t", 8);
    let count = table.add_element("Count", 0_u32).expect("add");
    let reader = table.reader().accessor::<u32>("Count").expect("accessor");

    count.set(5);
    assert_eq!(reader.latest(), Ok(0));

    table.start();
    table.advance();
    assert_eq!(reader.latest(), Ok(5));
}

#[test]
fn writer_index_is_monotonic_modulo_length() {
    let mut table = StateTable::new("t", 5);
    let start = table.index_writer().index();

    for n in 1..=12 {
        table.start();
        table.advance();
        assert_eq!(table.index_writer().index(), (start + n) % 5);
        assert_eq!(table.index_writer().ticks(), n as u64);
        assert_eq!(table.index_reader().ticks(), n as u64 - 1);
    }
}

#[test]
fn history_reads_earlier_rows() {
    let mut table = StateTable::new("t", 6);
    let count = table.add_element("Count", 0_i32).expect("add");
    let accessor = table.accessor::<i32>("Count").expect("accessor");

    for value in 1..=8 {
        count.set(value);
        table.start();
        table.advance();
    }

    assert_eq!(accessor.history(0), Ok(8));
    assert_eq!(accessor.history(1), Ok(7));
    assert_eq!(accessor.history(4), Ok(4));
    assert_eq!(
        accessor.history(5),
        Err(StateTableError::OffsetOutOfRange {
            offset: 5,
            available: 5,
        })
    );
}

#[test]
fn reused_row_is_reported_stale() {
    let mut table = StateTable::new("t", 4);
    let count = table.add_element("Count", 0_i32).expect("add");
    let accessor = table.accessor::<i32>("Count").expect("accessor");

    count.set(1);
    table.advance();
    let (index, value) = accessor.latest_indexed().expect("latest");
    assert_eq!(value, 1);

    for value in 2..=5 {
        count.set(value);
        table.advance();
    }

    assert!(!table.validate(&index));
    assert!(matches!(
        accessor.get(&index),
        Err(StateTableError::StaleIndex { .. })
    ));
}

#[test]
fn range_returns_consecutive_rows() {
    let mut table = StateTable::new("t", 8);
    let count = table.add_element("Count", 0_i32).expect("add");
    let accessor = table.accessor::<i32>("Count").expect("accessor");

    count.set(10);
    table.advance();
    let first = table.index_reader();
    for value in 11..=13 {
        count.set(value);
        table.advance();
    }
    let last = table.index_reader();

    assert_eq!(accessor.range(&first, &last), Ok(vec![10, 11, 12, 13]));
}

#[test]
fn delayed_read_trails_latest() {
    let mut table = StateTable::new("t", 8);
    let count = table.add_element("Count", 0_i32).expect("add");
    let accessor = table.accessor::<i32>("Count").expect("accessor");
    assert_eq!(table.set_delay(2), 0);

    for value in 1..=5 {
        count.set(value);
        table.advance();
    }
    assert_eq!(accessor.latest(), Ok(5));
    assert_eq!(accessor.delayed(), Ok(3));
}

#[test]
fn accessor_checks_type_and_name() {
    let mut table = StateTable::new("t", 8);
    table.add_element("Count", 0_u32).expect("add");

    assert!(matches!(
        table.accessor::<f64>("Count"),
        Err(StateTableError::TypeMismatch { .. })
    ));
    assert!(matches!(
        table.accessor::<u32>("Missing"),
        Err(StateTableError::UnknownElement(_))
    ));
}

#[test]
fn period_is_measured_between_starts() {
    let mut table = StateTable::new("t", 8);
    for _ in 0..3 {
        table.start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        table.advance();
    }
    assert!(table.period() >= std::time::Duration::from_millis(4));
    assert!(table.average_period() > std::time::Duration::ZERO);
    assert!(table.toc() >= table.tic());
}

#[test]
fn automatic_advance_can_be_disabled() {
    let mut table = StateTable::new("t", 8);
    table.set_automatic_advance(false);
    table.start_if_automatic();
    assert!(!table.is_started());
    table.advance_if_automatic();
    assert_eq!(table.index_writer().ticks(), 0);

    table.set_automatic_advance(true);
    table.start_if_automatic();
    assert!(table.is_started());
    table.advance_if_automatic();
    assert!(!table.is_started());
    assert_eq!(table.index_writer().ticks(), 1);
}
