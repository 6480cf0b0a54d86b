use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mts_core::{ExecutionResult, TraceHook, TraceRecord};
use parking_lot::Mutex;

use crate::completion::Completion;
use crate::mailbox::{Mailbox, MailboxEntry, MailboxWriteError, WakeSignal};

fn entry(order: &Arc<Mutex<Vec<u32>>>, value: u32) -> MailboxEntry {
    let order = order.clone();
    MailboxEntry::new(Arc::from("Record"), move || {
        order.lock().push(value);
        ExecutionResult::Succeeded
    })
}

#[test]
fn drains_in_fifo_order() {
    let mailbox = Mailbox::allocate("fifo", 8);
    let order = Arc::new(Mutex::new(Vec::new()));

    for value in 1..=5 {
        mailbox.write(entry(&order, value)).expect("write");
    }
    assert_eq!(mailbox.len(), 5);
    assert_eq!(mailbox.process(), 5);
    assert!(mailbox.is_empty());
    assert_eq!(*order.lock(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn rejects_writes_when_full() {
    let mailbox = Mailbox::allocate("small", 2);
    let order = Arc::new(Mutex::new(Vec::new()));
    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = records.clone();
    let hook: TraceHook = Arc::new(move |record: &TraceRecord| sink.lock().push(record.clone()));
    mailbox.set_trace_hook(Some(hook));

    mailbox.write(entry(&order, 1)).expect("first");
    mailbox.write(entry(&order, 2)).expect("second");
    let err = mailbox.write(entry(&order, 3)).unwrap_err();
    assert!(matches!(err, MailboxWriteError::Full(_)));
    assert_eq!(err.result(), ExecutionResult::MailboxFull);
    assert_eq!(err.into_entry().command(), "Record");

    assert_eq!(mailbox.process(), 2);
    assert_eq!(*order.lock(), vec![1, 2]);
    assert_eq!(mailbox.stats().rejected, 1);
    assert!(matches!(
        records.lock().as_slice(),
        [TraceRecord::MailboxFull { .. }]
    ));
}

#[test]
fn zero_capacity_is_clamped() {
    let mailbox = Mailbox::allocate("clamped", 0);
    assert_eq!(mailbox.capacity(), 1);
}

#[test]
fn close_releases_pending_entries() {
    let mailbox = Mailbox::allocate("closing", 4);
    let ran = Arc::new(AtomicUsize::new(0));
    let completion = Arc::new(Completion::new());

    let probe = ran.clone();
    let pending = MailboxEntry::new(Arc::from("Never"), move || {
        probe.fetch_add(1, Ordering::SeqCst);
        ExecutionResult::Succeeded
    })
    .with_completion(completion.clone());
    mailbox.write(pending).expect("write");

    assert_eq!(mailbox.close(), 1);
    assert!(mailbox.is_closed());
    assert_eq!(completion.wait(), ExecutionResult::NoMailbox);
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    let order = Arc::new(Mutex::new(Vec::new()));
    let err = mailbox.write(entry(&order, 1)).unwrap_err();
    assert_eq!(err.result(), ExecutionResult::NoMailbox);
}

#[test]
fn sealed_mailbox_drains_but_accepts_nothing_new() {
    let mailbox = Mailbox::allocate("sealed", 4);
    let order = Arc::new(Mutex::new(Vec::new()));
    mailbox.write(entry(&order, 1)).expect("write");

    mailbox.seal();
    assert!(mailbox.is_sealed());
    assert!(!mailbox.is_closed());
    let err = mailbox.write(entry(&order, 2)).unwrap_err();
    assert_eq!(err.result(), ExecutionResult::NoMailbox);

    assert_eq!(mailbox.process(), 1);
    assert_eq!(*order.lock(), vec![1]);
}

#[test]
fn panicking_entry_still_completes() {
    let mailbox = Mailbox::allocate("panics", 4);
    let completion = Arc::new(Completion::new());
    let doomed = MailboxEntry::new(Arc::from("Explode"), || -> ExecutionResult {
        panic!("callable failed")
    })
    .with_completion(completion.clone());
    mailbox.write(doomed).expect("write");

    let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| mailbox.process()));
    assert!(unwound.is_err());
    assert_eq!(
        completion.wait_timeout(Duration::from_secs(1)),
        Some(ExecutionResult::MethodOrFunctionFailed)
    );
    assert!(mailbox.is_empty());
}

#[test]
fn write_raises_wake_signal() {
    let mailbox = Mailbox::allocate("wake", 4);
    let wake = WakeSignal::new();
    mailbox.set_wake_signal(wake.clone());

    assert!(!wake.wait_timeout(Duration::from_millis(1)));

    let order = Arc::new(Mutex::new(Vec::new()));
    mailbox.write(entry(&order, 1)).expect("write");
    assert!(wake.wait_timeout(Duration::from_millis(1)));
    assert!(!wake.wait_timeout(Duration::from_millis(1)));
}

#[test]
fn many_producers_one_consumer() {
    let mailbox = Mailbox::allocate("mpsc", 256);
    let order = Arc::new(Mutex::new(Vec::new()));

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let mailbox = mailbox.clone();
            let order = order.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    mailbox.write(entry(&order, p * 100 + i)).expect("write");
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer");
    }

    assert_eq!(mailbox.process(), 200);
    let order = order.lock();
    for p in 0..4 {
        let from_producer: Vec<u32> = order.iter().copied().filter(|v| v / 100 == p).collect();
        let expected: Vec<u32> = (0..50).map(|i| p * 100 + i).collect();
        assert_eq!(from_producer, expected);
    }
}
