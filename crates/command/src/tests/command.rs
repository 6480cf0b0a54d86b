use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mts_core::{Blocking, ExecutionResult, Prototype};

use crate::callable::Instance;
use crate::command::{
    Command, CommandQualifiedRead, CommandRead, CommandVoid, CommandWrite, CommandWriteReturn,
    QualifiedReadCommand, ReadCommand, VoidCommand, WriteCommand, WriteReturnCommand,
};
use crate::kind::CommandKind;

#[derive(Default)]
struct Counter {
    value: i64,
}

impl Counter {
    fn increment(&mut self) {
        self.value += 1;
    }

    fn add(&mut self, amount: &i64) -> bool {
        if *amount < 0 {
            return false;
        }
        self.value += amount;
        true
    }

    fn get(&self, out: &mut i64) {
        *out = self.value;
    }

    fn scaled(&self, factor: &i64, out: &mut i64) {
        *out = self.value * factor;
    }
}

#[test]
fn void_command_runs_callable() {
    let hits = Arc::new(AtomicUsize::new(0));
    let probe = hits.clone();
    let command = CommandVoid::new("Ping", move || {
        probe.fetch_add(1, Ordering::SeqCst);
        ExecutionResult::Succeeded
    });

    assert_eq!(command.execute(Blocking::No), ExecutionResult::Succeeded);
    assert_eq!(command.execute(Blocking::Yes), ExecutionResult::Succeeded);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(command.kind(), CommandKind::Void);
    assert!(command.argument_prototype().is_none());
}

#[test]
fn disabled_command_skips_callable() {
    let hits = Arc::new(AtomicUsize::new(0));
    let probe = hits.clone();
    let command = CommandWrite::<u32>::new("Set", move |_| {
        probe.fetch_add(1, Ordering::SeqCst);
        ExecutionResult::Succeeded
    });

    command.disable();
    assert_eq!(command.execute(&3, Blocking::No), ExecutionResult::Disabled);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    command.enable();
    assert_eq!(command.execute(&3, Blocking::No), ExecutionResult::Succeeded);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn instance_methods_bind_to_commands() {
    let counter = Instance::new(Counter::default());
    let increment = CommandVoid::new("Increment", counter.void(Counter::increment));
    let add = CommandWrite::new("Add", counter.write(Counter::add));
    let get = CommandRead::new("Get", counter.read(Counter::get));
    let scaled = CommandQualifiedRead::new("Scaled", counter.qualified_read(Counter::scaled));

    assert_eq!(increment.execute(Blocking::No), ExecutionResult::Succeeded);
    assert_eq!(add.execute(&4, Blocking::No), ExecutionResult::Succeeded);
    assert_eq!(
        add.execute(&-1, Blocking::No),
        ExecutionResult::MethodOrFunctionFailed
    );

    let mut value = 0;
    assert_eq!(get.execute(&mut value), ExecutionResult::Succeeded);
    assert_eq!(value, 5);

    assert_eq!(scaled.execute(&3, &mut value), ExecutionResult::Succeeded);
    assert_eq!(value, 15);
    assert_eq!(counter.lock().value, 5);
}

#[test]
fn prototypes_are_captured_at_construction() {
    let command = CommandWriteReturn::<String, Vec<f64>>::new("Parse", |text, out| {
        out.clear();
        out.extend(text.split(',').filter_map(|s| s.trim().parse::<f64>().ok()));
        ExecutionResult::Succeeded
    });

    assert_eq!(command.kind(), CommandKind::WriteReturn);
    assert_eq!(command.argument_prototype(), Some(Prototype::of::<String>()));
    assert_eq!(command.result_prototype(), Some(Prototype::of::<Vec<f64>>()));

    let mut out = Vec::new();
    assert_eq!(
        command.execute(&"1.5, 2, x".to_owned(), &mut out),
        ExecutionResult::Succeeded
    );
    assert_eq!(out, vec![1.5, 2.0]);
}

#[test]
fn describe_names_signature() {
    let command = CommandWrite::<f64>::new("SetGain", |_| ExecutionResult::Succeeded);
    assert_eq!(command.describe(), "write SetGain(f64) -> ()");

    command.disable();
    assert!(command.describe().ends_with("[disabled]"));
}
