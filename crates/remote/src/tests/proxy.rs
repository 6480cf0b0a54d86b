use mts_command::{
    Command, FunctionQualifiedRead, FunctionRead, FunctionVoid, FunctionVoidReturn, FunctionWrite,
    FunctionWriteReturn,
};
use mts_core::ExecutionResult;

use super::Fixture;
use crate::{
    RemoteQualifiedRead, RemoteRead, RemoteVoid, RemoteVoidReturn, RemoteWrite, RemoteWriteReturn,
};

#[test]
fn functions_bind_to_remote_commands() {
    let f = Fixture::new();
    let client = || f.client.clone();

    let reset = FunctionVoid::new();
    reset.bind(RemoteVoid::new("Reset", client(), f.id, f.command("Reset")));
    let add = FunctionWrite::<i64>::new();
    add.bind(RemoteWrite::new("Add", client(), f.id, f.command("Add")));
    let total = FunctionRead::<i64>::new();
    total.bind(RemoteRead::new("Total", client(), f.id, f.command("Total")));
    let scale = FunctionQualifiedRead::<i64, i64>::new();
    scale.bind(RemoteQualifiedRead::new("Scale", client(), f.id, f.command("Scale")));
    let resets = FunctionVoidReturn::<u32>::new();
    resets.bind(RemoteVoidReturn::new("Resets", client(), f.id, f.command("Resets")));
    let shout = FunctionWriteReturn::<String, String>::new();
    shout.bind(RemoteWriteReturn::new("Shout", client(), f.id, f.command("Shout")));

    assert_eq!(add.execute(&3), ExecutionResult::Succeeded);
    assert_eq!(add.execute_blocking(&4), ExecutionResult::Succeeded);
    assert_eq!(reset.execute(), ExecutionResult::Succeeded);

    let mut value = 0;
    assert_eq!(total.execute(&mut value), ExecutionResult::Succeeded);
    assert_eq!(value, 7);

    let mut scaled = 0;
    assert_eq!(scale.execute(&2, &mut scaled), ExecutionResult::Succeeded);
    assert_eq!(scaled, 20);

    let mut count = 0;
    assert_eq!(resets.execute(&mut count), ExecutionResult::Succeeded);
    assert_eq!(count, 1);

    let mut loud = String::new();
    assert_eq!(shout.execute(&"hi".to_owned(), &mut loud), ExecutionResult::Succeeded);
    assert_eq!(loud, "HI");
}

#[test]
fn proxy_reports_its_prototypes() {
    let f = Fixture::new();
    let proxy = RemoteWriteReturn::<String, String>::new(
        "Shout",
        f.client.clone(),
        f.id,
        f.command("Shout"),
    );
    assert_eq!(proxy.name(), "Shout");
    assert_eq!(proxy.command_id(), f.command("Shout"));
    assert_eq!(proxy.client_id(), f.id);
    assert!(proxy.argument_prototype().unwrap().is::<String>());
    assert!(proxy.result_prototype().unwrap().is::<String>());
}

#[test]
fn disabled_proxy_never_reaches_the_server() {
    let f = Fixture::new();
    let proxy = RemoteWrite::<i64>::new("Add", f.client.clone(), f.id, f.command("Add"));
    let add = FunctionWrite::<i64>::new();
    add.bind(proxy.clone());

    proxy.disable();
    assert!(!proxy.is_enabled());
    assert_eq!(add.execute(&5), ExecutionResult::Disabled);
    assert_eq!(*f.total.lock(), 0);

    proxy.enable();
    assert_eq!(add.execute(&5), ExecutionResult::Succeeded);
    assert_eq!(*f.total.lock(), 5);
}

#[test]
fn read_keeps_its_output_on_failure() {
    let f = Fixture::new();
    f.transport.set_online(false);
    let total = FunctionRead::<i64>::new();
    total.bind(RemoteRead::new("Total", f.client.clone(), f.id, f.command("Total")));
    let mut value = -1;
    assert_eq!(total.execute(&mut value), ExecutionResult::NetworkError);
    assert_eq!(value, -1);
}
