use std::collections::BTreeMap;
use std::sync::atomic::Ordering;

use mts_command::CommandKind;
use mts_core::{Blocking, ExecutionResult};

use super::Fixture;
use crate::message::{self, Request, Response};
use crate::{ClientId, CommandId, RemoteError};

#[test]
fn ids_follow_exposure_order() {
    let f = Fixture::new();
    let commands = f.server.commands();
    assert_eq!(commands.len(), 6);
    assert_eq!(commands[0], (CommandId(0), "Reset".to_owned(), CommandKind::Void));
    assert_eq!(commands[5].2, CommandKind::WriteReturn);
    assert_eq!(f.server.command_id("Total"), Some(CommandId(2)));
    assert_eq!(f.server.command_id("Missing"), None);
}

#[test]
fn exposing_requires_an_existing_unique_command() {
    let f = Fixture::new();
    assert!(matches!(
        f.server.expose_void("Missing"),
        Err(RemoteError::UnknownCommand(name)) if name == "Missing"
    ));
    assert!(matches!(
        f.server.expose_write::<i64>("Add"),
        Err(RemoteError::DuplicateCommand(name)) if name == "Add"
    ));
}

#[test]
fn every_kind_crosses_the_boundary() {
    let f = Fixture::new();

    let reset = f.command("Reset");
    assert_eq!(
        f.client.send_execute_command_void_serialized(f.id, reset, Blocking::No),
        ExecutionResult::Succeeded
    );
    assert_eq!(f.resets.load(Ordering::SeqCst), 1);

    let add = f.command("Add");
    assert_eq!(
        f.client.send_execute_command_write_serialized(f.id, add, &7_i64, Blocking::Yes),
        ExecutionResult::Succeeded
    );
    assert_eq!(*f.total.lock(), 7);

    let mut total = 0_i64;
    assert_eq!(
        f.client
            .send_execute_command_read_serialized(f.id, f.command("Total"), &mut total),
        ExecutionResult::Succeeded
    );
    assert_eq!(total, 7);

    let mut scaled = 0_i64;
    assert_eq!(
        f.client.send_execute_command_qualified_read_serialized(
            f.id,
            f.command("Scale"),
            &4_i64,
            &mut scaled
        ),
        ExecutionResult::Succeeded
    );
    assert_eq!(scaled, 40);

    let mut resets = 0_u32;
    assert_eq!(
        f.client
            .send_execute_command_void_return_serialized(f.id, f.command("Resets"), &mut resets),
        ExecutionResult::Succeeded
    );
    assert_eq!(resets, 1);

    let mut shouted = String::new();
    assert_eq!(
        f.client.send_execute_command_write_return_serialized(
            f.id,
            f.command("Shout"),
            &"quiet".to_owned(),
            &mut shouted
        ),
        ExecutionResult::Succeeded
    );
    assert_eq!(shouted, "QUIET");
}

#[test]
fn unknown_command_id_is_reported() {
    let f = Fixture::new();
    assert_eq!(
        f.client
            .send_execute_command_void_serialized(f.id, CommandId(42), Blocking::No),
        ExecutionResult::InvalidCommandId
    );
}

#[test]
fn unknown_client_is_a_network_error() {
    let f = Fixture::new();
    assert_eq!(
        f.client.send_execute_command_void_serialized(
            ClientId(99),
            f.command("Reset"),
            Blocking::No
        ),
        ExecutionResult::NetworkError
    );
    assert_eq!(f.resets.load(Ordering::SeqCst), 0);
}

#[test]
fn offline_transport_is_a_network_error() {
    let f = Fixture::new();
    f.transport.set_online(false);
    let mut total = 5_i64;
    assert_eq!(
        f.client
            .send_execute_command_read_serialized(f.id, f.command("Total"), &mut total),
        ExecutionResult::NetworkError
    );
    assert_eq!(total, 5);

    f.transport.set_online(true);
    assert_eq!(
        f.client
            .send_execute_command_read_serialized(f.id, f.command("Total"), &mut total),
        ExecutionResult::Succeeded
    );
    assert_eq!(total, 0);
}

#[test]
fn kind_mismatch_is_rejected() {
    let f = Fixture::new();
    let mut value = 0_i64;
    assert_eq!(
        f.client
            .send_execute_command_read_serialized(f.id, f.command("Reset"), &mut value),
        ExecutionResult::InvalidInputType
    );
    assert_eq!(f.resets.load(Ordering::SeqCst), 0);
}

#[test]
fn undecodable_argument_is_a_deserialization_error() {
    let f = Fixture::new();
    assert_eq!(
        f.client.send_execute_command_write_serialized(
            f.id,
            f.command("Add"),
            &"seven".to_owned(),
            Blocking::No
        ),
        ExecutionResult::DeserializationError
    );
    assert_eq!(*f.total.lock(), 0);
}

#[test]
fn unencodable_argument_is_a_serialization_error() {
    let f = Fixture::new();
    let mut argument = BTreeMap::new();
    argument.insert(vec![1_u8, 2], 3_u8);
    assert_eq!(
        f.client.send_execute_command_write_serialized(
            f.id,
            f.command("Add"),
            &argument,
            Blocking::No
        ),
        ExecutionResult::SerializationError
    );
}

#[test]
fn result_of_the_wrong_type_is_a_deserialization_error() {
    let f = Fixture::new();
    let mut shouted = 0_u64;
    assert_eq!(
        f.client.send_execute_command_write_return_serialized(
            f.id,
            f.command("Shout"),
            &"quiet".to_owned(),
            &mut shouted
        ),
        ExecutionResult::DeserializationError
    );
    assert_eq!(shouted, 0);
}

#[test]
fn server_side_failures_pass_through_unchanged() {
    let f = Fixture::new();
    f.provided.disable_command("Reset").unwrap();
    assert_eq!(
        f.client
            .send_execute_command_void_serialized(f.id, f.command("Reset"), Blocking::No),
        ExecutionResult::Disabled
    );
    f.provided.enable_command("Reset").unwrap();
    assert_eq!(
        f.client
            .send_execute_command_void_serialized(f.id, f.command("Reset"), Blocking::No),
        ExecutionResult::Succeeded
    );
}

#[test]
fn malformed_frame_gets_a_deserialization_error() {
    let f = Fixture::new();
    let reply = f.server.handle(b"not a frame");
    let response: Response = message::decode_frame(&reply).unwrap();
    assert_eq!(response, Response::status(ExecutionResult::DeserializationError));
}

#[test]
fn frames_are_plain_json() {
    let request = Request {
        client: ClientId(3),
        command: CommandId(1),
        kind: CommandKind::Write,
        blocking: Blocking::No,
        argument: Some(message::encode(&12_i64).unwrap()),
    };
    let frame = message::encode_frame(&request).unwrap();
    let text = std::str::from_utf8(&frame).unwrap();
    assert!(text.contains("\"argument\":\"12\""));
    assert_eq!(message::decode_frame::<Request>(&frame).unwrap(), request);
}

#[test]
fn each_client_gets_its_own_connection() {
    let f = Fixture::new();
    let second = f.server.connect_client("other").unwrap();
    assert_ne!(second, f.id);
    assert_eq!(f.server.client_count(), 2);
    assert_eq!(f.provided.clients().len(), 2);

    f.server.disconnect_client(second).unwrap();
    assert_eq!(f.server.client_count(), 1);
    assert_eq!(f.provided.clients().len(), 1);
    assert_eq!(
        f.client
            .send_execute_command_void_serialized(second, f.command("Reset"), Blocking::No),
        ExecutionResult::NetworkError
    );
    assert!(matches!(
        f.server.disconnect_client(second),
        Err(RemoteError::UnknownClient(id)) if id == second
    ));
}
