//! # mts-remote
//!
//! Serialized command boundary between processes.
//!
//! A [`CommandServer`] exposes commands of one provided interface under
//! numeric ids. A [`CommandClient`] encodes invocations as JSON frames and
//! sends them over a [`Transport`]; the typed proxies in [`proxy`]
//! implement the command traits on top of the client, so a function bound
//! to a proxy behaves like one bound to a local command.
//!
//! Failures never escape as panics or errors from a call: they surface as
//! `NetworkError`, `InvalidCommandId`, `InvalidInputType`,
//! `SerializationError` or `DeserializationError` results.

#![forbid(unsafe_code)]

pub mod client;
pub mod error;
pub mod message;
pub mod proxy;
pub mod server;
pub mod transport;

pub use client::CommandClient;
pub use error::RemoteError;
pub use message::{ClientId, CommandId, Request, Response};
pub use proxy::{
    RemoteQualifiedRead, RemoteRead, RemoteVoid, RemoteVoidReturn, RemoteWrite, RemoteWriteReturn,
};
pub use server::CommandServer;
pub use transport::{LoopbackTransport, Transport};

#[cfg(test)]
mod tests;
