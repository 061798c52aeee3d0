//! Hostgate Client
//!
//! A small HTTP client for a running hostgate gateway. It speaks the
//! gateway's three operations and hands back the decoded [`ExecutionResult`]
//! envelope, whatever its `errcode`.
//!
//! [`ExecutionResult`]: hostgate_common::ExecutionResult

pub mod client;

pub use client::GatewayClient;
