//! Hostgate Common Types and Transport
//!
//! This crate provides the protocol definitions and HTTP helpers shared by
//! the hostgate server, client and CLI.
//!
//! # Overview
//!
//! Hostgate is a narrow HTTP gateway that accepts remote script-execution
//! requests and runs them, one at a time, on a host application's single
//! execution context. This crate contains the pieces every side of the wire
//! needs to agree on:
//!
//! - **Protocol Layer**: [`ExecutionResult`] and its fixed JSON shape, plus
//!   the error taxonomy
//! - **Transport Layer**: HTTP response construction, bounded body reads and
//!   form-body decoding
//!
//! # Wire Format
//!
//! Every response body has the same shape, and every response is HTTP 200 at
//! the transport level:
//!
//! ```text
//! {"errcode":200,"msg":"success","data":{"res":"healthy"}}
//! ```
//!
//! # Example
//!
//! ```
//! use hostgate_common::ExecutionResult;
//!
//! let result = ExecutionResult::success("/tmp/a.ess");
//! assert_eq!(
//!     result.to_json(),
//!     r#"{"errcode":200,"msg":"success","data":{"res":"/tmp/a.ess"}}"#
//! );
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
