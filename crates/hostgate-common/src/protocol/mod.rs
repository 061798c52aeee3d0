pub mod error;
pub mod result;


pub use error::{GatewayError, HostError, Result, StartError};
pub use result::{status, ExecutionRequest, ExecutionResult};
