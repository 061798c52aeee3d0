pub mod boa_host;
pub mod host;
pub mod proxy;

pub use boa_host::BoaHost;
pub use host::ScriptHost;
pub use proxy::HostProxy;
