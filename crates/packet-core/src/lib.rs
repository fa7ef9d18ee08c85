pub mod assembly;
pub mod error;
pub mod model;
pub mod snapshot;

pub use assembly::{AssemblyConfig, PacketAssembler, PacketSet, Strategy};
pub use error::{PacketError, SchemaError};

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "packet-gen"
    }

    pub const fn codename() -> &'static str {
        "Round Robin"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
