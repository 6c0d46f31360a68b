//! Application layer: the relay's use cases.
//!
//! - [`coordinator`] runs the relay: address retry, hub startup, fan-in of
//!   commands and discovery results, link preparation and shutdown.
//! - [`sink`] defines the single presentation surface notifications go to.

pub mod coordinator;
pub mod sink;

pub use coordinator::{
    DiagnosticHook, RelayCoordinator, RelayDiagnostic, RelayError, RelayReady, RelayStartup,
};
pub use sink::{ChannelSink, PresentationSink};
