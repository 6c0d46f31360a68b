//! Client wire protocol: WebSocket text frames carrying named events.

pub mod frame;

pub use frame::{parse_client_frame, ClientFrame, FrameError, COMMAND_EVENT};
