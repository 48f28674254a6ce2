//! Snapshot feed server: polls OpenSky (or generates demo traffic), keeps a
//! sliding window of frames and pushes it to websocket clients.

pub mod demo;
pub mod opensky;
pub mod server;
pub mod store;

pub use demo::DemoTraffic;
pub use opensky::{parse_state_row, OpenSkyClient};
pub use server::{run, Poller};
pub use store::FrameStore;
