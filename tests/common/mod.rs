//! Common test utilities for bridge integration tests.

pub mod recording_channel;
pub mod staged_host;

pub use recording_channel::RecordingChannel;
pub use staged_host::StagedHost;
