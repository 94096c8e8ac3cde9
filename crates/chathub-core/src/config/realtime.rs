//! Real-time relay configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound buffer size per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Milliseconds after which a typing indicator expires without refresh.
    #[serde(default = "default_typing_expiry")]
    pub typing_expiry_ms: u64,
    /// Cadence of the typing expiry sweep in milliseconds.
    #[serde(default = "default_sweep_interval")]
    pub typing_sweep_interval_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            typing_expiry_ms: default_typing_expiry(),
            typing_sweep_interval_ms: default_sweep_interval(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_typing_expiry() -> u64 {
    5000
}

fn default_sweep_interval() -> u64 {
    1000
}
