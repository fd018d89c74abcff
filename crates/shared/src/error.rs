use thiserror::Error;

use crate::protocol::Channel;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed {channel} frame: {source}")]
    Malformed {
        channel: Channel,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {channel} frame: {source}")]
    Encode {
        channel: Channel,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    pub fn channel(&self) -> Channel {
        match self {
            Self::Malformed { channel, .. } | Self::Encode { channel, .. } => *channel,
        }
    }
}
