#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned status {status}")]
    UnexpectedStatus { status: u16 },
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Push transport error: {0}")]
    Transport(String),

    #[error("Not connected to showtime {0}")]
    NotConnected(String),
}
