pub mod websocket;

use crate::net::protocol::ServerMessage;
use async_trait::async_trait;

#[async_trait]
pub trait ClientSink: Send {
    async fn send_frame(&mut self, frame: &ServerMessage, seq: u64) -> anyhow::Result<()>;

    /// Ends the stream once no more frames will come.
    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
