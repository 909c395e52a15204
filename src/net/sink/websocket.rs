use crate::net::protocol::ServerMessage;
use crate::net::sink::ClientSink;
use async_trait::async_trait;
use futures::SinkExt;
use serde::Serialize;

pub struct WebSocketSink<S, M> {
    ws: S,
    _phantom: std::marker::PhantomData<M>,
}

impl<S, M> WebSocketSink<S, M> {
    pub fn new(ws: S) -> Self {
        Self {
            ws,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[derive(Serialize)]
struct WsEnvelope<'a> {
    seq: u64,
    frame: &'a ServerMessage,
}

#[async_trait]
impl<S, M> ClientSink for WebSocketSink<S, M>
where
    S: SinkExt<M> + Unpin + Send,
    S::Error: std::error::Error + Send + Sync + 'static,
    M: From<String> + Send,
{
    async fn send_frame(&mut self, frame: &ServerMessage, seq: u64) -> anyhow::Result<()> {
        let env = WsEnvelope { seq, frame };
        let json = serde_json::to_string(&env)?;

        self.ws
            .send(json.into())
            .await
            .map_err(|e| anyhow::Error::msg(format!("websocket send failed: {e}")))?;

        Ok(())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.ws
            .close()
            .await
            .map_err(|e| anyhow::Error::msg(format!("websocket close failed: {e}")))
    }
}
