use anyhow::Result;
use async_trait::async_trait;
use interview_core::ports::OutboundPort;
use protocol::Reply;

/// Delivers engine replies through the Telegram client.
pub struct TelegramOutbound {
    client: telegram::Client,
}

impl TelegramOutbound {
    pub fn new(client: telegram::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OutboundPort for TelegramOutbound {
    async fn send(&self, reply: Reply) -> Result<()> {
        self.client.send_reply(&reply).await
    }
}
