//! Minimal Telegram Bot API transport: long-poll `getUpdates` in,
//! `sendMessage` with reply keyboards out. Only the slice of the wire format
//! this bot consumes is modeled; unknown updates are skipped, never fatal.

use anyhow::{anyhow, Context, Result};
use protocol::{ChoiceSet, InboundEvent, Reply, UserRef};
use serde::Deserialize;
use serde_json::{json, Value};

pub const RESET_COMMAND: &str = "/start";

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub from: Option<TgUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// One resolution of an attached photo. Telegram sends sizes smallest-first.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

/// Decodes one update into an engine event. `None` means the update carries
/// nothing this bot reacts to; such updates are skipped with a log line,
/// never an error.
pub fn decode_update(update: &Update) -> Option<InboundEvent> {
    let event = decode_message(update);
    if event.is_none() {
        tracing::debug!(update_id = update.update_id, "skipping unsupported update");
    }
    event
}

fn decode_message(update: &Update) -> Option<InboundEvent> {
    let message = update.message.as_ref()?;
    let from = message.from.as_ref()?;
    let user = match &from.username {
        Some(handle) => UserRef::with_handle(from.id, handle.clone()),
        None => UserRef::new(from.id),
    };

    if let Some(text) = &message.text {
        // Strip the bot-mention suffix Telegram appends in groups.
        let command = text.trim().split('@').next().unwrap_or_default();
        if command == RESET_COMMAND {
            return Some(InboundEvent::reset(user));
        }
        return Some(InboundEvent::text(user, text.clone()));
    }

    if let Some(sizes) = &message.photo {
        let largest = sizes.iter().max_by_key(|s| s.width as u64 * s.height as u64)?;
        return Some(InboundEvent::photo(user, largest.file_id.clone()));
    }

    None
}

#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(token: &str) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().pool_max_idle_per_host(2).build()?,
            base_url: format!("https://api.telegram.org/bot{}", token),
        })
    }

    /// Long-polls for updates past `offset`. Blocks server-side for up to
    /// `timeout_secs`, so the reqwest timeout must exceed it.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let body = json!({ "offset": offset, "timeout": timeout_secs });
        let v = self.call("getUpdates", &body).await?;
        let updates: Vec<Update> =
            serde_json::from_value(v).context("unexpected getUpdates result shape")?;
        Ok(updates)
    }

    pub async fn send_reply(&self, reply: &Reply) -> Result<()> {
        let body = json!({
            "chat_id": reply.user_id,
            "text": reply.text,
            "reply_markup": keyboard_markup(reply.choices),
        });
        self.call("sendMessage", &body).await?;
        Ok(())
    }

    async fn call(&self, method: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, method);
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("telegram {} request failed", method))?;

        let status = resp.status();
        let v: Value = resp.json().await.context("invalid telegram response json")?;
        if !status.is_success() || v.get("ok").and_then(|x| x.as_bool()) != Some(true) {
            let description =
                v.get("description").and_then(|x| x.as_str()).unwrap_or("no description");
            return Err(anyhow!("telegram {} {}: {}", method, status, description));
        }
        v.get("result").cloned().ok_or_else(|| anyhow!("telegram {}: missing result", method))
    }
}

/// One-time resize keyboard for a fixed-choice step; keyboard removal when
/// free text is expected.
fn keyboard_markup(choices: Option<ChoiceSet>) -> Value {
    match choices {
        Some(set) => {
            let rows: Vec<Value> = set.rows().iter().map(|label| json!([{ "text": label }])).collect();
            json!({
                "keyboard": rows,
                "resize_keyboard": true,
                "one_time_keyboard": true,
            })
        }
        None => json!({ "remove_keyboard": true }),
    }
}
