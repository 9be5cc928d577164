mod config;
mod outbound;

use std::env;
use std::time::Duration;

use anyhow::Result;
use generation::Generator;
use interview_core::dispatch::Dispatcher;
use interview_core::ports::LogSinkPort;
use interview_core::{AllowList, InterviewEngine};
use logsink::{HttpLogSink, NoopLogSink};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use outbound::TelegramOutbound;

const POLL_BACKOFF: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "briefbot=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let client = telegram::Client::new(&config.telegram_token)?;

    let generator = Generator::from_env(&config.model, &config.instructions_path);
    let log_sink: Box<dyn LogSinkPort> = match &config.log_webhook_url {
        Some(url) => {
            info!(url = %url, "event log sink enabled");
            Box::new(HttpLogSink::new(url.clone()))
        }
        None => {
            info!("LOG_WEBHOOK_URL not set, event log disabled");
            Box::new(NoopLogSink)
        }
    };
    let allow_list = if config.allowed_user_ids.is_empty() {
        warn!("ALLOWED_USER_IDS not set, running with open access");
        AllowList::open()
    } else {
        AllowList::from_ids(config.allowed_user_ids.iter().copied())
    };

    let engine = InterviewEngine::new(
        generator,
        log_sink,
        TelegramOutbound::new(client.clone()),
        allow_list,
    );
    let dispatcher = Dispatcher::new(engine);

    info!(model = %config.model, "briefbot started, polling for updates");
    run_poll_loop(&client, &dispatcher, config.poll_timeout_secs).await
}

async fn run_poll_loop(
    client: &telegram::Client,
    dispatcher: &Dispatcher<Generator, Box<dyn LogSinkPort>, TelegramOutbound>,
    poll_timeout_secs: u64,
) -> Result<()> {
    let mut offset = 0i64;
    loop {
        let updates = match client.get_updates(offset, poll_timeout_secs).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "getUpdates failed, backing off");
                tokio::time::sleep(POLL_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            if let Some(event) = telegram::decode_update(&update) {
                if let Err(e) = dispatcher.dispatch(event).await {
                    warn!(error = %e, "failed to dispatch event");
                }
            }
        }
    }
}
