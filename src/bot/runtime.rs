//! Bot runtime - long polling runner.

use tracing::info;

use super::dispatcher::ThrottledBot;

/// Dispatch updates until Ctrl-C.
pub async fn run(mut dispatcher: teloxide::dispatching::Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey>) {
    info!("Starting bot in polling mode...");
    dispatcher.dispatch().await;
    info!("Dispatcher stopped");
}
