//! /start and /help commands.

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use super::{reply, Command};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::utils::html_escape;

/// Handle the /start command.
pub async fn start_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let name = msg
        .from
        .as_ref()
        .map(|u| u.first_name.clone())
        .unwrap_or_else(|| "there".to_string());

    let text = format!(
        "<b>Hi, {}!</b> 👋\n\n\
         I keep track of your expenses and incomes in {}.\n\n\
         • <code>/add 120 Fuel</code> records an expense\n\
         • <code>/income 15000 salary</code> records an income\n\
         • <code>/month</code> shows where the money went\n\n\
         Use /help to see every command.",
        html_escape(&name),
        html_escape(&state.currency)
    );
    reply(&bot, &msg, text).await
}

/// Handle the /help command.
pub async fn help_command(bot: ThrottledBot, msg: Message) -> anyhow::Result<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
    Ok(())
}
