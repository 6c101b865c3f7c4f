//! The manager bot: the owner's control surface.

use std::sync::Arc;

use syncara_core::{split_message, MAX_MESSAGE_LEN};
use syncara_models::UserId;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::commands::{Operator, OwnerCommand, OWNER_ONLY};
use crate::error::{Result, TelegramError};

pub struct ManagerBot {
    bot: Bot,
    operator: Arc<Operator>,
}

impl ManagerBot {
    pub fn new(token: &str, operator: Arc<Operator>) -> Self {
        Self {
            bot: Bot::new(token),
            operator,
        }
    }

    /// Polls until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        info!(username = ?me.user.username, "Manager bot is running");

        if let Err(e) = self.bot.set_my_commands(OwnerCommand::bot_commands()).await {
            warn!(error = %e, "Could not publish the command list");
        }

        let handler = Update::filter_message()
            .filter_command::<OwnerCommand>()
            .endpoint(handle_command);

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.operator])
            .default_handler(|_upd| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Manager bot stopped");
        Ok(())
    }
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: OwnerCommand,
    operator: Arc<Operator>,
) -> ResponseResult<()> {
    let owner = msg
        .from
        .as_ref()
        .map(|u| operator.is_owner(UserId(u.id.0 as i64)))
        .unwrap_or(false);

    if !owner {
        warn!(chat_id = %msg.chat.id, "Refused owner command from non-owner");
        bot.send_message(msg.chat.id, OWNER_ONLY).await?;
        return Ok(());
    }

    let reply = operator.execute(cmd).await;
    for chunk in split_message(&reply, MAX_MESSAGE_LEN) {
        bot.send_message(msg.chat.id, chunk).await?;
    }
    Ok(())
}
