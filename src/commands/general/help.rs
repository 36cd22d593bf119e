use serenity::async_trait;

use crate::commands::{CommandDescriptor, CommandHandler, Context};
use crate::utils::embeds::Reply;
use crate::CommandResult;

/// Show the list of available commands
pub struct Help;

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor::new("help", "Show the list of available commands.", Help)
}

#[async_trait]
impl CommandHandler for Help {
    async fn handle(&self, ctx: Context<'_>) -> CommandResult {
        let lines: Vec<String> = ctx
            .registry
            .descriptors()
            .into_iter()
            .filter(|descriptor| !descriptor.hide_in_help)
            .map(|descriptor| {
                let arguments: String = descriptor
                    .arguments
                    .iter()
                    .map(|argument| format!(" `{}`", argument.name))
                    .collect();
                format!("- **/{}**{}\n{}", descriptor.name, arguments, descriptor.description)
            })
            .collect();

        Ok(Reply::info(format!("**List of commands**\n{}", lines.join("\n")))
            .with_thumbnail(Some(ctx.data.config.default_thumbnail.clone())))
    }
}
