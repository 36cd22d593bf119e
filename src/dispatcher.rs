//! Routes one inbound command to its handler and reports the result.
//!
//! Every invocation known to the registry is deferred first, then checked against its
//! declared arguments and guards, run, timed and answered. A failing or panicking handler
//! is reported to the caller with a generic message and never takes the process down.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use serenity::async_trait;
use thiserror::Error;
use thousands::Separable;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::commands::music::utils::embedded_messages::bug_report_footer;
use crate::commands::{guards, CommandRegistry, Context, GuildInfo, InvocationContext};
use crate::utils::embeds::Reply;
use crate::Data;

/// An inbound command invocation.
#[derive(Debug, Clone)]
pub struct CommandEvent {
    pub name: String,
    pub context: InvocationContext,
}

#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("Discord rejected the response: {0}")]
    Discord(#[from] serenity::Error),
}

/// Where replies for one invocation go.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResponseChannel: Send + Sync {
    /// Acknowledge the invocation so the reply can arrive later.
    async fn defer(&self) -> Result<(), ReplyError>;

    async fn reply(&self, reply: Reply) -> Result<(), ReplyError>;
}

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No such command.
    Ignored,
    DeferFailed,
    /// An argument or guard check failed.
    Refused,
    Completed,
    Failed,
}

/// How an execution time is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    Normal,
    /// Slow, but the command is known to wait on its user.
    Patient,
    Slow,
}

pub fn classify(elapsed: Duration, threshold: Duration, patient_after: Option<Duration>) -> Timing {
    if elapsed < threshold {
        Timing::Normal
    } else if patient_after.is_some_and(|patient| elapsed >= patient) {
        Timing::Patient
    } else {
        Timing::Slow
    }
}

fn slow_command(elapsed: Duration) -> Reply {
    Reply::warning(format!(
        "**Warning**\n**This command took {:.2} seconds to execute.**\n\n_If you experienced problems with the command, please try again._",
        elapsed.as_secs_f64()
    ))
}

fn unexpected_error(support_server: Option<&str>) -> Reply {
    Reply::error(format!(
        "**Unexpected Error**\nThere was an error while executing this command! Please try again.{}",
        bug_report_footer(support_server)
    ))
}

/// `Guild name (#1,234)>`
fn log_prefix(guild: &GuildInfo) -> String {
    format!(
        "{} (#{})>",
        guild.name,
        guild.member_count.separate_with_commas()
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

pub struct Dispatcher {
    registry: CommandRegistry,
    data: Arc<Data>,
}

impl Dispatcher {
    pub fn new(registry: CommandRegistry, data: Arc<Data>) -> Self {
        Self { registry, data }
    }

    pub fn data(&self) -> &Arc<Data> {
        &self.data
    }

    pub async fn dispatch(&self, event: CommandEvent, channel: &dyn ResponseChannel) -> Outcome {
        let prefix = log_prefix(&event.context.guild);

        let Some(descriptor) = self.registry.lookup(&event.name) else {
            debug!("{} Ignoring unknown command /{}", prefix, event.name);
            return Outcome::Ignored;
        };

        // acknowledging the interaction counts towards the execution time
        let started = Instant::now();
        if let Err(err) = channel.defer().await {
            error!("{} Failed to defer /{}: {:#?}", prefix, event.name, err);
            return Outcome::DeferFailed;
        }

        let invocation = &event.context;
        debug!(
            "{} /{} invoked by {} at {}",
            prefix,
            descriptor.name,
            invocation.caller.name,
            Utc::now().to_rfc3339()
        );

        let refusal = match descriptor.validate_arguments(invocation) {
            Err(failure) => Some(failure),
            Ok(()) => guards::evaluate(&descriptor.guards, invocation, &self.data.sessions)
                .await
                .err(),
        };
        if let Some(failure) = refusal {
            info!("{} /{} refused: {:?}", prefix, descriptor.name, failure);
            self.send(channel, failure.reply(), &prefix).await;
            return Outcome::Refused;
        }

        let ctx = Context {
            invocation,
            data: &self.data,
            registry: &self.registry,
        };
        let result = AssertUnwindSafe(descriptor.handler.handle(ctx))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed();
        let support_server = self.data.config.support_server_url.as_deref();

        match result {
            Ok(Ok(reply)) => {
                self.send(channel, reply, &prefix).await;
                self.report_timing(
                    channel,
                    descriptor.name,
                    descriptor.patient_after,
                    elapsed,
                    &prefix,
                )
                .await;
                Outcome::Completed
            }
            Ok(Err(err)) => {
                error!(
                    "{} Error while executing /{} after {:?}: {:#?}",
                    prefix, descriptor.name, elapsed, err
                );
                self.send(channel, unexpected_error(support_server), &prefix).await;
                Outcome::Failed
            }
            Err(panic) => {
                error!(
                    "{} Handler for /{} panicked after {:?}: {}",
                    prefix,
                    descriptor.name,
                    elapsed,
                    panic_message(panic.as_ref())
                );
                self.send(channel, unexpected_error(support_server), &prefix).await;
                Outcome::Failed
            }
        }
    }

    async fn report_timing(
        &self,
        channel: &dyn ResponseChannel,
        name: &str,
        patient_after: Option<Duration>,
        elapsed: Duration,
        prefix: &str,
    ) {
        let threshold = self.data.config.dispatch.slow_command_threshold;

        match classify(elapsed, threshold, patient_after) {
            Timing::Normal | Timing::Patient => {
                info!("{} /{} completed in {:?}", prefix, name, elapsed);
            }
            Timing::Slow => {
                warn!(
                    "{} /{} took {:?} to execute, above the {:?} threshold",
                    prefix, name, elapsed, threshold
                );
                self.send(channel, slow_command(elapsed), prefix).await;
            }
        }
    }

    async fn send(&self, channel: &dyn ResponseChannel, reply: Reply, prefix: &str) {
        if let Err(err) = channel.reply(reply).await {
            error!("{} Failed to send reply: {:#?}", prefix, err);
        }
    }
}
