//! This module aggregates all the command modules for the bot, and the registry that maps
//! command names to their descriptors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serenity::all::{ChannelId, GuildId};
use serenity::async_trait;
use thiserror::Error;

use crate::config::BotConfig;
use crate::{CommandResult, Data};
use music::utils::engine::Requester;

/// General purpose commands (e.g., help).
pub mod general;
/// Preconditions checked before a handler runs.
pub mod guards;
/// Commands related to music playback.
pub mod music;
/// Operator commands.
pub mod system;

use guards::{Guard, GuardFailure};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Command `{0}` is registered more than once")]
    DuplicateCommand(String),
}

/// Kind of value an option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    String,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ArgumentKind,
    pub required: bool,
}

impl ArgumentSpec {
    pub fn required(name: &'static str, description: &'static str, kind: ArgumentKind) -> Self {
        Self {
            name,
            description,
            kind,
            required: true,
        }
    }
}

/// A resolved option value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

/// The guild a command was issued in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    pub id: GuildId,
    pub name: String,
    pub member_count: u64,
}

/// Everything known about one command invocation.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub caller: Requester,
    pub guild: GuildInfo,
    /// The voice channel the caller is connected to, if any.
    pub voice_channel: Option<ChannelId>,
    pub is_administrator: bool,
    pub arguments: HashMap<String, ArgumentValue>,
}

impl InvocationContext {
    pub fn string_argument(&self, name: &str) -> Option<&str> {
        match self.arguments.get(name) {
            Some(ArgumentValue::String(value)) => Some(value),
            _ => None,
        }
    }
}

/// What a handler gets to work with
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub invocation: &'a InvocationContext,
    pub data: &'a Data,
    pub registry: &'a CommandRegistry,
}

/// Implemented by every command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: Context<'_>) -> CommandResult;
}

/// A command as the registry knows it
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: Vec<ArgumentSpec>,
    /// Checked in order before the handler; the first failure wins.
    pub guards: Vec<Guard>,
    pub hide_in_help: bool,
    /// Once the command has run this long, it is considered to be waiting on the user
    /// rather than slow.
    pub patient_after: Option<Duration>,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDescriptor {
    pub fn new(
        name: &'static str,
        description: &'static str,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self {
            name,
            description,
            arguments: Vec::new(),
            guards: Vec::new(),
            hide_in_help: false,
            patient_after: None,
            handler: Arc::new(handler),
        }
    }

    pub fn argument(mut self, argument: ArgumentSpec) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hide_in_help = true;
        self
    }

    pub fn patient_after(mut self, duration: Option<Duration>) -> Self {
        self.patient_after = duration;
        self
    }

    /// Check that every required option is present with the declared kind.
    pub fn validate_arguments(&self, invocation: &InvocationContext) -> Result<(), GuardFailure> {
        for spec in self.arguments.iter().filter(|spec| spec.required) {
            let matches_kind = match (spec.kind, invocation.arguments.get(spec.name)) {
                (ArgumentKind::String, Some(ArgumentValue::String(value))) => !value.is_empty(),
                (ArgumentKind::Integer, Some(ArgumentValue::Integer(_))) => true,
                (ArgumentKind::Boolean, Some(ArgumentValue::Boolean(_))) => true,
                _ => false,
            };

            if !matches_kind {
                return Err(GuardFailure::MissingArgument(spec.name.to_string()));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("guards", &self.guards)
            .field("patient_after", &self.patient_after)
            .finish_non_exhaustive()
    }
}

/// Registry of command descriptors, keyed by command name.
#[derive(Default, Debug)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge user-facing and operator commands into one namespace.
    pub fn from_sources(
        user: Vec<CommandDescriptor>,
        system: Vec<CommandDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in user.into_iter().chain(system) {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        if self.commands.contains_key(descriptor.name) {
            return Err(RegistryError::DuplicateCommand(descriptor.name.to_string()));
        }
        self.commands.insert(descriptor.name, descriptor);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    /// All descriptors, sorted by name.
    pub fn descriptors(&self) -> Vec<&CommandDescriptor> {
        let mut descriptors: Vec<_> = self.commands.values().collect();
        descriptors.sort_by_key(|descriptor| descriptor.name);
        descriptors
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Commands available to every member.
pub fn user_commands(config: &BotConfig) -> Vec<CommandDescriptor> {
    let patient = |name: &str| config.dispatch.patient_after(name);

    vec![
        general::help::descriptor(),
        music::play::descriptor(),
        music::leave::descriptor(),
    ]
    .into_iter()
    .map(|descriptor| {
        let patient_after = patient(descriptor.name);
        descriptor.patient_after(patient_after)
    })
    .collect()
}

/// Commands for operators of the bot.
pub fn system_commands() -> Vec<CommandDescriptor> {
    vec![system::status::descriptor()]
}
