use serenity::all::{CreateEmbed, CreateEmbedAuthor};

use crate::commands::music::utils::engine::Requester;
use crate::config::EmbedColors;

/// How a reply should be colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A platform-independent reply. Converted into an embed only at the edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Markdown body of the reply.
    pub description: String,
    pub thumbnail: Option<String>,
    pub severity: Severity,
    /// Shown as the embed author, usually the member who issued the command.
    pub author: Option<Requester>,
}

impl Reply {
    pub fn new(severity: Severity, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            thumbnail: None,
            severity,
            author: None,
        }
    }

    pub fn info(description: impl Into<String>) -> Self {
        Self::new(Severity::Info, description)
    }

    pub fn success(description: impl Into<String>) -> Self {
        Self::new(Severity::Success, description)
    }

    pub fn warning(description: impl Into<String>) -> Self {
        Self::new(Severity::Warning, description)
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new(Severity::Error, description)
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    pub fn with_author(mut self, author: &Requester) -> Self {
        self.author = Some(author.clone());
        self
    }

    /// Build the Discord embed for this reply using the configured palette.
    pub fn to_embed(&self, colors: &EmbedColors) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .description(&self.description)
            .color(colors.for_severity(self.severity));

        if let Some(thumbnail) = &self.thumbnail {
            embed = embed.thumbnail(thumbnail);
        }

        if let Some(author) = &self.author {
            let mut embed_author = CreateEmbedAuthor::new(&author.name);
            if let Some(avatar) = &author.avatar_url {
                embed_author = embed_author.icon_url(avatar);
            }
            embed = embed.author(embed_author);
        }

        embed
    }
}
