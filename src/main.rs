use std::env;

use cadence::config::{BotConfig, ConfigError};
use cadence::Error;
use dotenv::dotenv;
use serenity::all::GatewayIntents;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cadence=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = BotConfig::from_env()?;
    let token = env::var("DISCORD_TOKEN").map_err(|_| ConfigError::MissingToken)?;

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    info!("Starting Cadence");
    run(token, intents, config).await
}

#[cfg(feature = "music")]
async fn run(token: String, intents: GatewayIntents, config: BotConfig) -> Result<(), Error> {
    use std::sync::Arc;

    use cadence::commands::music::utils::{
        engine::EventBus, event_handlers::spawn_event_listener, songbird_engine::SongbirdEngine,
    };
    use cadence::commands::{system_commands, user_commands, CommandRegistry};
    use cadence::dispatcher::Dispatcher;
    use cadence::events::Handler;
    use cadence::Data;
    use serenity::Client;
    use songbird::{SerenityInit, Songbird};

    let registry = CommandRegistry::from_sources(user_commands(&config), system_commands())?;
    info!("Registered {} commands", registry.len());

    let manager = Songbird::serenity();
    let bus = EventBus::default();
    let engine = Arc::new(SongbirdEngine::new(Arc::clone(&manager), bus.clone()));

    let data = Arc::new(Data::new(config, engine));
    spawn_event_listener(&bus, Arc::clone(&data.sessions));

    let dispatcher = Arc::new(Dispatcher::new(registry, data));

    let mut client = Client::builder(token, intents)
        .event_handler(Handler::new(dispatcher))
        .register_songbird_with(manager)
        .await?;

    client.start().await.map_err(Into::into)
}

#[cfg(not(feature = "music"))]
async fn run(_token: String, _intents: GatewayIntents, _config: BotConfig) -> Result<(), Error> {
    Err("Cadence needs the `music` feature to play audio".into())
}
