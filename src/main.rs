use std::error::Error;
use std::sync::Arc;

use quizauthorbot::config::Config;
use quizauthorbot::database::connection::Connection;
use quizauthorbot::login::LoginWidget;
use quizauthorbot::schema::schema;
use quizauthorbot::sessions::SessionStore;
use quizauthorbot::state::AuthorState;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::error_handlers::IgnoringErrorHandlerSafe;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::level_filters;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level_filters::LevelFilter::from_level(config.log_level))
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_ansi(true)
        .with_line_number(true)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    let connection =
        Arc::new(Connection::connect(std::borrow::Cow::Owned(config.database_url.clone())).await?);
    connection.run_migrations().await?;

    let store = Arc::new(SessionStore::new(config.session_ttl));
    let login = LoginWidget::new(Arc::clone(&store), config.login_theme);

    let bot = Bot::new(&config.bot_token);
    tracing::info!("Starting bot...");

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![
            InMemStorage::<AuthorState>::new(),
            store,
            login,
            connection
        ])
        .enable_ctrlc_handler()
        .build();

    match config.webhook {
        Some(webhook) => {
            tracing::info!("Listening for webhooks on {}", webhook.address);
            let listener = webhooks::axum(bot, Options::new(webhook.address, webhook.url)).await?;
            dispatcher
                .dispatch_with_listener(listener, Arc::new(IgnoringErrorHandlerSafe))
                .await
        }
        None => dispatcher.dispatch().await,
    }

    Ok(())
}
