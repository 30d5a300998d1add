use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;

use admission_bot::cli::{preview_card, Cli, Commands};
use admission_bot::intake::{self, IntakeState};
use admission_bot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramGateway};
use admission_core::logging::{init_logger, log_startup_configuration};
use admission_core::{AppResult, Metrics, ModerationWorkflow, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    match cli.command {
        Some(Commands::Preview { role, file }) => {
            let card = preview_card(role, &file)?;
            println!("{}", card);
            Ok(())
        }
        Some(Commands::Run) | None => Ok(run_bot().await?),
    }
}

async fn run_bot() -> AppResult<()> {
    let settings = Arc::new(Settings::from_env()?);

    // Initialize logger (console + file)
    init_logger(&settings.log_file_path)?;
    log::info!("Starting bot...");
    log_startup_configuration(&settings);

    let bot = create_bot(&settings)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let metrics = Metrics::new()?;
    let gateway = Arc::new(TelegramGateway::new(bot.clone()));
    let workflow = Arc::new(ModerationWorkflow::new(gateway, Arc::clone(&settings), metrics));

    // Intake server runs next to the dispatcher and stops after it
    let shutdown = CancellationToken::new();
    let listener = intake::bind(settings.http_addr).await?;
    let app = intake::router(IntakeState::new(Arc::clone(&workflow)));
    let server = tokio::spawn(intake::serve(listener, app, shutdown.clone()));

    log::info!("Starting dispatcher");
    Dispatcher::builder(bot, schema(HandlerDeps::new(workflow)))
        .enable_ctrlc_handler()
        .default_handler(|upd| async move {
            log::debug!("Unhandled update: {:?}", upd.kind);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully, stopping intake server");
    shutdown.cancel();

    match tokio::time::timeout(settings.shutdown_grace, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => log::error!("Intake server failed: {}", e),
        Ok(Err(e)) => log::error!("Intake server task failed: {}", e),
        Err(_) => log::warn!(
            "Intake server did not stop within {:?}, dropping open requests",
            settings.shutdown_grace
        ),
    }

    Ok(())
}
