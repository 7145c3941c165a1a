//! TaskBuddy Telegram Bot
//!
//! Main application entry point

use std::sync::Arc;
use teloxide::{prelude::*, types::{CallbackQuery, Update}};
use teloxide::dispatching::UpdateHandler;
use tracing::{info, warn, error};

use TaskBuddy::{
    config::Settings,
    utils::logging,
    database::{DatabaseService, create_pool, run_migrations},
    services::ServiceFactory,
    state::ContextStore,
    handlers::{
        HandlerContext,
        Command,
        handle_command,
        handle_message,
        handle_callback_query,
        callbacks::callback_chat_id,
    },
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", TaskBuddy::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&settings.database).await?;

    // Run database migrations
    info!("Running database migrations...");
    run_migrations(&db_pool).await?;

    let database_service = DatabaseService::new(db_pool);
    match database_service.get_system_stats().await {
        Ok(stats) => info!(stats = %stats, "Database ready"),
        Err(e) => warn!(error = %e, "Failed to collect database statistics"),
    }

    // Load conversation states; the bot cannot run without them
    info!("Loading conversation states...");
    let store = ContextStore::open(Arc::new(database_service.states.clone()))
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to initialize the context store");
            e
        })?;
    info!(states = store.len(), "Context store initialized");

    // Initialize bot
    let bot = Bot::new(&settings.bot.token);

    // Initialize services
    info!("Initializing services...");
    let services = Arc::new(ServiceFactory::new(settings.clone(), database_service)?);

    let mut reminders = services.reminder_scheduler(bot.clone());
    reminders.start();

    // Create the handler
    let handler = create_handler();

    // Create dispatcher with dependencies registered
    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![services, store])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd);
        })
        .enable_ctrlc_handler()
        .build();

    info!("TaskBuddy bot is ready, starting polling...");
    dispatcher.dispatch().await;

    reminders.stop();
    info!("TaskBuddy bot has been shut down.");

    Ok(())
}

/// Create the main update handler
fn create_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use teloxide::dispatching::UpdateFilterExt;

    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    // Handle commands
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_commands),
                )
                .branch(
                    // Handle regular messages
                    dptree::endpoint(handle_messages),
                ),
        )
        .branch(
            // Handle callback queries
            Update::filter_callback_query().endpoint(handle_callbacks),
        )
}

fn message_context(bot: Bot, msg: &Message, services: Arc<ServiceFactory>, store: ContextStore) -> Option<HandlerContext> {
    let user = msg.from.as_ref()?;
    Some(HandlerContext::new(bot, services, store, user.id.0 as i64, msg.chat.id))
}

/// Handle bot commands
async fn handle_commands(
    bot: Bot,
    msg: Message,
    cmd: Command,
    services: Arc<ServiceFactory>,
    store: ContextStore,
) -> HandlerResult {
    let Some(ctx) = message_context(bot, &msg, services, store) else {
        return Ok(());
    };

    if let Err(e) = handle_command(ctx, cmd).await {
        error!(error = %e, "Error handling command");
        return Err(e.into());
    }

    Ok(())
}

/// Handle regular messages
async fn handle_messages(
    bot: Bot,
    msg: Message,
    services: Arc<ServiceFactory>,
    store: ContextStore,
) -> HandlerResult {
    let Some(ctx) = message_context(bot, &msg, services, store) else {
        return Ok(());
    };

    if let Err(e) = handle_message(ctx, msg).await {
        error!(error = %e, "Error handling message");
        return Err(e.into());
    }

    Ok(())
}

/// Handle callback queries
async fn handle_callbacks(
    bot: Bot,
    query: CallbackQuery,
    services: Arc<ServiceFactory>,
    store: ContextStore,
) -> HandlerResult {
    let user_id = query.from.id.0 as i64;
    let ctx = HandlerContext::new(bot, services, store, user_id, callback_chat_id(&query));

    if let Err(e) = handle_callback_query(ctx, query).await {
        error!(user_id = user_id, error = %e, "Error handling callback query");
        return Err(e.into());
    }

    Ok(())
}
