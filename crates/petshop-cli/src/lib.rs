mod cli;
mod config;

use petshop::{
    AppConfig, AppError, Locale, LikeRequest, NotificationService, PetService, StoreOptions,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let inv = cli::parse_args(&args)?;
    if let cli::Command::Help(topic) = inv.command {
        cli::print_help(topic);
        return Ok(());
    }

    let cfg = config::load(inv.config.as_deref())?;
    init_tracing(&cfg);

    let pool = petshop::create_pool(&cfg.database)?;
    petshop::ping(&pool).await?;
    tracing::info!(
        dsn = %cfg.database.redacted_dsn(),
        env = %cfg.env,
        consistency = %cfg.like_consistency,
        "connected"
    );

    let options = StoreOptions {
        timeout: cfg.database.statement_timeout(),
        ..StoreOptions::default()
    };
    let pets = PetService::new(pool.clone(), options.clone(), cfg.like_consistency);
    let notifications = NotificationService::new(pool, options);

    let result = match inv.command {
        cli::Command::Help(_) => return Ok(()),
        cli::Command::Pets(filter) => print_json(pets.list_pets(Some(&filter)).await),
        cli::Command::Like(args) => {
            let req = LikeRequest {
                pet_id: args.pet,
                user_id: args.user,
                value: !args.unlike,
            };
            print_json(pets.toggle_like(&req).await)
        }
        cli::Command::Reserve(input) => print_json(
            pets
                .create_reservation(&input)
                .await
                .map(|()| serde_json::json!({ "reserved": true })),
        ),
        cli::Command::Notifications(cmd) => match cmd {
            cli::NotificationsCommand::List { id } => {
                print_json(notifications.list(id.as_deref()).await)
            }
            cli::NotificationsCommand::Unread => print_json(
                notifications
                    .unread_count()
                    .await
                    .map(|count| serde_json::json!({ "count": count })),
            ),
            cli::NotificationsCommand::MarkRead => print_json(
                notifications
                    .mark_read()
                    .await
                    .map(|updated| serde_json::json!({ "updated": updated })),
            ),
        },
    };

    match result? {
        None => Ok(()),
        Some(err) => report(&err, inv.locale),
    }
}

fn init_tracing(cfg: &AppConfig) {
    let default = if cfg.enable_tracing {
        "info,petshop=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Print a successful result; hand an [`AppError`] back for reporting.
fn print_json<T: Serialize>(result: Result<T, AppError>) -> anyhow::Result<Option<AppError>> {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(None)
        }
        Err(err) => Ok(Some(err)),
    }
}

/// Print the caller-facing body; only informational codes exit cleanly.
fn report(err: &AppError, locale: Locale) -> anyhow::Result<()> {
    let (status, body) = err.response(locale);
    println!("{}", serde_json::to_string_pretty(&body)?);
    if err.code.is_informational() {
        return Ok(());
    }
    anyhow::bail!("request failed with status {status} ({})", body.code)
}
