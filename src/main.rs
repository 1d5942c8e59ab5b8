use std::sync::Arc;

use chat_app::config::{Settings, load_env_file};
use chat_app::telemetry::{self, GENERAL_TARGET};
use chat_app::user::UserBuilder;
use chat_app::{app, initialize_state};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Start the HTTP server (default).
    Serve,
    /// Create an administrator account.
    CreateSuperuser {
        #[clap(long)]
        email: String,
        #[clap(long)]
        username: String,
        /// Without a password, the account cannot log in until one is set.
        #[clap(long, env = "SUPERUSER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // `.env` must be loaded before settings are read.
    let env_file = load_env_file();
    let args = Args::parse();

    let settings = Arc::new(Settings::from_env()?);
    telemetry::setup_logging(&settings)?;

    match env_file {
        Ok(path) => tracing::info!(target: GENERAL_TARGET, path = %path.display(), "environment file loaded"),
        Err(err) => tracing::warn!(target: GENERAL_TARGET, %err, "no environment file loaded"),
    }
    tracing::debug!(target: GENERAL_TARGET, ?settings, "settings loaded");

    let state = initialize_state(Arc::clone(&settings)).await?;

    match args.cmd.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let addr = format!("0.0.0.0:{}", settings.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(target: GENERAL_TARGET, address = %addr, "server listening");

            axum::serve(listener, app(state))
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        },
        Commands::CreateSuperuser {
            email,
            username,
            password,
        } => {
            let new_user = UserBuilder::new()
                .email(email)
                .username(username)
                .password(password)
                .build();

            if let Err(errors) = new_user.validate_password() {
                for (field, issues) in errors.field_errors() {
                    for issue in issues {
                        tracing::error!(target: GENERAL_TARGET, %field, "{issue}");
                    }
                }
                return Err(errors.into());
            }

            let user = state.users.create_superuser(new_user).await?;

            tracing::info!(target: GENERAL_TARGET, email = user.get_username(), "superuser created");
        },
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(target: GENERAL_TARGET, "shutting down");
}
