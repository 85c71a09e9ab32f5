mod cli;

use cli::*;
use localdb_core::{LocalDb, ProcessRunner, TiberiusExecutor};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = get_args();

    let log_level = if args.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = args.to_options();

    let cancellation_token = CancellationToken::new();

    {
        let cancellation_token = cancellation_token.clone();

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling the running sqllocaldb invocation");

                cancellation_token.cancel();
            }
        });
    }

    let runner = ProcessRunner::new(options.use_shell, options.process_timeout)
        .with_cancellation_token(cancellation_token);
    let executor = TiberiusExecutor::new(options.connect_timeout);

    let localdb = LocalDb::with_collaborators(options, runner, executor);

    match args.command {
        CLICommand::CreateInstance {
            instance,
        } => localdb.create_instance(&instance).await?,
        CLICommand::StartInstance {
            instance,
        } => localdb.start_instance(&instance).await?,
        CLICommand::StopInstance {
            instance,
        } => localdb.stop_instance(&instance).await?,
        CLICommand::DeleteInstance {
            instance,
        } => localdb.delete_instance(&instance).await?,
        CLICommand::TryDeleteInstance {
            instance,
        } => println!("{}", localdb.try_delete_instance(&instance).await?),
        CLICommand::Info {
            instance,
            json,
        } => {
            let info = localdb.instance_info(&instance).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{info:#?}");
            }
        },
        CLICommand::CreateDatabase {
            database,
            instance,
        } => println!("{}", localdb.create_database(&database, &instance).await?),
        CLICommand::DeleteDatabase {
            database,
            instance,
        } => localdb.delete_database(&database, &instance).await?,
    }

    Ok(())
}
