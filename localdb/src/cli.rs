use std::{num::ParseIntError, time::Duration};

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use concat_with::concat_line;
use localdb_core::{LocalDbOptions, DATA_PATH, LOCALDB_EXECUTABLE};
use terminal_size::terminal_size;

const APP_NAME: &str = "LocalDB";
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

const APP_ABOUT: &str = concat!(
    "\nExamples:\n",
    concat_line!(prefix "localdb ",
        "try-delete-instance UnitTests            # Remove whatever is left of the `UnitTests` instance",
        "create-database Database1 UnitTests      # Create `Database1` in `UnitTests` and print its connection string",
        "--timeout 60 delete-instance UnitTests   # Stop and delete `UnitTests`, giving up on sqllocaldb.exe after 60 seconds",
    )
);

#[derive(Debug, Parser)]
#[command(name = APP_NAME)]
#[command(term_width = terminal_size().map(|(width, _)| width.0 as usize).unwrap_or(0))]
#[command(version = CARGO_PKG_VERSION)]
pub struct CLIArgs {
    #[arg(long, global = true, env = "LOCALDB_EXECUTABLE")]
    #[arg(default_value = LOCALDB_EXECUTABLE)]
    #[arg(help = "Assign the instance manager to invoke")]
    pub executable: String,

    #[arg(long, global = true, env = "LOCALDB_DATA_PATH")]
    #[arg(default_value = DATA_PATH)]
    #[arg(help = "Assign the base directory of instance data directories")]
    #[arg(long_help = "Assign the base directory of instance data directories. `%NAME%` \
                       sequences are replaced with the values of environment variables")]
    pub data_path: String,

    #[arg(long, global = true, env = "LOCALDB_NO_SHELL")]
    #[arg(help = "Run the instance manager directly instead of through cmd.exe")]
    pub no_shell: bool,

    #[arg(long, global = true, env = "LOCALDB_TIMEOUT")]
    #[arg(value_parser = parse_duration_sec)]
    #[arg(help = "Assign the longest time (in seconds) to wait for the instance manager")]
    pub timeout: Option<Duration>,

    #[arg(long, global = true, env = "LOCALDB_CONNECT_TIMEOUT")]
    #[arg(default_value = "30")]
    #[arg(value_parser = parse_duration_sec)]
    #[arg(help = "Assign the longest time (in seconds) to wait for an administrative connection")]
    pub connect_timeout: Duration,

    #[arg(short, long, global = true)]
    #[arg(help = "Log every command line and its output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CLICommand,
}

#[derive(Debug, Subcommand)]
pub enum CLICommand {
    #[command(about = "Create and start an instance")]
    CreateInstance { instance: String },
    #[command(about = "Start an instance")]
    StartInstance { instance: String },
    #[command(about = "Stop an instance, killing its active connections")]
    StopInstance { instance: String },
    #[command(about = "Stop and delete an instance, then delete its residual files")]
    DeleteInstance { instance: String },
    #[command(about = "Delete an instance if possible and print whether it was deleted")]
    TryDeleteInstance { instance: String },
    #[command(about = "Print what the instance manager knows about an instance")]
    Info {
        instance: String,
        #[arg(long, help = "Print as JSON")]
        json:     bool,
    },
    #[command(about = "Create a database, replacing an existing one, and print its connection \
                       string")]
    CreateDatabase { database: String, instance: String },
    #[command(about = "Drop a database, rolling back the transactions of open connections")]
    DeleteDatabase { database: String, instance: String },
}

impl CLIArgs {
    pub fn to_options(&self) -> LocalDbOptions {
        LocalDbOptions {
            executable: self.executable.clone(),
            data_path: self.data_path.clone(),
            use_shell: !self.no_shell,
            process_timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            ..LocalDbOptions::default()
        }
    }
}

#[inline]
fn parse_duration_sec(arg: &str) -> Result<Duration, ParseIntError> {
    Ok(Duration::from_secs(arg.parse()?))
}

pub fn get_args() -> CLIArgs {
    let args = CLIArgs::command();

    let about = format!("{APP_NAME} {CARGO_PKG_VERSION}\n{APP_ABOUT}");

    let args = args.about(about);

    let matches = args.get_matches();

    match CLIArgs::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => {
            err.exit();
        },
    }
}
