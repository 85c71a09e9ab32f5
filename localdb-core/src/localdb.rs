use std::{
    fmt::{self, Debug, Formatter},
    path::PathBuf,
};

use tokio::fs;

use crate::{
    functions::{allow_not_found_error, validate_database_name},
    AdminStatement, CommandOutput, CommandRunner, InstanceInfo, LocalDbError, LocalDbOptions,
    ProcessRunner, SqlEndpoint, SqlExecutor, TiberiusExecutor,
};

const CONNECTION_STRING_PREFIX: &str = r"Data Source=(localdb)\";
const CONNECTION_STRING_OPTIONS: &str = "Integrated Security=True;Connect Timeout=30;\
                                         Encrypt=False;TrustServerCertificate=False;\
                                         ApplicationIntent=ReadWrite;MultiSubnetFailover=False";

/// Build the connection string of an instance.
///
/// ```
/// assert_eq!(
///     r"Data Source=(localdb)\UnitTests;Integrated Security=True;Connect Timeout=30;Encrypt=False;TrustServerCertificate=False;ApplicationIntent=ReadWrite;MultiSubnetFailover=False",
///     localdb_core::connection_string("UnitTests")
/// );
/// ```
#[inline]
pub fn connection_string(instance_name: impl AsRef<str>) -> String {
    format!("{CONNECTION_STRING_PREFIX}{};{CONNECTION_STRING_OPTIONS}", instance_name.as_ref())
}

/// Build the connection string of a database inside an instance.
#[inline]
pub fn database_connection_string(
    instance_name: impl AsRef<str>,
    database_name: impl AsRef<str>,
) -> String {
    format!("{};Initial Catalog={}", connection_string(instance_name), database_name.as_ref())
}

/// Creates, starts, stops and deletes LocalDB instances and the databases inside them.
///
/// Holds no state besides its options. Every operation derives what it needs from its arguments.
pub struct LocalDb<R = ProcessRunner, E = TiberiusExecutor> {
    options:  LocalDbOptions,
    runner:   R,
    executor: E,
}

impl<R, E> Debug for LocalDb<R, E> {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalDb").field("options", &self.options).finish_non_exhaustive()
    }
}

impl LocalDb {
    /// Create a manager with the default options.
    #[inline]
    pub fn new() -> Self {
        Self::with_options(LocalDbOptions::default())
    }

    /// Create a manager which runs the instance manager as a child process and connects with `tiberius`.
    #[inline]
    pub fn with_options(options: LocalDbOptions) -> Self {
        let runner = ProcessRunner::new(options.use_shell, options.process_timeout);
        let executor = TiberiusExecutor::new(options.connect_timeout);

        Self::with_collaborators(options, runner, executor)
    }
}

impl Default for LocalDb {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<R, E> LocalDb<R, E> {
    /// Create a manager with custom process and SQL execution.
    #[inline]
    pub const fn with_collaborators(options: LocalDbOptions, runner: R, executor: E) -> Self {
        Self {
            options,
            runner,
            executor,
        }
    }

    #[inline]
    pub const fn options(&self) -> &LocalDbOptions {
        &self.options
    }

    #[inline]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    #[inline]
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Retrieve the directory holding the data and log files of an instance.
    #[inline]
    pub fn instance_data_directory(&self, instance_name: impl AsRef<str>) -> PathBuf {
        self.options.expanded_data_path().join(instance_name.as_ref())
    }

    #[inline]
    fn check_platform(&self) -> Result<(), LocalDbError> {
        if self.options.is_platform_supported() {
            Ok(())
        } else {
            Err(LocalDbError::PlatformNotSupported)
        }
    }
}

impl<R: CommandRunner, E: SqlExecutor> LocalDb<R, E> {
    #[inline]
    async fn exec(
        &self,
        subcommand: &'static str,
        args: &[&str],
    ) -> Result<CommandOutput, LocalDbError> {
        self.runner.run(&self.options.executable, subcommand, args).await
    }

    async fn exec_checked(
        &self,
        subcommand: &'static str,
        args: &[&str],
    ) -> Result<CommandOutput, LocalDbError> {
        let output = self.exec(subcommand, args).await?;

        if !output.success() {
            return Err(LocalDbError::CommandFailed {
                subcommand,
                exit_code: output.exit_code,
            });
        }

        Ok(output)
    }

    async fn admin_endpoint(&self, instance_name: &str) -> Result<SqlEndpoint, LocalDbError> {
        self.start_instance(instance_name).await?;

        let info = self.instance_info(instance_name).await?;

        Ok(SqlEndpoint::new(connection_string(instance_name), info.pipe_path().map(String::from)))
    }
}

// Instances
impl<R: CommandRunner, E: SqlExecutor> LocalDb<R, E> {
    /// Create and start an instance, and make sure its data directory exists.
    ///
    /// Creating an instance which already exists is not an error.
    pub async fn create_instance(&self, instance_name: &str) -> Result<(), LocalDbError> {
        self.check_platform()?;

        let output = self.exec("create", &[instance_name, "-s"]).await?;

        if !output.success() {
            tracing::warn!(
                "sqllocaldb create {instance_name} result code {}, checking whether the instance \
                 already exists",
                output.exit_code
            );

            if !self.exec("info", &[instance_name]).await?.success() {
                return Err(LocalDbError::CommandFailed {
                    subcommand: "create",
                    exit_code:  output.exit_code,
                });
            }
        }

        let data_directory = self.instance_data_directory(instance_name);

        fs::create_dir_all(data_directory.as_path()).await?;

        tracing::info!("instance {instance_name} is ready, data directory {data_directory:?}");

        Ok(())
    }

    /// Start an instance. Starting a running instance is not an error.
    pub async fn start_instance(&self, instance_name: &str) -> Result<(), LocalDbError> {
        self.check_platform()?;

        self.exec_checked("start", &[instance_name]).await?;

        Ok(())
    }

    /// Stop an instance, killing its active connections.
    pub async fn stop_instance(&self, instance_name: &str) -> Result<(), LocalDbError> {
        self.check_platform()?;

        self.exec_checked("stop", &[instance_name, "-k"]).await?;

        tracing::info!("instance {instance_name} has been stopped");

        Ok(())
    }

    /// Stop and delete an instance, then delete every file left in its data directory.
    ///
    /// The data directory itself is kept.
    pub async fn delete_instance(&self, instance_name: &str) -> Result<(), LocalDbError> {
        self.check_platform()?;

        self.stop_instance(instance_name).await?;

        self.exec_checked("delete", &[instance_name]).await?;

        let data_directory = self.instance_data_directory(instance_name);

        let mut read_dir = fs::read_dir(data_directory.as_path()).await?;

        let mut count = 0usize;

        while let Some(entry) = read_dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                allow_not_found_error(fs::remove_file(entry.path()).await)?;

                count += 1;
            }
        }

        match count {
            0 => tracing::info!("instance {instance_name} has been deleted"),
            1 => tracing::info!("instance {instance_name} and one residual file have been deleted"),
            _ => tracing::info!(
                "instance {instance_name} and {count} residual files have been deleted"
            ),
        }

        Ok(())
    }

    /// Delete an instance if possible. Returns `false` instead of failing when anything goes wrong.
    ///
    /// Only an unsupported platform is reported as an error.
    pub async fn try_delete_instance(&self, instance_name: &str) -> Result<bool, LocalDbError> {
        self.check_platform()?;

        match self.delete_instance(instance_name).await {
            Ok(()) => Ok(true),
            Err(error) => {
                tracing::debug!("instance {instance_name} has not been deleted: {error}");

                Ok(false)
            },
        }
    }

    /// Retrieve what the instance manager knows about an instance.
    pub async fn instance_info(&self, instance_name: &str) -> Result<InstanceInfo, LocalDbError> {
        self.check_platform()?;

        let output = self.exec_checked("info", &[instance_name]).await?;

        Ok(InstanceInfo::parse(&output.stdout))
    }
}

// Databases
impl<R: CommandRunner, E: SqlExecutor> LocalDb<R, E> {
    /// Create a database in an instance, replacing any database with the same name, and return its connection string.
    ///
    /// The instance is created if needed. The data file `<database_name>_data.mdf` and the log file `<database_name>_log.ldf` are placed in the data directory of the instance.
    pub async fn create_database(
        &self,
        database_name: &str,
        instance_name: &str,
    ) -> Result<String, LocalDbError> {
        self.check_platform()?;

        validate_database_name(database_name)?;

        self.create_instance(instance_name).await?;

        let endpoint = self.admin_endpoint(instance_name).await?;

        let statement = AdminStatement::create_database(
            database_name,
            self.instance_data_directory(instance_name),
        );

        self.executor.execute(&endpoint, &statement).await?;

        tracing::info!("database {database_name} has been created in instance {instance_name}");

        Ok(database_connection_string(instance_name, database_name))
    }

    /// Drop a database if it exists, rolling back the transactions of its open connections first.
    pub async fn delete_database(
        &self,
        database_name: &str,
        instance_name: &str,
    ) -> Result<(), LocalDbError> {
        self.check_platform()?;

        validate_database_name(database_name)?;

        let endpoint = self.admin_endpoint(instance_name).await?;

        self.executor.execute(&endpoint, &AdminStatement::drop_database(database_name)).await?;

        tracing::info!("database {database_name} has been deleted from instance {instance_name}");

        Ok(())
    }
}
