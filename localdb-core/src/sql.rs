use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};

#[cfg(windows)]
use std::io;

use tiberius::Config;
#[cfg(windows)]
use tiberius::{Client, ToSql};
#[cfg(windows)]
use tokio::{
    net::windows::named_pipe::{ClientOptions, NamedPipeClient},
    time,
};
#[cfg(windows)]
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::LocalDbError;

// Identifiers and `FILENAME` literals cannot be bound, so the DDL is assembled on the server from
// bound values. `QUOTENAME` only accepts up to 128 characters, hence `REPLACE` for the paths.
const CREATE_DATABASE_SQL: &str = "
    IF EXISTS (SELECT 1 FROM sys.databases WHERE [name] = @P1)
    BEGIN
        DECLARE @drop_sql NVARCHAR(MAX) = N'DROP DATABASE ' + QUOTENAME(@P1) + N';';

        EXEC (@drop_sql);
    END;

    DECLARE @create_sql NVARCHAR(MAX) = N'CREATE DATABASE ' + QUOTENAME(@P1)
        + N' ON PRIMARY (NAME = ' + QUOTENAME(@P2)
        + N', FILENAME = N''' + REPLACE(@P3, N'''', N'''''') + N''')'
        + N' LOG ON (NAME = ' + QUOTENAME(@P4)
        + N', FILENAME = N''' + REPLACE(@P5, N'''', N'''''') + N''');';

    EXEC (@create_sql);
";

const DROP_DATABASE_SQL: &str = "
    IF EXISTS (SELECT 1 FROM sys.databases WHERE [name] = @P1)
    BEGIN
        DECLARE @quoted_name NVARCHAR(258) = QUOTENAME(@P1);

        EXEC (N'ALTER DATABASE ' + @quoted_name + N' SET SINGLE_USER WITH ROLLBACK IMMEDIATE;');
        EXEC (N'DROP DATABASE ' + @quoted_name + N';');
    END;
";

/// An administrative statement run against the `master` database of an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminStatement {
    /// Drop the database if it exists, then create it with explicit data and log files.
    CreateDatabase { database_name: String, data_file: PathBuf, log_file: PathBuf },
    /// Force the database into single-user mode, rolling back open transactions, then drop it.
    DropDatabase { database_name: String },
}

impl AdminStatement {
    /// Create a statement which (re)creates `<database_name>_data.mdf` and `<database_name>_log.ldf` under `data_directory`.
    pub fn create_database(database_name: impl Into<String>, data_directory: impl AsRef<Path>) -> Self {
        let database_name = database_name.into();
        let data_directory = data_directory.as_ref();

        Self::CreateDatabase {
            data_file: data_directory.join(format!("{database_name}_data.mdf")),
            log_file: data_directory.join(format!("{database_name}_log.ldf")),
            database_name,
        }
    }

    #[inline]
    pub fn drop_database(database_name: impl Into<String>) -> Self {
        Self::DropDatabase {
            database_name: database_name.into()
        }
    }

    #[inline]
    pub fn database_name(&self) -> &str {
        match self {
            Self::CreateDatabase {
                database_name, ..
            }
            | Self::DropDatabase {
                database_name,
            } => database_name,
        }
    }

    /// The T-SQL text. Parameters are referenced as `@P1`, `@P2`, ...
    #[inline]
    pub fn sql(&self) -> &'static str {
        match self {
            Self::CreateDatabase {
                ..
            } => CREATE_DATABASE_SQL,
            Self::DropDatabase {
                ..
            } => DROP_DATABASE_SQL,
        }
    }

    /// The values bound to `@P1`, `@P2`, ... in order.
    pub fn params(&self) -> Vec<String> {
        match self {
            Self::CreateDatabase {
                database_name,
                data_file,
                log_file,
            } => vec![
                database_name.clone(),
                format!("{database_name}_data"),
                data_file.to_string_lossy().into_owned(),
                format!("{database_name}_log"),
                log_file.to_string_lossy().into_owned(),
            ],
            Self::DropDatabase {
                database_name,
            } => vec![database_name.clone()],
        }
    }
}

/// Where an administrative connection goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlEndpoint {
    pub connection_string: String,
    /// The named pipe of the running instance, without the `np:` prefix.
    pub pipe_path:         Option<String>,
}

impl SqlEndpoint {
    #[inline]
    pub fn new(connection_string: impl Into<String>, pipe_path: Option<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            pipe_path,
        }
    }
}

/// Runs administrative statements.
pub trait SqlExecutor {
    /// Open a connection to `endpoint`, run `statement`, and close the connection.
    fn execute(
        &self,
        endpoint: &SqlEndpoint,
        statement: &AdminStatement,
    ) -> impl Future<Output = Result<(), LocalDbError>> + Send;
}

/// Whether the certificate of the server is accepted without validation for a connection string.
///
/// Only a required encryption (`Encrypt=True`, or no `Encrypt` at all) validates the certificate, unless
/// `TrustServerCertificate=True` says otherwise or `TrustServerCertificateCA` names the authority to validate
/// against. LocalDB presents a self-signed certificate for the host `(localdb)`, which never validates.
///
/// ```
/// use localdb_core::{connection_string, trusts_server_certificate};
///
/// assert!(trusts_server_certificate(&connection_string("UnitTests")));
/// assert!(!trusts_server_certificate(r"Data Source=(localdb)\UnitTests;Encrypt=True"));
/// ```
pub fn trusts_server_certificate(connection_string: &str) -> bool {
    let mut encrypt = true;
    let mut trust_server_certificate = false;
    let mut has_certificate_authority = false;

    for pair in connection_string.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };

        let key = key.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();
        let value = value.trim().to_lowercase();

        match key.as_str() {
            "encrypt" => encrypt = matches!(value.as_str(), "true" | "yes" | "mandatory" | "strict"),
            "trustservercertificate" => {
                trust_server_certificate = matches!(value.as_str(), "true" | "yes")
            },
            "trustservercertificateca" => has_certificate_authority = !value.is_empty(),
            _ => (),
        }
    }

    !has_certificate_authority && (trust_server_certificate || !encrypt)
}

/// Build the `tiberius` configuration of an administrative connection.
///
/// `tiberius` still secures the login with TLS when encryption is off, so the certificate is trusted whenever
/// [`trusts_server_certificate`] says so.
pub fn admin_config(connection_string: &str) -> Result<Config, LocalDbError> {
    let mut config = Config::from_ado_string(connection_string)?;

    if trusts_server_certificate(connection_string) {
        config.trust_cert();
    }

    Ok(config)
}

/// A client connected to a LocalDB instance through its named pipe.
#[cfg(windows)]
pub type LocalDbClient = Client<Compat<NamedPipeClient>>;

/// Runs administrative statements with `tiberius` over the named pipe of the instance.
#[derive(Debug, Clone)]
pub struct TiberiusExecutor {
    connect_timeout: Duration,
}

impl Default for TiberiusExecutor {
    #[inline]
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl TiberiusExecutor {
    #[inline]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
        }
    }

    #[inline]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Connect to `endpoint`. The connection stays open until the returned client is dropped or closed.
    #[cfg(windows)]
    pub async fn connect(&self, endpoint: &SqlEndpoint) -> Result<LocalDbClient, LocalDbError> {
        let config = admin_config(&endpoint.connection_string)?;

        let pipe_path = endpoint.pipe_path.as_deref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "the instance has no pipe to connect to")
        })?;

        let connect = async {
            let pipe = open_named_pipe(pipe_path).await?;

            Ok::<_, LocalDbError>(Client::connect(config, pipe.compat()).await?)
        };

        match time::timeout(self.connect_timeout, connect).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("cannot connect to {pipe_path} within {:?}", self.connect_timeout),
            )
            .into()),
        }
    }
}

impl SqlExecutor for TiberiusExecutor {
    #[cfg(windows)]
    async fn execute(
        &self,
        endpoint: &SqlEndpoint,
        statement: &AdminStatement,
    ) -> Result<(), LocalDbError> {
        let mut client = self.connect(endpoint).await?;

        let params = statement.params();
        let params: Vec<&dyn ToSql> = params.iter().map(|param| param as &dyn ToSql).collect();

        tracing::debug!("executing {:?} on {:?}", statement, endpoint.pipe_path);

        client.execute(statement.sql(), &params).await?;

        client.close().await?;

        Ok(())
    }

    #[cfg(not(windows))]
    async fn execute(
        &self,
        _endpoint: &SqlEndpoint,
        _statement: &AdminStatement,
    ) -> Result<(), LocalDbError> {
        Err(LocalDbError::PlatformNotSupported)
    }
}

#[cfg(windows)]
async fn open_named_pipe(pipe_path: &str) -> io::Result<NamedPipeClient> {
    const ERROR_PIPE_BUSY: i32 = 231;

    loop {
        match ClientOptions::new().open(pipe_path) {
            Ok(client) => return Ok(client),
            Err(error) if error.raw_os_error() == Some(ERROR_PIPE_BUSY) => (),
            Err(error) => return Err(error),
        }

        time::sleep(Duration::from_millis(50)).await;
    }
}
