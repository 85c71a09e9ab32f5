use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io,
    time::Duration,
};

/// Errors occurred during LocalDB instance and database operations.
#[derive(Debug)]
pub enum LocalDbError {
    /// LocalDB only exists on Windows hosts.
    PlatformNotSupported,
    /// The instance manager exited with a non-zero code.
    CommandFailed { subcommand: &'static str, exit_code: i32 },
    /// The instance manager did not exit within the configured timeout.
    CommandTimedOut { subcommand: &'static str, timeout: Duration },
    /// The instance manager invocation was cancelled.
    Cancelled { subcommand: &'static str },
    /// The database name cannot be used as an identifier and a file name at the same time.
    InvalidDatabaseName { name: String },
    IOError(io::Error),
    SQLError(tiberius::error::Error),
}

impl From<io::Error> for LocalDbError {
    #[inline]
    fn from(error: io::Error) -> Self {
        Self::IOError(error)
    }
}

impl From<tiberius::error::Error> for LocalDbError {
    #[inline]
    fn from(error: tiberius::error::Error) -> Self {
        Self::SQLError(error)
    }
}

impl Display for LocalDbError {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlatformNotSupported => {
                f.write_str("SQL Server Express LocalDB is only supported on Windows")
            },
            Self::CommandFailed {
                subcommand,
                exit_code,
            } => f.write_fmt(format_args!("sqllocaldb {subcommand} result code {exit_code}")),
            Self::CommandTimedOut {
                subcommand,
                timeout,
            } => f.write_fmt(format_args!(
                "sqllocaldb {subcommand} did not exit within {timeout:?}"
            )),
            Self::Cancelled {
                subcommand,
            } => f.write_fmt(format_args!("sqllocaldb {subcommand} has been cancelled")),
            Self::InvalidDatabaseName {
                name,
            } => f.write_fmt(format_args!("{name:?} is not a usable database name")),
            Self::IOError(error) => Display::fmt(error, f),
            Self::SQLError(error) => Display::fmt(error, f),
        }
    }
}

impl Error for LocalDbError {
    #[inline]
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IOError(error) => Some(error),
            Self::SQLError(error) => Some(error),
            _ => None,
        }
    }
}

impl LocalDbError {
    /// Retrieve the exit code of the instance manager if this error was caused by one.
    #[inline]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed {
                exit_code, ..
            } => Some(*exit_code),
            _ => None,
        }
    }
}
