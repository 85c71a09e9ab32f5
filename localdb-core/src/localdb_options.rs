use std::{path::PathBuf, time::Duration};

use educe::Educe;

use crate::functions::expand_environment_variables;

/// The file name of the LocalDB instance manager.
pub const LOCALDB_EXECUTABLE: &str = "sqllocaldb.exe";
/// The base directory of instance data directories, before environment variable expansion.
pub const DATA_PATH: &str = r"%LOCALAPPDATA%\LocalDb";
/// The only host OS on which LocalDB exists.
pub const SUPPORTED_OS: &str = "windows";

/// Options of a [`LocalDb`](crate::LocalDb) manager.
#[derive(Debug, Clone, Educe)]
#[educe(Default)]
pub struct LocalDbOptions {
    /// The instance manager to invoke.
    #[educe(Default(expression = String::from(LOCALDB_EXECUTABLE)))]
    pub executable:      String,
    /// The base directory of instance data directories. `%NAME%` sequences are expanded.
    #[educe(Default(expression = String::from(DATA_PATH)))]
    pub data_path:       String,
    /// Whether to run the instance manager through `cmd.exe /c`.
    #[educe(Default = true)]
    pub use_shell:       bool,
    /// The longest time to wait for the instance manager to exit. `None` waits forever.
    pub process_timeout: Option<Duration>,
    /// The longest time to wait for an administrative connection to be established.
    #[educe(Default(expression = Duration::from_secs(30)))]
    pub connect_timeout: Duration,
    /// The host OS the platform gate checks against [`SUPPORTED_OS`].
    #[educe(Default(expression = String::from(std::env::consts::OS)))]
    pub host_os:         String,
}

impl LocalDbOptions {
    /// Expand the data path into a concrete directory path.
    #[inline]
    pub fn expanded_data_path(&self) -> PathBuf {
        PathBuf::from(expand_environment_variables(&self.data_path))
    }

    /// Whether the platform gate lets operations through.
    #[inline]
    pub fn is_platform_supported(&self) -> bool {
        self.host_os == SUPPORTED_OS
    }
}
