/*!
# LocalDB Core

Create, start, stop and delete throwaway SQL Server Express LocalDB instances and databases for test suites, and hand out connection strings for test code to consume.

Instances are managed by running `sqllocaldb.exe`. Databases are created and dropped with administrative statements sent over the named pipe of the instance. LocalDB only exists on Windows, so every operation fails with `LocalDbError::PlatformNotSupported` on other hosts.

## Examples

#### Create a Database

```rust,no_run
use localdb_core::LocalDb;

# #[tokio::main(flavor = "current_thread")]
# async fn main() {
let localdb = LocalDb::new();

localdb.try_delete_instance("UnitTestProject").await.unwrap();
localdb.create_instance("UnitTestProject").await.unwrap();

let connection_string = localdb.create_database("Database1", "UnitTestProject").await.unwrap();

// hand `connection_string` over to the code under test

localdb.delete_database("Database1", "UnitTestProject").await.unwrap();
localdb.delete_instance("UnitTestProject").await.unwrap();
# }
```

#### Bound the Instance Manager

```rust,no_run
use std::time::Duration;

use localdb_core::{LocalDb, LocalDbOptions};

# #[tokio::main(flavor = "current_thread")]
# async fn main() {
let localdb = LocalDb::with_options(LocalDbOptions {
    process_timeout: Some(Duration::from_secs(60)),
    ..LocalDbOptions::default()
});

let cancellation_token = localdb.runner().cancellation_token().clone();

// `cancellation_token.cancel()` aborts a hanging `sqllocaldb.exe` from another task

localdb.stop_instance("UnitTestProject").await.unwrap();
# }
```
*/

#![cfg_attr(docsrs, feature(doc_cfg))]

pub extern crate chrono;
pub extern crate tiberius;
pub extern crate tokio_util;

mod functions;
mod instance_info;
mod localdb;
mod localdb_errors;
mod localdb_options;
mod process;
mod sql;

pub use functions::expand_environment_variables;
pub use instance_info::*;
pub use localdb::*;
pub use localdb_errors::*;
pub use localdb_options::*;
pub use process::*;
pub use sql::*;
