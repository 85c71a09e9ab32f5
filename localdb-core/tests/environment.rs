use std::{env, path::Path};

use localdb_core::{expand_environment_variables, LocalDbOptions, DATA_PATH};

#[test]
fn expand() {
    env::set_var("LOCALDB_TEST_EXPAND_A", "alpha");
    env::set_var("LOCALDB_TEST_EXPAND_B", "beta");

    assert_eq!("alpha", expand_environment_variables("%LOCALDB_TEST_EXPAND_A%"));
    assert_eq!(
        r"alpha\beta\gamma",
        expand_environment_variables(r"%LOCALDB_TEST_EXPAND_A%\%LOCALDB_TEST_EXPAND_B%\gamma")
    );
    assert_eq!("alphabeta", expand_environment_variables("%LOCALDB_TEST_EXPAND_A%%LOCALDB_TEST_EXPAND_B%"));
    assert_eq!("no variables", expand_environment_variables("no variables"));
}

#[test]
fn expand_unknown() {
    env::set_var("LOCALDB_TEST_EXPAND_C", "gamma");

    assert_eq!(
        "%LOCALDB_TEST_EXPAND_UNSET%",
        expand_environment_variables("%LOCALDB_TEST_EXPAND_UNSET%")
    );
    assert_eq!(
        "%LOCALDB_TEST_EXPAND_UNSET%gamma",
        expand_environment_variables("%LOCALDB_TEST_EXPAND_UNSET%%LOCALDB_TEST_EXPAND_C%")
    );
    assert_eq!("100%", expand_environment_variables("100%"));
    assert_eq!("%%", expand_environment_variables("%%"));
    assert_eq!("50% gamma", expand_environment_variables("50% %LOCALDB_TEST_EXPAND_C%"));
}

#[test]
fn default_options() {
    let options = LocalDbOptions::default();

    assert_eq!("sqllocaldb.exe", options.executable);
    assert_eq!(DATA_PATH, options.data_path);
    assert!(options.use_shell);
    assert_eq!(None, options.process_timeout);
    assert_eq!(30, options.connect_timeout.as_secs());
    assert_eq!(env::consts::OS, options.host_os);
}

#[test]
fn expanded_data_path() {
    env::set_var("LOCALDB_TEST_DATA_ROOT", "data-root");

    let options = LocalDbOptions {
        data_path: String::from("%LOCALDB_TEST_DATA_ROOT%"),
        ..LocalDbOptions::default()
    };

    assert_eq!(Path::new("data-root"), options.expanded_data_path());
}
