use chrono::NaiveDate;
use localdb_core::{InstanceInfo, InstanceState};

#[test]
fn parse_running_instance() {
    let info = InstanceInfo::parse(
        "Name:               UnitTestProject\r
Version:            15.0.4153.1\r
Shared name:\r
Owner:              WORKSTATION\\tester\r
Auto-create:        No\r
State:              Running\r
Last start time:    10/16/2026 6:30:05 PM\r
Instance pipe name: np:\\\\.\\pipe\\LOCALDB#5C1E3F2A\\tsql\\query\r
",
    );

    assert_eq!(
        InstanceInfo {
            name:            String::from("UnitTestProject"),
            version:         Some(String::from("15.0.4153.1")),
            shared_name:     None,
            owner:           Some(String::from(r"WORKSTATION\tester")),
            auto_create:     false,
            state:           Some(InstanceState::Running),
            last_start_time: Some(
                NaiveDate::from_ymd_opt(2026, 10, 16).unwrap().and_hms_opt(18, 30, 5).unwrap()
            ),
            pipe_name:       Some(String::from(r"np:\\.\pipe\LOCALDB#5C1E3F2A\tsql\query")),
        },
        info
    );

    assert!(info.is_running());
    assert_eq!(Some(r"\\.\pipe\LOCALDB#5C1E3F2A\tsql\query"), info.pipe_path());
}

#[test]
fn parse_stopped_instance() {
    let info = InstanceInfo::parse(
        "Name:               MSSQLLocalDB
Version:            16.0.1000.6
Shared name:        SharedTests
Owner:              WORKSTATION\\tester
Auto-create:        Yes
State:              Stopped
Last start time:    unknown
Instance pipe name:
",
    );

    assert_eq!("MSSQLLocalDB", info.name);
    assert_eq!(Some("SharedTests"), info.shared_name.as_deref());
    assert!(info.auto_create);
    assert_eq!(Some(InstanceState::Stopped), info.state);
    assert!(!info.is_running());
    assert_eq!(None, info.last_start_time);
    assert_eq!(None, info.pipe_path());
}

#[test]
fn parse_unexpected_output() {
    let info = InstanceInfo::parse("LocalDB instance \"Nope\" doesn't exist!\nState: Starting\n");

    assert_eq!("", info.name);
    assert_eq!(Some(InstanceState::Other(String::from("Starting"))), info.state);
    assert_eq!(None, info.pipe_name);
}
