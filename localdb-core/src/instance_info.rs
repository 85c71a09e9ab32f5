use chrono::NaiveDateTime;

const LAST_START_TIME_FORMATS: [&str; 2] = ["%m/%d/%Y %I:%M:%S %p", "%Y-%m-%d %H:%M:%S"];

/// The state reported for a LocalDB instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum InstanceState {
    Running,
    Stopped,
    Other(String),
}

/// The information `sqllocaldb info <name>` prints about an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InstanceInfo {
    pub name:            String,
    pub version:         Option<String>,
    pub shared_name:     Option<String>,
    pub owner:           Option<String>,
    pub auto_create:     bool,
    pub state:           Option<InstanceState>,
    /// `None` if the instance has never been started or the timestamp is in an unknown locale.
    pub last_start_time: Option<NaiveDateTime>,
    /// Only present while the instance is running.
    pub pipe_name:       Option<String>,
}

impl InstanceInfo {
    /// Parse the output of `sqllocaldb info <name>`. Unknown lines are ignored.
    pub fn parse(output: &str) -> Self {
        let mut info = Self::default();

        for line in output.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };

            let value = value.trim();

            let non_empty = || if value.is_empty() { None } else { Some(value.to_string()) };

            match key.trim().to_ascii_lowercase().as_str() {
                "name" => info.name = value.to_string(),
                "version" => info.version = non_empty(),
                "shared name" => info.shared_name = non_empty(),
                "owner" => info.owner = non_empty(),
                "auto-create" => info.auto_create = value.eq_ignore_ascii_case("yes"),
                "state" => {
                    info.state = non_empty().map(|state| {
                        match state.to_ascii_lowercase().as_str() {
                            "running" => InstanceState::Running,
                            "stopped" => InstanceState::Stopped,
                            _ => InstanceState::Other(state),
                        }
                    });
                },
                "last start time" => {
                    info.last_start_time = LAST_START_TIME_FORMATS
                        .iter()
                        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                },
                "instance pipe name" => info.pipe_name = non_empty(),
                _ => (),
            }
        }

        info
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self.state, Some(InstanceState::Running))
    }

    /// Retrieve the pipe path (`\\.\pipe\...`) without the `np:` protocol prefix.
    #[inline]
    pub fn pipe_path(&self) -> Option<&str> {
        self.pipe_name.as_deref().map(|name| name.strip_prefix("np:").unwrap_or(name))
    }
}
