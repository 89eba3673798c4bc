use {
    crate::error::ConfigError,
    std::{env, num::NonZeroUsize, path::PathBuf, time::Duration},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Simulate,
    Stdin,
    File,
}

impl SourceKind {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "simulate" | "sim" => Ok(SourceKind::Simulate),
            "stdin" | "-" => Ok(SourceKind::Stdin),
            "file" | "tail" => Ok(SourceKind::File),
            other => Err(ConfigError::InvalidValue(format!(
                "DETFLOW_SOURCE must be simulate, stdin or file (got '{}')",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Simulate => "simulate",
            SourceKind::Stdin => "stdin",
            SourceKind::File => "file",
        }
    }
}

/// Runtime configuration loaded from environment variables
///
/// Environment variables:
/// - `DETFLOW_SOURCE` (default: simulate)
/// - `DETFLOW_EVENTS_PATH` (default: streams/detections.jsonl)
/// - `DETFLOW_FROM_START` (default: false)
/// - `DETFLOW_CHANNEL_BUFFER` (default: 1000)
/// - `DETFLOW_SIM_INTERVAL_MS` (default: 2000)
/// - `DETFLOW_SIM_LIMIT` (default: unlimited)
/// - `DETFLOW_TOP_N` (default: 5)
/// - `RUST_LOG` (default: info)
#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceKind,
    pub events_path: PathBuf,
    pub from_start: bool,
    pub channel_buffer: usize,
    pub sim_interval: Duration,
    pub sim_limit: Option<u64>,
    pub top_n: NonZeroUsize,
    pub headless: bool,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let source = match env::var("DETFLOW_SOURCE") {
            Ok(value) => SourceKind::parse(&value)?,
            Err(_) => SourceKind::Simulate,
        };

        let events_path = env::var("DETFLOW_EVENTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("streams/detections.jsonl"));

        let from_start = match env::var("DETFLOW_FROM_START") {
            Ok(value) => value.trim().to_lowercase().parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "DETFLOW_FROM_START must be true or false (got '{}')",
                    value
                ))
            })?,
            Err(_) => false,
        };

        let channel_buffer = parse_var::<usize>("DETFLOW_CHANNEL_BUFFER")?.unwrap_or(1_000);
        if channel_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "DETFLOW_CHANNEL_BUFFER must be at least 1".to_string(),
            ));
        }

        let sim_interval_ms = parse_var::<u64>("DETFLOW_SIM_INTERVAL_MS")?.unwrap_or(2_000);
        let sim_limit = parse_var::<u64>("DETFLOW_SIM_LIMIT")?;

        let top_n = parse_var::<usize>("DETFLOW_TOP_N")?.unwrap_or(5);
        let top_n = NonZeroUsize::new(top_n).ok_or_else(|| {
            ConfigError::InvalidValue("DETFLOW_TOP_N must be a positive integer".to_string())
        })?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            source,
            events_path,
            from_start,
            channel_buffer,
            sim_interval: Duration::from_millis(sim_interval_ms),
            sim_limit,
            top_n,
            headless: false,
            rust_log,
        })
    }

    /// Apply `--headless` and `--source <kind>` from the command line
    pub fn apply_args(mut self, args: &[String]) -> Result<Self, ConfigError> {
        if args.iter().any(|arg| arg == "--headless") {
            self.headless = true;
        }

        if let Some(idx) = args.iter().position(|arg| arg == "--source") {
            match args.get(idx + 1) {
                Some(value) => self.source = SourceKind::parse(value)?,
                None => {
                    return Err(ConfigError::InvalidValue(
                        "--source requires a value".to_string(),
                    ))
                }
            }
        }

        Ok(self)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::InvalidValue(format!("{} is not a valid number: '{}'", name, value))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 7] = [
        "DETFLOW_SOURCE",
        "DETFLOW_EVENTS_PATH",
        "DETFLOW_FROM_START",
        "DETFLOW_CHANNEL_BUFFER",
        "DETFLOW_SIM_INTERVAL_MS",
        "DETFLOW_SIM_LIMIT",
        "DETFLOW_TOP_N",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    // Environment is process-global, so all env-driven cases share one test
    #[test]
    fn test_config_from_env() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.source, SourceKind::Simulate);
        assert_eq!(config.events_path, PathBuf::from("streams/detections.jsonl"));
        assert!(!config.from_start);
        assert_eq!(config.channel_buffer, 1_000);
        assert_eq!(config.sim_interval, Duration::from_millis(2_000));
        assert_eq!(config.sim_limit, None);
        assert_eq!(config.top_n.get(), 5);
        assert!(!config.headless);

        env::set_var("DETFLOW_SOURCE", "file");
        env::set_var("DETFLOW_EVENTS_PATH", "/tmp/detections.jsonl");
        env::set_var("DETFLOW_FROM_START", "TRUE");
        env::set_var("DETFLOW_SIM_LIMIT", "25");
        env::set_var("DETFLOW_TOP_N", "3");
        let config = Config::from_env().unwrap();
        assert_eq!(config.source, SourceKind::File);
        assert_eq!(config.events_path, PathBuf::from("/tmp/detections.jsonl"));
        assert!(config.from_start);
        assert_eq!(config.sim_limit, Some(25));
        assert_eq!(config.top_n.get(), 3);

        env::set_var("DETFLOW_FROM_START", "yes");
        assert!(matches!(Config::from_env(), Err(ConfigError::InvalidValue(_))));
        env::set_var("DETFLOW_FROM_START", " False ");
        assert!(!Config::from_env().unwrap().from_start);

        env::set_var("DETFLOW_TOP_N", "0");
        assert!(matches!(Config::from_env(), Err(ConfigError::InvalidValue(_))));

        env::set_var("DETFLOW_TOP_N", "3");
        env::set_var("DETFLOW_CHANNEL_BUFFER", "lots");
        assert!(matches!(Config::from_env(), Err(ConfigError::InvalidValue(_))));

        env::set_var("DETFLOW_CHANNEL_BUFFER", "10");
        env::set_var("DETFLOW_SOURCE", "socket");
        assert!(Config::from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_args_override() {
        let base = Config {
            source: SourceKind::Simulate,
            events_path: PathBuf::from("x"),
            from_start: false,
            channel_buffer: 10,
            sim_interval: Duration::from_millis(10),
            sim_limit: None,
            top_n: NonZeroUsize::new(5).unwrap(),
            headless: false,
            rust_log: "info".to_string(),
        };

        let args: Vec<String> = ["detflow", "--headless", "--source", "stdin"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let config = base.clone().apply_args(&args).unwrap();
        assert!(config.headless);
        assert_eq!(config.source, SourceKind::Stdin);

        let dangling = vec!["detflow".to_string(), "--source".to_string()];
        assert!(base.apply_args(&dangling).is_err());
    }
}
