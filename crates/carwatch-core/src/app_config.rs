use std::path::PathBuf;

/// Wall-clock time of day for a daily job, parsed from `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime {
    pub hour: u32,
    pub minute: u32,
}

impl ScheduleTime {
    /// Six-field cron expression (`sec min hour dom mon dow`) firing once a day.
    #[must_use]
    pub fn daily_cron(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

impl std::str::FromStr for ScheduleTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hh, mm) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got \"{s}\""))?;
        let hour = hh
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("hour \"{hh}\": {e}"))?;
        let minute = mm
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("minute \"{mm}\": {e}"))?;
        if hour > 23 || minute > 59 {
            return Err(format!("{hour:02}:{minute:02} is not a valid time of day"));
        }
        Ok(Self { hour, minute })
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub base_url: String,
    pub search_path: String,
    pub user_agent: String,
    pub accept_language: String,
    pub request_timeout_secs: u64,
    /// Cap on index pages walked by scheduled runs; `None` walks all of them.
    pub max_pages: Option<u32>,
    pub browser_enabled: bool,
    pub chrome_path: Option<PathBuf>,
    pub plate_pattern: Option<String>,
    pub token_expiry_keys: Vec<String>,
    pub token_hash_keys: Vec<String>,
    pub timezone: String,
    pub scrape_time: ScheduleTime,
    pub dump_time: ScheduleTime,
    pub dumps_dir: PathBuf,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("base_url", &self.base_url)
            .field("search_path", &self.search_path)
            .field("user_agent", &self.user_agent)
            .field("accept_language", &self.accept_language)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_pages", &self.max_pages)
            .field("browser_enabled", &self.browser_enabled)
            .field("chrome_path", &self.chrome_path)
            .field("plate_pattern", &self.plate_pattern)
            .field("token_expiry_keys", &self.token_expiry_keys)
            .field("token_hash_keys", &self.token_hash_keys)
            .field("timezone", &self.timezone)
            .field("scrape_time", &self.scrape_time)
            .field("dump_time", &self.dump_time)
            .field("dumps_dir", &self.dumps_dir)
            .finish()
    }
}
