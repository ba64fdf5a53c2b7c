use std::env;

use crate::error::RunError;

/// Runtime settings, read once at startup and handed to the catalog client,
/// ledger and scheduler constructors.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub sheet_url: String,
    pub li_at_cookie: String,
    pub database_url: String,
    pub browser_command: String,
    pub cycle_hours: f64,
    pub max_tabs: usize,
    pub max_attempt_ceiling: i64,
    pub default_course_hours: f64,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, RunError> {
        let sheet_url = env::var("COURSE_SHEET_URL")
            .map_err(|_| RunError::Config("COURSE_SHEET_URL is not set".to_string()))?
            .trim()
            .to_string();
        let li_at_cookie = env::var("LI_AT_COOKIE")
            .map_err(|_| RunError::Config("LI_AT_COOKIE is not set".to_string()))?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://automator.db?mode=rwc".to_string());
        let browser_command =
            env::var("BROWSER_COMMAND").unwrap_or_else(|_| "chromium".to_string());

        let cycle_hours = parse_f64_var("CYCLE_HOURS", 3.0)?;
        if cycle_hours <= 0.0 {
            return Err(RunError::Config("CYCLE_HOURS must be positive".to_string()));
        }
        let max_tabs = parse_usize_var("MAX_TABS", 5)?;
        if max_tabs == 0 {
            return Err(RunError::Config("MAX_TABS must be at least 1".to_string()));
        }

        Ok(Self {
            sheet_url,
            li_at_cookie,
            database_url,
            browser_command,
            cycle_hours,
            max_tabs,
            max_attempt_ceiling: 5,
            default_course_hours: 3.0,
        })
    }
}

fn parse_f64_var(name: &str, default: f64) -> Result<f64, RunError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| RunError::Config(format!("{} is not a number: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

fn parse_usize_var(name: &str, default: usize) -> Result<usize, RunError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| RunError::Config(format!("{} is not a number: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
