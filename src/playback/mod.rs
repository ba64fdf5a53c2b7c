use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::RunError;

/// One blocking watch cycle over a batch of course URLs. Implementations own
/// everything browser-side; the scheduler only sees success or failure after
/// the cycle has run its course.
#[async_trait]
pub trait PlaybackDriver: Send + Sync {
    async fn run_cycle(&self, urls: &[String]) -> Result<(), RunError>;
}

/// Production driver: opens the batch as tabs in the operator's browser and
/// holds them open for one full cycle, then tears the process down. Playback
/// configuration (mute, speed, session cookie) lives with the browser
/// profile; the cookie is exported to the child environment for profile
/// bootstrap scripts.
pub struct BrowserDriver {
    browser_command: String,
    li_at_cookie: String,
    cycle: Duration,
}

impl BrowserDriver {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            browser_command: config.browser_command.clone(),
            li_at_cookie: config.li_at_cookie.clone(),
            cycle: Duration::from_secs_f64(config.cycle_hours * 3600.0),
        }
    }
}

#[async_trait]
impl PlaybackDriver for BrowserDriver {
    async fn run_cycle(&self, urls: &[String]) -> Result<(), RunError> {
        info!(tabs = urls.len(), "opening course tabs in {}", self.browser_command);

        let mut child = Command::new(&self.browser_command)
            .args(urls)
            .env("LI_AT_COOKIE", &self.li_at_cookie)
            .spawn()
            .map_err(|e| {
                RunError::Playback(format!("failed to launch {}: {}", self.browser_command, e))
            })?;

        tokio::time::sleep(self.cycle).await;

        // An early exit is normal when the command handed the tabs off to an
        // already-running browser instance.
        match child.try_wait() {
            Ok(Some(status)) => {
                info!("browser process exited during the cycle: {}", status);
            }
            Ok(None) => {
                info!("cycle complete, closing browser");
                if let Err(e) = child.kill().await {
                    warn!("failed to close browser after cycle: {}", e);
                }
            }
            Err(e) => {
                return Err(RunError::Playback(format!("browser wait failed: {}", e)));
            }
        }

        Ok(())
    }
}
