use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use mirror_logging::{mirror_debug, mirror_info, mirror_warn};
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("invalid browser configuration: {0}")]
    Config(String),
    #[error("failed to launch browser: {0}")]
    Launch(String),
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Falls back to chromiumoxide's own executable detection when unset.
    pub chrome_executable: Option<PathBuf>,
    pub window_size: (u32, u32),
    pub request_timeout: Duration,
    pub extra_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            window_size: (1920, 1080),
            request_timeout: Duration::from_secs(60),
            extra_args: Vec::new(),
        }
    }
}

/// A launched browser plus the task driving its DevTools connection.
pub struct BrowserHost {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
}

impl BrowserHost {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, BrowserError> {
        let (width, height) = settings.window_size;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .request_timeout(settings.request_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-setuid-sandbox")
            .arg("--no-sandbox")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--ignore-certificate-errors")
            .arg(format!("--window-size={width},{height}"));

        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_executable {
            builder = builder.chrome_executable(path.clone());
        }
        for arg in &settings.extra_args {
            builder = builder.arg(arg.clone());
        }

        let config = builder.build().map_err(BrowserError::Config)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    // Unknown CDP events surface as deserialization errors; they are harmless.
                    mirror_debug!("Browser handler event error: {}", err);
                }
            }
            mirror_debug!("Browser handler task completed");
        });

        mirror_info!("Browser launched (headless={})", settings.headless);
        Ok(Self {
            browser: Arc::new(browser),
            handler,
        })
    }

    pub fn browser(&self) -> Arc<Browser> {
        self.browser.clone()
    }

    /// Close the browser once every other holder has been dropped.
    pub async fn shutdown(self) {
        match Arc::try_unwrap(self.browser) {
            Ok(mut browser) => {
                if let Err(err) = browser.close().await {
                    mirror_warn!("Failed to close browser: {}", err);
                }
                if let Err(err) = browser.wait().await {
                    mirror_warn!("Failed to reap browser process: {}", err);
                }
            }
            Err(_) => mirror_warn!("Browser still referenced at shutdown; leaving it to drop"),
        }
        self.handler.abort();
    }
}
