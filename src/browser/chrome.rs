//! Launches a local Chrome/Chromium and hands out page targets

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Mutex;
use url::Url;

use super::cdp::CdpClient;
use super::chrome_page::ChromePage;
use super::error::{BrowserError, BrowserResult};
use super::{Browser, Page};
use crate::config::{Config, ProxyConfig};

/// Executable names tried on `PATH`, in order
const CHROME_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "msedge",
];

/// Absolute install locations checked when nothing is on `PATH`
const CHROME_INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
];

const DEVTOOLS_PREFIX: &str = "DevTools listening on ";

/// How to start the browser process
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit executable; discovered when `None`
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub proxy: Option<ProxyConfig>,
    pub user_agent: Option<String>,
    /// Time allowed for the DevTools endpoint to come up
    pub launch_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            proxy: None,
            user_agent: None,
            launch_timeout: Duration::from_secs(30),
        }
    }
}

impl LaunchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            executable: config.browser_path.as_ref().map(PathBuf::from),
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: Some(config.user_agent.clone()),
            launch_timeout: config.timeout(),
        }
    }
}

/// A Chrome process controlled over its browser-level DevTools socket
pub struct ChromeBrowser {
    client: CdpClient,
    /// `host:port` of the DevTools server
    endpoint: String,
    process: Mutex<Option<Child>>,
    user_data_dir: PathBuf,
}

impl ChromeBrowser {
    /// Starts Chrome and connects to its DevTools endpoint
    pub async fn launch(options: LaunchOptions) -> BrowserResult<Self> {
        let executable = match &options.executable {
            Some(path) => path.clone(),
            None => find_chrome_executable()?,
        };

        let user_data_dir =
            std::env::temp_dir().join(format!("dyncrawl-profile-{}", uuid::Uuid::new_v4()));
        let args = chrome_args(&options, &user_data_dir);

        tracing::info!(
            executable = %executable.display(),
            headless = options.headless,
            "launching browser"
        );

        let mut child = Command::new(&executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::LaunchFailed {
                reason: format!("{}: {e}", executable.display()),
            })?;

        let stderr = child.stderr.take().ok_or_else(|| BrowserError::LaunchFailed {
            reason: "browser stderr was not captured".to_string(),
        })?;
        let mut lines = BufReader::new(stderr).lines();

        let ws_url = tokio::time::timeout(options.launch_timeout, read_devtools_url(&mut lines))
            .await
            .map_err(|_| BrowserError::LaunchFailed {
                reason: format!(
                    "DevTools endpoint not reported within {:?}",
                    options.launch_timeout
                ),
            })??;

        // Keep draining so a chatty browser never blocks on a full pipe
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::trace!(target: "chrome", "{line}");
            }
        });

        let endpoint = devtools_endpoint(&ws_url)?;
        let client = CdpClient::connect(&ws_url).await?;

        tracing::debug!(endpoint = %endpoint, "browser ready");

        Ok(Self {
            client,
            endpoint,
            process: Mutex::new(Some(child)),
            user_data_dir,
        })
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        let result = self
            .client
            .send("Target.createTarget", json!({ "url": "about:blank" }))
            .await?;

        let target_id = result
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol {
                detail: "Target.createTarget returned no targetId".to_string(),
            })?;

        let page =
            ChromePage::connect(&format!("ws://{}/devtools/page/{}", self.endpoint, target_id))
                .await?;
        Ok(Box::new(page))
    }

    async fn close(&self) -> BrowserResult<()> {
        if let Err(e) = self.client.send("Browser.close", json!({})).await {
            tracing::debug!(error = %e, "Browser.close failed, killing process");
        }

        if let Some(mut child) = self.process.lock().await.take() {
            if tokio::time::timeout(Duration::from_secs(5), child.wait())
                .await
                .is_err()
            {
                child.kill().await?;
            }
        }

        if let Err(e) = tokio::fs::remove_dir_all(&self.user_data_dir).await {
            tracing::debug!(error = %e, "could not remove browser profile directory");
        }

        Ok(())
    }
}

/// Finds a Chrome-family executable
///
/// `CHROME_PATH` wins, then the first candidate on `PATH`, then well-known
/// install locations.
pub fn find_chrome_executable() -> BrowserResult<PathBuf> {
    if let Some(path) = std::env::var_os("CHROME_PATH") {
        return Ok(PathBuf::from(path));
    }

    if let Some(path) = CHROME_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
    {
        return Ok(path);
    }

    CHROME_INSTALL_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
        .ok_or_else(|| BrowserError::LaunchFailed {
            reason: format!(
                "no Chrome executable found (tried CHROME_PATH, {})",
                CHROME_CANDIDATES.join(", ")
            ),
        })
}

fn chrome_args(options: &LaunchOptions, user_data_dir: &Path) -> Vec<String> {
    let mut args = vec![
        "--remote-debugging-port=0".to_string(),
        format!("--user-data-dir={}", user_data_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-popup-blocking".to_string(),
        "--no-sandbox".to_string(),
    ];

    if options.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }

    if let Some(proxy) = &options.proxy {
        args.push(format!("--proxy-server={}", proxy.server));
        if proxy.ignore_https_errors {
            args.push("--ignore-certificate-errors".to_string());
        }
    }

    if let Some(user_agent) = &options.user_agent {
        args.push(format!("--user-agent={user_agent}"));
    }

    args.push("about:blank".to_string());
    args
}

async fn read_devtools_url(lines: &mut Lines<BufReader<ChildStderr>>) -> BrowserResult<String> {
    while let Some(line) = lines.next_line().await? {
        if let Some(url) = parse_devtools_line(&line) {
            return Ok(url.to_string());
        }
    }
    Err(BrowserError::LaunchFailed {
        reason: "browser exited before opening DevTools".to_string(),
    })
}

fn parse_devtools_line(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix(DEVTOOLS_PREFIX)
        .map(str::trim)
        .filter(|url| url.starts_with("ws://"))
}

/// `host:port` part of a DevTools WebSocket URL
fn devtools_endpoint(ws_url: &str) -> BrowserResult<String> {
    let url = Url::parse(ws_url).map_err(|e| BrowserError::Protocol {
        detail: format!("invalid DevTools URL '{ws_url}': {e}"),
    })?;

    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => Ok(format!("{host}:{port}")),
        _ => Err(BrowserError::Protocol {
            detail: format!("DevTools URL '{ws_url}' has no host:port"),
        }),
    }
}
