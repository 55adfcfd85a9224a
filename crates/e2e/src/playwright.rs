//! Playwright browser driver and response event source
//!
//! A scenario is rendered into a Node script that subscribes to the page's
//! response events before any driving step runs. The script prints one JSON
//! event per line; a reader task forwards them into an mpsc channel that the
//! observation session consumes.

use std::process::{Command, Stdio};

use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::event::{parse_host_event, HostEvent};
use crate::scenario::{DriveStep, Scenario};

#[derive(Debug, Clone, Copy, Default)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    /// Parse a browser name, falling back to Chromium
    pub fn from_name(name: &str) -> Self {
        match name {
            "firefox" => Browser::Firefox,
            "webkit" => Browser::Webkit,
            _ => Browser::Chromium,
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    /// Node executable used to run the generated script
    pub node_binary: String,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            browser: Browser::Chromium,
            headless: true,
            node_binary: "node".to_string(),
        }
    }
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;
        Ok(Self { config })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Build the driver script for a scenario
    pub fn build_script(&self, scenario: &Scenario) -> String {
        render_script(&self.config, scenario)
    }

    /// Launch the browser for `scenario`, forwarding its events into `events`.
    ///
    /// The channel closes when the driver process exits.
    pub async fn spawn_session(
        &self,
        scenario: &Scenario,
        events: mpsc::Sender<HostEvent>,
    ) -> E2eResult<DriverProcess> {
        let script = self.build_script(scenario);
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("probe.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut child = TokioCommand::new(&self.config.node_binary)
            .arg(&script_path)
            .current_dir(script_dir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdout was not captured".to_string()))?;

        let reader = tokio::spawn(async move {
            forward_events(stdout, events).await;
        });

        info!(scenario = %scenario.name, browser = self.config.browser.as_str(), "driver started");

        Ok(DriverProcess {
            child,
            reader,
            _script_dir: script_dir,
        })
    }
}

/// A running driver script
pub struct DriverProcess {
    child: Child,
    reader: JoinHandle<()>,
    _script_dir: TempDir,
}

impl DriverProcess {
    /// Wait for the script to exit; a non-zero exit becomes an error
    pub async fn wait(self) -> E2eResult<()> {
        let output = self.child.wait_with_output().await?;
        // Drain stdout fully so the event channel closes behind the last event.
        if let Err(e) = self.reader.await {
            warn!(error = %e, "driver output reader panicked");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(E2eError::Playwright(format!(
                "Script failed ({}):\nstderr: {}",
                output.status, stderr
            )));
        }
        Ok(())
    }
}

/// Forward driver output lines as events until the stream ends.
///
/// Output keeps being read after the observer goes away so the driver never
/// blocks on a full pipe. Returns the number of lines read.
async fn forward_events<R>(output: R, events: mpsc::Sender<HostEvent>) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(output);
    let mut buf = Vec::new();
    let mut forwarding = true;
    let mut lines = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => lines += 1,
            Err(e) => {
                warn!(error = %e, "failed to read driver output, stopping reader");
                break;
            }
        }
        if !forwarding {
            continue;
        }

        let line = String::from_utf8_lossy(&buf);
        match parse_host_event(&line) {
            Some(event) => {
                if events.send(event).await.is_err() {
                    debug!("observer dropped, discarding remaining driver output");
                    forwarding = false;
                }
            }
            None if line.trim().is_empty() => {}
            None => debug!(line = %line.trim_end(), "driver output"),
        }
    }

    lines
}

/// Quote a string as a JavaScript literal
fn js_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn render_script(config: &PlaywrightConfig, scenario: &Scenario) -> String {
    let mut script = String::new();

    let captures: Vec<String> = scenario
        .contracts
        .iter()
        .map(|c| js_str(&c.url_contains))
        .collect();

    // Header
    script.push_str(&format!(
        r#"
const {{ chromium, firefox, webkit }} = require('playwright');

const emit = (event) => console.log(JSON.stringify(event));
const captures = [{captures}];
const pending = [];

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const baseUrl = {base_url};

  page.on('response', (response) => {{
    pending.push((async () => {{
      await response.finished().catch(() => null);
      const timing = response.request().timing();
      const url = response.url();
      emit({{
        event: 'response',
        url,
        status: response.status(),
        timing_ms: timing && timing.responseEnd >= 0 ? timing.responseEnd : null,
      }});
      for (let i = 0; i < captures.length; i++) {{
        if (url.includes(captures[i])) {{
          try {{
            emit({{ event: 'payload', contract: i, url, body: await response.json() }});
          }} catch (e) {{
            // non-JSON bodies are not captured
          }}
        }}
      }}
    }})());
  }});

  try {{
"#,
        captures = captures.join(", "),
        browser = config.browser.as_str(),
        headless = config.headless,
        width = scenario.viewport.width,
        height = scenario.viewport.height,
        base_url = js_str(&config.base_url),
    ));

    for (i, step) in scenario.steps.iter().enumerate() {
        script.push_str(&format!("\n    // Step {}: {}\n", i + 1, step_name(step)));
        script.push_str(&step_to_js(step));
        script.push('\n');
    }

    // Footer
    script.push_str(
        r#"
    await Promise.all(pending);
    emit({ event: 'done', success: true });
  } catch (error) {
    await Promise.allSettled(pending);
    emit({ event: 'done', success: false, error: error.message });
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#,
    );

    script
}

/// Short label for a step, used in script comments and logs
pub fn step_name(step: &DriveStep) -> String {
    match step {
        DriveStep::Navigate { url, .. } => format!("navigate:{}", url),
        DriveStep::Click { selector, .. } => format!("click:{}", selector),
        DriveStep::Fill { selector, .. } => format!("fill:{}", selector),
        DriveStep::Press { key, .. } => format!("press:{}", key),
        DriveStep::Wait { selector, .. } => format!("wait:{}", selector),
        DriveStep::WaitForResponse { url_contains, .. } => format!("wait_for_response:{}", url_contains),
        DriveStep::Sleep { ms } => format!("sleep:{}ms", ms),
    }
}

fn step_to_js(step: &DriveStep) -> String {
    match step {
        DriveStep::Navigate {
            url,
            wait_for_selector,
        } => {
            let wait = wait_for_selector
                .as_ref()
                .map(|s| format!("\n    await page.waitForSelector({});", js_str(s)))
                .unwrap_or_default();
            format!("    await page.goto(baseUrl + {});{}", js_str(url), wait)
        }
        DriveStep::Click {
            selector,
            timeout_ms,
        } => format!(
            "    await page.click({}, {{ timeout: {} }});",
            js_str(selector),
            timeout_ms.unwrap_or(5000)
        ),
        DriveStep::Fill { selector, value } => {
            format!("    await page.fill({}, {});", js_str(selector), js_str(value))
        }
        DriveStep::Press { selector, key } => match selector {
            Some(sel) => format!("    await page.locator({}).press({});", js_str(sel), js_str(key)),
            None => format!("    await page.keyboard.press({});", js_str(key)),
        },
        DriveStep::Wait {
            selector,
            timeout_ms,
            state,
        } => format!(
            "    await page.waitForSelector({}, {{ state: '{}', timeout: {} }});",
            js_str(selector),
            state.as_str(),
            timeout_ms
        ),
        DriveStep::WaitForResponse {
            url_contains,
            timeout_ms,
        } => format!(
            "    await page.waitForResponse((r) => r.url().includes({}), {{ timeout: {} }});",
            js_str(url_contains),
            timeout_ms
        ),
        DriveStep::Sleep { ms } => format!("    await page.waitForTimeout({});", ms),
    }
}
