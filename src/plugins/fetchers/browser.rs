use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::time::{Duration, Instant};

use crate::classifier::STOCK_PHRASES;
use crate::config::FetcherConfig;
use crate::plugins::traits::{ContentFetcher, PageContent, PageElement};
use crate::utils::error::FetchError;

/// Collects every element whose own text mentions a stock phrase, with the
/// state the classifier needs. Returned as a JSON string so it survives the
/// DevTools round trip by value.
const COLLECT_ELEMENTS_JS: &str = r#"
(function(phrases) {
    const found = [];
    for (const el of document.querySelectorAll('body *')) {
        let own = '';
        for (const node of el.childNodes) {
            if (node.nodeType === Node.TEXT_NODE) {
                own += ' ' + node.textContent;
            }
        }
        const text = own.toLowerCase().replace(/\s+/g, ' ').trim();
        if (!phrases.some(p => text.includes(p))) {
            continue;
        }
        let background = null;
        let hiddenByStyle = false;
        try {
            const style = window.getComputedStyle(el);
            background = style.backgroundColor;
            hiddenByStyle = style.visibility === 'hidden' || style.display === 'none';
        } catch (e) {
            background = null;
        }
        const rendered = !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
        found.push({
            tag: el.tagName.toLowerCase(),
            text: text,
            enabled: !el.disabled,
            visible: rendered && !hiddenByStyle,
            disabledAttr: el.hasAttribute('disabled'),
            ariaDisabled: el.getAttribute('aria-disabled'),
            backgroundColor: background
        });
    }
    return JSON.stringify(found);
})(PHRASES)
"#;

/// Renders pages in a headless Chrome instance launched for each fetch.
///
/// A fresh browser per fetch keeps one misbehaving page from affecting the
/// next poll; the process is torn down when the `Browser` is dropped.
pub struct BrowserFetcher {
    config: FetcherConfig,
}

impl BrowserFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    fn launch_options(&self, timeout: Duration) -> Result<LaunchOptions<'static>, FetchError> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .window_size(Some((self.config.window_width, self.config.window_height)))
            .idle_browser_timeout(timeout + Duration::from_secs(5))
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
                std::ffi::OsStr::new("--disable-blink-features=AutomationControlled"),
            ])
            .build()
            .map_err(|e| {
                FetchError::RenderingEngineError(format!("Failed to create launch options: {}", e))
            })?;

        // Set Chrome path if provided
        if let Some(chrome_path) = &self.config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        Ok(launch_options)
    }

    /// Renders `url` and tears the browser down before `deadline`, whatever stage hangs.
    fn render(
        options: LaunchOptions<'static>,
        url: &str,
        user_agent: &str,
        deadline: Instant,
        settle: Duration,
    ) -> Result<PageContent, FetchError> {
        let browser = Browser::new(options)
            .map_err(|e| FetchError::RenderingEngineError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| FetchError::RenderingEngineError(format!("Failed to create tab: {}", e)))?;

        let result = Self::render_in_tab(&tab, url, user_agent, deadline, settle);

        // Close tab to free resources; the browser process goes with `browser`.
        let _ = tab.close(true);
        drop(browser);

        result
    }

    fn render_in_tab(
        tab: &Tab,
        url: &str,
        user_agent: &str,
        deadline: Instant,
        settle: Duration,
    ) -> Result<PageContent, FetchError> {
        // Every wait only gets what is left of the overall budget
        tab.set_default_timeout(time_left(deadline)?);
        tab.set_user_agent(user_agent, Some("en-US,en;q=0.9"), None)
            .map_err(|e| FetchError::RenderingEngineError(format!("Failed to set user agent: {}", e)))?;

        tab.navigate_to(url).map_err(map_navigation_error)?;
        tab.set_default_timeout(time_left(deadline)?);
        tab.wait_until_navigated().map_err(map_navigation_error)?;
        tab.wait_for_element_with_custom_timeout("body", time_left(deadline)?)
            .map_err(map_navigation_error)?;

        // Give page scripts time to inject dynamic markup
        std::thread::sleep(settle.min(time_left(deadline)?));
        tab.set_default_timeout(time_left(deadline)?);

        let html = tab
            .get_content()
            .map_err(|e| FetchError::RenderingEngineError(format!("Failed to get page content: {}", e)))?;
        let elements = Self::collect_elements(tab)?;

        let final_url = {
            let current = tab.get_url();
            if current.is_empty() {
                url.to_string()
            } else {
                current
            }
        };

        Ok(PageContent::new(final_url, &html, elements))
    }

    fn collect_elements(tab: &Tab) -> Result<Vec<PageElement>, FetchError> {
        let phrases = serde_json::to_string(&STOCK_PHRASES)
            .map_err(|e| FetchError::RenderingEngineError(e.to_string()))?;
        let script = COLLECT_ELEMENTS_JS.replace("PHRASES", &phrases);

        let result = tab
            .evaluate(&script, false)
            .map_err(|e| FetchError::RenderingEngineError(format!("Element query failed: {}", e)))?;

        let raw = result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::RenderingEngineError("Element query returned no data".into()))?;

        serde_json::from_str(raw).map_err(|e| {
            FetchError::RenderingEngineError(format!("Failed to parse element query result: {}", e))
        })
    }
}

fn time_left(deadline: Instant) -> Result<Duration, FetchError> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
        .ok_or(FetchError::Timeout)
}

fn map_navigation_error(err: impl std::fmt::Display) -> FetchError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        FetchError::Timeout
    } else {
        FetchError::RenderingEngineError(format!("Page load failed: {}", message))
    }
}

#[async_trait]
impl ContentFetcher for BrowserFetcher {
    fn name(&self) -> &str {
        "browser"
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<PageContent, FetchError> {
        let options = self.launch_options(timeout)?;
        let url = url.to_string();
        let user_agent = self.config.user_agent.clone();
        let settle = self.config.settle_delay();
        let deadline = Instant::now() + timeout;

        // headless_chrome is blocking; if the caller gives up, the render keeps
        // running on the blocking pool until `deadline` and then closes its tab and browser.
        tokio::task::spawn_blocking(move || Self::render(options, &url, &user_agent, deadline, settle))
            .await
            .map_err(|e| FetchError::Other(format!("Render task failed: {}", e)))?
    }
}
