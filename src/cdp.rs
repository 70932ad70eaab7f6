//! Chrome DevTools Protocol rasterizer
//!
//! Loads the export document into a headless Chrome tab, waits (bounded) for
//! its images to settle, measures the export root and captures the whole root
//! in one clipped screenshot at the configured scale.

use crate::rendering::layout::EXPORT_ROOT_ID;
use crate::rendering::{Rasterizer, Screenshot};
use crate::{Error, ExportConfig, Result};
use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// Resolves once every image has loaded or errored, or after the timeout.
const WAIT_FOR_IMAGES_JS: &str = r#"
new Promise(function (resolve) {
  var images = Array.prototype.slice.call(document.images);
  if (!images.length) { resolve(0); return; }
  var settled = 0;
  var done = function () { settled += 1; if (settled >= images.length) resolve(settled); };
  setTimeout(function () { resolve(settled); }, __TIMEOUT__);
  images.forEach(function (img) {
    if (img.complete && img.naturalWidth > 0) { done(); return; }
    img.addEventListener('load', done, { once: true });
    img.addEventListener('error', done, { once: true });
  });
})
"#;

/// CDP-backed rasterizer (uses the `headless_chrome` crate)
///
/// The browser is launched once and reused for every capture.
pub struct CdpRasterizer {
    _browser: Browser,
    tab: Arc<Tab>,
    ready_timeout_ms: u64,
    image_timeout_ms: u64,
}

impl CdpRasterizer {
    pub fn new(config: &ExportConfig) -> Result<Self> {
        let window_height = config.geometry.page_height;
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.geometry.page_width, window_height)))
            .build()
            .map_err(|e| Error::CdpError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::CdpError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::CdpError(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| Error::CdpError(format!("Failed to set user agent: {}", e)))?;

        tab.set_default_timeout(Duration::from_millis(config.ready_timeout_ms));

        Ok(Self {
            _browser: browser,
            tab,
            ready_timeout_ms: config.ready_timeout_ms,
            image_timeout_ms: config.image_timeout_ms,
        })
    }

    fn load(&self, document_html: &str) -> Result<()> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(document_html.as_bytes());
        let url = format!("data:text/html;charset=utf-8;base64,{}", encoded);
        self.tab
            .navigate_to(&url)
            .map_err(|e| Error::CdpError(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::CdpError(format!("Wait for navigation failed: {}", e)))?;
        self.tab
            .wait_for_element_with_custom_timeout(
                &format!("#{}", EXPORT_ROOT_ID),
                Duration::from_millis(self.ready_timeout_ms),
            )
            .map_err(|_| Error::Timeout(self.ready_timeout_ms))?;
        Ok(())
    }

    fn wait_for_images(&self) {
        let script = WAIT_FOR_IMAGES_JS.replace("__TIMEOUT__", &self.image_timeout_ms.to_string());
        // image failures are tolerated; the capture proceeds either way
        match self.tab.evaluate(&script, true) {
            Ok(res) => debug!("images settled: {:?}", res.value),
            Err(e) => warn!("waiting for images failed: {}", e),
        }
    }

    fn measure_root(&self) -> Result<(f64, f64)> {
        let script = format!(
            "(function(){{var r=document.getElementById('{}');return JSON.stringify(r?[r.scrollWidth,Math.ceil(r.scrollHeight)]:null);}})()",
            EXPORT_ROOT_ID
        );
        let res = self
            .tab
            .evaluate(&script, false)
            .map_err(|e| Error::CdpError(format!("Evaluation failed: {}", e)))?;
        let dims = res
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(|s| serde_json::from_str::<Option<(f64, f64)>>(s).ok())
            .flatten()
            .ok_or_else(|| Error::RenderError("export root not found in page".into()))?;
        Ok(dims)
    }
}

impl Rasterizer for CdpRasterizer {
    fn rasterize(&mut self, document_html: &str, width: u32, scale: f32) -> Result<Screenshot> {
        self.load(document_html)?;
        self.wait_for_images();
        let (root_width, root_height) = self.measure_root()?;
        if root_height <= 0.0 {
            return Err(Error::EmptySource);
        }
        debug!("export root measures {}x{}", root_width, root_height);

        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: f64::from(width),
            height: root_height,
            scale: f64::from(scale),
        };
        let data = self
            .tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))?;
        Screenshot::from_bytes(data)
    }
}
