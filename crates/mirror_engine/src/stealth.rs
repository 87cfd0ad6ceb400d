//! Page setup that hides the usual automation tells.
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;

use crate::{FailureKind, FetchError};

const MASK_WEBDRIVER: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => false, configurable: true });
"#;

const CHROME_RUNTIME: &str = r#"
if (!window.chrome) { window.chrome = {}; }
if (!window.chrome.runtime) { window.chrome.runtime = {}; }
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthSettings {
    pub spoof_webgl: bool,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
}

impl Default for StealthSettings {
    fn default() -> Self {
        Self {
            spoof_webgl: true,
            webgl_vendor: "Intel Open Source Technology Center".to_string(),
            webgl_renderer: "Mesa DRI Intel(R) HD Graphics 4000".to_string(),
        }
    }
}

/// Scripts injected before any document script runs, in order.
pub fn stealth_scripts(settings: &StealthSettings) -> Vec<String> {
    let mut scripts = vec![MASK_WEBDRIVER.to_string(), CHROME_RUNTIME.to_string()];
    if settings.spoof_webgl {
        // 37445 / 37446 are UNMASKED_VENDOR_WEBGL / UNMASKED_RENDERER_WEBGL.
        scripts.push(format!(
            r#"
(() => {{
  const patch = (proto) => {{
    if (!proto) return;
    const getParameter = proto.getParameter;
    proto.getParameter = function (parameter) {{
      if (parameter === 37445) return {vendor};
      if (parameter === 37446) return {renderer};
      return getParameter.call(this, parameter);
    }};
  }};
  patch(window.WebGLRenderingContext && WebGLRenderingContext.prototype);
  patch(window.WebGL2RenderingContext && WebGL2RenderingContext.prototype);
}})();
"#,
            vendor = js_string(&settings.webgl_vendor),
            renderer = js_string(&settings.webgl_renderer),
        ));
    }
    scripts
}

/// Set the user agent and register the stealth scripts on a fresh page.
pub(crate) async fn prepare_page(
    page: &Page,
    user_agent: &str,
    settings: &StealthSettings,
) -> Result<(), FetchError> {
    page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
        .await
        .map_err(browser_error)?;
    for source in stealth_scripts(settings) {
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(source))
            .await
            .map_err(browser_error)?;
    }
    Ok(())
}

pub(crate) fn browser_error(err: chromiumoxide::error::CdpError) -> FetchError {
    FetchError::new(FailureKind::Browser, err.to_string())
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webgl_patch_is_optional_and_escaped() {
        let plain = stealth_scripts(&StealthSettings {
            spoof_webgl: false,
            ..StealthSettings::default()
        });
        assert_eq!(plain.len(), 2);
        assert!(plain[0].contains("webdriver"));

        let spoofed = stealth_scripts(&StealthSettings {
            webgl_vendor: "Quote\"Vendor".to_string(),
            ..StealthSettings::default()
        });
        assert_eq!(spoofed.len(), 3);
        assert!(spoofed[2].contains(r#""Quote\"Vendor""#));
    }
}
