//! Browser automation boundary
//!
//! The crawler drives pages only through the [`Browser`] and [`Page`]
//! traits. [`ChromeBrowser`] implements them over the Chrome DevTools
//! Protocol; tests substitute an in-memory fake.

mod cdp;
mod chrome;
mod chrome_page;
mod error;
pub mod scripts;

pub use cdp::{CdpClient, CdpEvent};
pub use chrome::{find_chrome_executable, ChromeBrowser, LaunchOptions};
pub use chrome_page::ChromePage;
pub use error::{BrowserError, BrowserResult};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;

/// Opaque reference to a DOM element on one page
///
/// Handles are only valid until the page navigates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Element rectangle in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// What the page reports about one element
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ElementSnapshot {
    /// Lowercase tag name
    pub tag: String,

    /// Rendered text (falls back to `value` for inputs)
    pub text: String,

    pub attributes: BTreeMap<String, String>,

    pub visible: bool,

    pub disabled: bool,

    /// Computed `cursor` style
    pub cursor: String,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// The load event fired
    Load,
    /// The load event fired and the network went quiet
    NetworkIdle,
}

/// Resource type of a network request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceType {
    Document,
    Xhr,
    Fetch,
    Other(String),
}

impl ResourceType {
    /// Maps a CDP `Network.ResourceType` name
    pub fn from_cdp(name: &str) -> Self {
        match name {
            "Document" => Self::Document,
            "XHR" => Self::Xhr,
            "Fetch" => Self::Fetch,
            other => Self::Other(other.to_string()),
        }
    }

    /// True for script-initiated XHR/fetch traffic
    pub fn is_ajax(&self) -> bool {
        matches!(self, Self::Xhr | Self::Fetch)
    }
}

/// Events a page emits to subscribers
#[derive(Debug, Clone)]
pub enum PageEvent {
    Request {
        request_id: String,
        url: String,
        resource_type: ResourceType,
        timestamp: DateTime<Utc>,
    },
    Response {
        request_id: String,
        url: String,
        status: u16,
        resource_type: ResourceType,
    },
    RequestFinished {
        request_id: String,
        failed: bool,
    },
    /// A page script called an exposed binding
    Binding { name: String, payload: String },
    /// The main frame committed a new URL (including same-document changes)
    Navigated { url: String },
    Loaded,
}

/// A single browser tab
///
/// Required methods map onto primitive automation commands. Provided
/// methods are built from them with in-page scripts, so an implementation
/// only overrides them when it has a better native path.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigates and waits according to `wait_until`
    async fn goto(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> BrowserResult<()>;

    /// Current main-frame URL
    async fn url(&self) -> BrowserResult<String>;

    /// Serialized DOM
    async fn content(&self) -> BrowserResult<String>;

    /// Evaluates an expression and returns its JSON value
    async fn evaluate(&self, expression: &str) -> BrowserResult<Value>;

    async fn query_selector_all(&self, selector: &str) -> BrowserResult<Vec<ElementHandle>>;

    /// Queries descendants of `element`
    async fn query_within(
        &self,
        element: &ElementHandle,
        selector: &str,
    ) -> BrowserResult<Vec<ElementHandle>>;

    /// Calls a function declaration with `this` bound to `element`
    async fn call_on(
        &self,
        element: &ElementHandle,
        function: &str,
        args: &[Value],
    ) -> BrowserResult<Value>;

    /// Trusted click that fails if the element is covered or not ready in time
    async fn click(&self, element: &ElementHandle, timeout: Duration) -> BrowserResult<()>;

    /// Pointer click at viewport coordinates
    async fn mouse_click(&self, x: f64, y: f64) -> BrowserResult<()>;

    /// Replaces the element's value as if typed
    async fn fill(&self, element: &ElementHandle, value: &str) -> BrowserResult<()>;

    /// Exposes `window[name](payload)` which surfaces as [`PageEvent::Binding`]
    async fn add_binding(&self, name: &str) -> BrowserResult<()>;

    /// Subscribes to events emitted from now on
    fn events(&self) -> broadcast::Receiver<PageEvent>;

    /// Writes a PNG of the viewport
    async fn screenshot(&self, path: &Path) -> BrowserResult<()>;

    async fn close(&self) -> BrowserResult<()>;

    /// Invalidates every element handle handed out so far
    async fn release_handles(&self) -> BrowserResult<()> {
        Ok(())
    }

    /// Body of a finished response, if the backend can fetch it
    async fn response_body(&self, _request_id: &str) -> BrowserResult<Option<String>> {
        Ok(None)
    }

    async fn describe(&self, element: &ElementHandle) -> BrowserResult<ElementSnapshot> {
        let value = self.call_on(element, scripts::DESCRIBE, &[]).await?;
        serde_json::from_value(value).map_err(|e| BrowserError::Protocol {
            detail: format!("unexpected element description: {e}"),
        })
    }

    async fn is_visible(&self, element: &ElementHandle) -> BrowserResult<bool> {
        let value = self.call_on(element, scripts::IS_VISIBLE, &[]).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn bounding_box(&self, element: &ElementHandle) -> BrowserResult<Option<BoundingBox>> {
        let value = self.call_on(element, scripts::BOUNDING_BOX, &[]).await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| BrowserError::Protocol {
                detail: format!("unexpected bounding box: {e}"),
            })
    }

    async fn check(&self, element: &ElementHandle) -> BrowserResult<()> {
        self.call_on(element, scripts::CHECK, &[]).await?;
        Ok(())
    }

    /// Assigns `value` directly, for fields that cannot be typed into
    async fn set_value(&self, element: &ElementHandle, value: &str) -> BrowserResult<()> {
        self.call_on(element, scripts::SET_VALUE, &[Value::from(value)])
            .await?;
        Ok(())
    }

    async fn select_first_option(&self, element: &ElementHandle) -> BrowserResult<()> {
        self.call_on(element, scripts::SELECT_FIRST_OPTION, &[]).await?;
        Ok(())
    }

    /// Script-dispatched click event
    async fn dispatch_click(&self, element: &ElementHandle) -> BrowserResult<()> {
        self.call_on(element, scripts::DISPATCH_CLICK, &[]).await?;
        Ok(())
    }

    async fn submit_form(&self, form: &ElementHandle) -> BrowserResult<()> {
        self.call_on(form, scripts::SUBMIT_FORM, &[]).await?;
        Ok(())
    }

    /// Document loaded, nothing `aria-busy`, no visible spinner
    async fn framework_ready(&self) -> BrowserResult<bool> {
        let value = self.evaluate(scripts::FRAMEWORK_READY).await?;
        Ok(value.as_bool().unwrap_or(true))
    }

    async fn dismiss_overlays(&self) -> BrowserResult<()> {
        self.evaluate(scripts::DISMISS_OVERLAYS).await?;
        Ok(())
    }

    /// Installs the mutation/route/network observer reporting through
    /// `binding` with `token`
    async fn install_observer(&self, binding: &str, token: &str) -> BrowserResult<()> {
        let expression = format!(
            "({})({}, {})",
            scripts::OBSERVER,
            Value::from(binding),
            Value::from(token)
        );
        self.evaluate(&expression).await?;
        Ok(())
    }
}

/// Builds `tag[name="value"]` with the value escaped for CSS
pub fn attr_selector(tag: &str, name: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{}[{}=\"{}\"]", tag, name, escaped)
}

/// A browser able to open isolated pages
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>>;

    async fn close(&self) -> BrowserResult<()>;
}
