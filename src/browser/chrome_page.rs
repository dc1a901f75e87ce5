//! [`Page`] implementation over a CDP page target

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::broadcast::{self, error::RecvError};

use super::cdp::{CdpClient, CdpEvent};
use super::error::{BrowserError, BrowserResult};
use super::{scripts, ElementHandle, Page, PageEvent, ResourceType, WaitUntil};

/// Quiet period that counts as network idle after the load event
const NETWORK_QUIET: Duration = Duration::from_millis(500);

/// Object group for remote objects handed out as element handles
const OBJECT_GROUP: &str = "dyncrawl";

const QUERY_WITHIN: &str =
    "function (selector) { return Array.from(this.querySelectorAll(selector)); }";

/// A browser tab driven through its own DevTools connection
pub struct ChromePage {
    client: Arc<CdpClient>,
    events: broadcast::Sender<PageEvent>,
    pump: tokio::task::JoinHandle<()>,
}

impl ChromePage {
    /// Connects to a page target and enables the Page, Runtime and Network
    /// domains
    pub async fn connect(ws_url: &str) -> BrowserResult<Self> {
        let client = Arc::new(CdpClient::connect(ws_url).await?);
        let (events, _) = broadcast::channel(1024);
        let pump = tokio::spawn(pump_events(client.subscribe(), events.clone()));

        for domain in ["Page", "Runtime", "Network"] {
            client.enable_domain(domain).await?;
        }

        Ok(Self {
            client,
            events,
            pump,
        })
    }

    /// Turns a remote array object into element handles, in index order
    async fn handles_from_array(&self, array: &Value) -> BrowserResult<Vec<ElementHandle>> {
        let Some(object_id) = array.get("objectId").and_then(Value::as_str) else {
            return Ok(Vec::new());
        };

        let properties = self
            .client
            .send(
                "Runtime.getProperties",
                json!({ "objectId": object_id, "ownProperties": true }),
            )
            .await?;

        let mut indexed: Vec<(usize, ElementHandle)> = properties
            .get("result")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let index = entry.get("name")?.as_str()?.parse::<usize>().ok()?;
                        let id = entry.pointer("/value/objectId")?.as_str()?;
                        Some((index, ElementHandle::new(id)))
                    })
                    .collect()
            })
            .unwrap_or_default();
        indexed.sort_by_key(|(index, _)| *index);

        if let Err(e) = self
            .client
            .send("Runtime.releaseObject", json!({ "objectId": object_id }))
            .await
        {
            tracing::trace!(error = %e, "could not release query result array");
        }

        Ok(indexed.into_iter().map(|(_, handle)| handle).collect())
    }

    async fn call_function(
        &self,
        element: &ElementHandle,
        function: &str,
        args: &[Value],
        by_value: bool,
    ) -> BrowserResult<Value> {
        let arguments: Vec<Value> = args.iter().map(|v| json!({ "value": v })).collect();
        let result = self
            .client
            .send(
                "Runtime.callFunctionOn",
                json!({
                    "functionDeclaration": function,
                    "objectId": element.id(),
                    "arguments": arguments,
                    "returnByValue": by_value,
                    "awaitPromise": true,
                    "objectGroup": OBJECT_GROUP,
                }),
            )
            .await
            .map_err(|e| stale_handle(e, element))?;

        check_exception(&result)?;
        Ok(result.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn dispatch_mouse(&self, kind: &str, x: f64, y: f64) -> BrowserResult<()> {
        self.client
            .send(
                "Input.dispatchMouseEvent",
                json!({ "type": kind, "x": x, "y": y, "button": "left", "clickCount": 1 }),
            )
            .await?;
        Ok(())
    }

    async fn wait_for_load(
        events: &mut broadcast::Receiver<PageEvent>,
        wait_until: WaitUntil,
    ) {
        let mut loaded = false;
        let mut in_flight: HashSet<String> = HashSet::new();

        loop {
            if loaded && wait_until == WaitUntil::Load {
                return;
            }

            let next = if loaded && in_flight.is_empty() {
                match tokio::time::timeout(NETWORK_QUIET, events.recv()).await {
                    Ok(next) => next,
                    Err(_) => return,
                }
            } else {
                events.recv().await
            };

            match next {
                Ok(PageEvent::Loaded) => loaded = true,
                Ok(PageEvent::Request { request_id, .. }) => {
                    in_flight.insert(request_id);
                }
                Ok(PageEvent::RequestFinished { request_id, .. }) => {
                    in_flight.remove(&request_id);
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return,
            }
        }
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn goto(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> BrowserResult<()> {
        let mut events = self.events.subscribe();

        let result = self
            .client
            .send_with_timeout("Page.navigate", json!({ "url": url }), timeout)
            .await?;

        if let Some(reason) = result.get("errorText").and_then(Value::as_str) {
            return Err(BrowserError::NavigationFailed {
                reason: format!("{url}: {reason}"),
            });
        }

        // Same-document navigations have no loader and fire no load event
        if result.get("loaderId").is_none() {
            return Ok(());
        }

        tokio::time::timeout(timeout, Self::wait_for_load(&mut events, wait_until))
            .await
            .map_err(|_| BrowserError::Timeout {
                method: format!("goto {url}"),
                duration: timeout,
            })
    }

    async fn url(&self) -> BrowserResult<String> {
        let value = self.evaluate("window.location.href").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol {
                detail: "location.href did not return a string".to_string(),
            })
    }

    async fn content(&self) -> BrowserResult<String> {
        let value = self.evaluate("document.documentElement.outerHTML").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol {
                detail: "outerHTML did not return a string".to_string(),
            })
    }

    async fn evaluate(&self, expression: &str) -> BrowserResult<Value> {
        let result = self
            .client
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        check_exception(&result)?;
        Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
    }

    async fn query_selector_all(&self, selector: &str) -> BrowserResult<Vec<ElementHandle>> {
        let expression = format!(
            "Array.from(document.querySelectorAll({}))",
            Value::from(selector)
        );
        let result = self
            .client
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": false,
                    "objectGroup": OBJECT_GROUP,
                }),
            )
            .await?;

        check_exception(&result)?;
        self.handles_from_array(result.get("result").unwrap_or(&Value::Null))
            .await
    }

    async fn release_handles(&self) -> BrowserResult<()> {
        self.client
            .send(
                "Runtime.releaseObjectGroup",
                json!({ "objectGroup": OBJECT_GROUP }),
            )
            .await?;
        Ok(())
    }

    async fn query_within(
        &self,
        element: &ElementHandle,
        selector: &str,
    ) -> BrowserResult<Vec<ElementHandle>> {
        let array = self
            .call_function(element, QUERY_WITHIN, &[Value::from(selector)], false)
            .await?;
        self.handles_from_array(&array).await
    }

    async fn call_on(
        &self,
        element: &ElementHandle,
        function: &str,
        args: &[Value],
    ) -> BrowserResult<Value> {
        let result = self.call_function(element, function, args, true).await?;
        Ok(result.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn click(&self, element: &ElementHandle, timeout: Duration) -> BrowserResult<()> {
        let attempt = async {
            let point = self.call_on(element, scripts::CLICK_POINT, &[]).await?;
            if point.is_null() {
                return Err(BrowserError::ElementNotInteractable {
                    reason: "element has no size".to_string(),
                });
            }

            if !point.get("hit").and_then(Value::as_bool).unwrap_or(false) {
                return Err(BrowserError::ElementNotInteractable {
                    reason: "another element would receive the click".to_string(),
                });
            }

            let x = point.get("x").and_then(Value::as_f64).unwrap_or_default();
            let y = point.get("y").and_then(Value::as_f64).unwrap_or_default();
            self.mouse_click(x, y).await
        };

        tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| BrowserError::Timeout {
                method: "click".to_string(),
                duration: timeout,
            })?
    }

    async fn mouse_click(&self, x: f64, y: f64) -> BrowserResult<()> {
        self.dispatch_mouse("mouseMoved", x, y).await?;
        self.dispatch_mouse("mousePressed", x, y).await?;
        self.dispatch_mouse("mouseReleased", x, y).await
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> BrowserResult<()> {
        self.call_on(element, scripts::FOCUS_AND_CLEAR, &[]).await?;
        self.client
            .send("Input.insertText", json!({ "text": value }))
            .await?;
        self.call_on(element, scripts::NOTIFY_CHANGE, &[]).await?;
        Ok(())
    }

    async fn add_binding(&self, name: &str) -> BrowserResult<()> {
        self.client
            .send("Runtime.addBinding", json!({ "name": name }))
            .await?;
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<PageEvent> {
        self.events.subscribe()
    }

    async fn screenshot(&self, path: &Path) -> BrowserResult<()> {
        let result = self
            .client
            .send("Page.captureScreenshot", json!({ "format": "png" }))
            .await?;

        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol {
                detail: "Page.captureScreenshot returned no data".to_string(),
            })?;

        let bytes = B64.decode(data).map_err(|e| BrowserError::Protocol {
            detail: format!("failed to decode screenshot: {e}"),
        })?;

        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn close(&self) -> BrowserResult<()> {
        match self.client.send("Page.close", json!({})).await {
            Ok(_) | Err(BrowserError::PageClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn response_body(&self, request_id: &str) -> BrowserResult<Option<String>> {
        let result = match self
            .client
            .send("Network.getResponseBody", json!({ "requestId": request_id }))
            .await
        {
            Ok(result) => result,
            // Evicted or never buffered
            Err(BrowserError::CdpError { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let Some(body) = result.get("body").and_then(Value::as_str) else {
            return Ok(None);
        };

        if result
            .get("base64Encoded")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            Ok(B64
                .decode(body)
                .ok()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
        } else {
            Ok(Some(body.to_string()))
        }
    }
}

/// Forwards translated CDP events until the connection drops
async fn pump_events(mut cdp: broadcast::Receiver<CdpEvent>, events: broadcast::Sender<PageEvent>) {
    loop {
        match cdp.recv().await {
            Ok(event) => {
                if let Some(event) = translate_event(&event) {
                    let _ = events.send(event);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "page event pump lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn str_at<'a>(params: &'a Value, pointer: &str) -> Option<&'a str> {
    params.pointer(pointer).and_then(Value::as_str)
}

/// Maps the CDP events the crawler cares about onto [`PageEvent`]
fn translate_event(event: &CdpEvent) -> Option<PageEvent> {
    let params = &event.params;
    match event.method.as_str() {
        "Network.requestWillBeSent" => Some(PageEvent::Request {
            request_id: str_at(params, "/requestId")?.to_string(),
            url: str_at(params, "/request/url")?.to_string(),
            resource_type: ResourceType::from_cdp(str_at(params, "/type").unwrap_or("Other")),
            timestamp: Utc::now(),
        }),
        "Network.responseReceived" => Some(PageEvent::Response {
            request_id: str_at(params, "/requestId")?.to_string(),
            url: str_at(params, "/response/url")?.to_string(),
            status: params
                .pointer("/response/status")
                .and_then(Value::as_f64)
                .map(|s| s as u16)
                .unwrap_or_default(),
            resource_type: ResourceType::from_cdp(str_at(params, "/type").unwrap_or("Other")),
        }),
        "Network.loadingFinished" => Some(PageEvent::RequestFinished {
            request_id: str_at(params, "/requestId")?.to_string(),
            failed: false,
        }),
        "Network.loadingFailed" => Some(PageEvent::RequestFinished {
            request_id: str_at(params, "/requestId")?.to_string(),
            failed: true,
        }),
        "Runtime.bindingCalled" => Some(PageEvent::Binding {
            name: str_at(params, "/name")?.to_string(),
            payload: str_at(params, "/payload").unwrap_or_default().to_string(),
        }),
        "Page.frameNavigated" => {
            let frame = params.get("frame")?;
            if frame.get("parentId").is_some() {
                return None;
            }
            let url = str_at(frame, "/url")?;
            let fragment = str_at(frame, "/urlFragment").unwrap_or_default();
            Some(PageEvent::Navigated {
                url: format!("{url}{fragment}"),
            })
        }
        "Page.navigatedWithinDocument" => Some(PageEvent::Navigated {
            url: str_at(params, "/url")?.to_string(),
        }),
        "Page.loadEventFired" => Some(PageEvent::Loaded),
        _ => None,
    }
}

fn check_exception(result: &Value) -> BrowserResult<()> {
    let Some(details) = result.get("exceptionDetails") else {
        return Ok(());
    };

    let message = details
        .pointer("/exception/description")
        .and_then(Value::as_str)
        .or_else(|| details.get("text").and_then(Value::as_str))
        .unwrap_or("unknown exception")
        .to_string();

    Err(BrowserError::JsException { message })
}

/// Objects from before a navigation are gone; report them as missing elements
fn stale_handle(error: BrowserError, element: &ElementHandle) -> BrowserError {
    match error {
        BrowserError::CdpError { ref message, .. } if message.contains("Could not find object") => {
            BrowserError::ElementNotFound {
                selector: element.id().to_string(),
            }
        }
        other => other,
    }
}
