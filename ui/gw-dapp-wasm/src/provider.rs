//! Browser bindings for injected wallets (`window.ethereum` and friends) and the
//! host capabilities the session manager needs.

use async_trait::async_trait;
use gw_chain_client::{Eip1193Provider, ProviderError, Timer, codes};
use gw_wallet_core::{Injected, NAMED_GLOBALS, WalletFlags, WalletHost, select_provider};
use js_sys::{Array, Function, JSON, Object, Promise, Reflect};
use serde_json::Value;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// An injected wallet object behind the EIP-1193 request surface.
pub struct InjectedProvider {
    ethereum: JsValue,
}

impl InjectedProvider {
    /// Look at every injection point once and pick a provider.
    pub fn detect() -> Option<Self> {
        let window: JsValue = web_sys::window()?.into();
        let (ethereum, point) = select_provider(snapshot(&window))?;
        debug!("wallet provider found at {point:?}");
        Some(Self { ethereum })
    }

    fn method(&self, name: &str) -> Result<Function, ProviderError> {
        Reflect::get(&self.ethereum, &JsValue::from_str(name))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| ProviderError::internal(format!("provider has no {name}()")))
    }

    /// Subscribe to a provider event for the lifetime of the page.
    pub fn on<F>(&self, event: &str, mut callback: F) -> Result<(), ProviderError>
    where
        F: FnMut(Value) + 'static,
    {
        let on = self.method("on")?;
        let closure = Closure::wrap(Box::new(move |payload: JsValue| {
            callback(from_js(&payload));
        }) as Box<dyn FnMut(JsValue)>);
        on.call2(
            &self.ethereum,
            &JsValue::from_str(event),
            closure.as_ref().unchecked_ref(),
        )
        .map_err(provider_error)?;
        closure.forget();
        Ok(())
    }
}

fn to_js(value: &Value) -> Result<JsValue, ProviderError> {
    JSON::parse(&value.to_string())
        .map_err(|_| ProviderError::internal("request params are not valid JSON"))
}

fn from_js(value: &JsValue) -> Value {
    if value.is_undefined() {
        return Value::Null;
    }
    JSON::stringify(value)
        .ok()
        .and_then(|s| s.as_string())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(Value::Null)
}

fn has_request(candidate: &JsValue) -> bool {
    field(candidate, "request").is_some_and(|f| f.is_function())
}

fn flags_of(candidate: &JsValue) -> WalletFlags {
    WalletFlags::from_lookup(|property| {
        field(candidate, property).and_then(|v| v.as_bool()).unwrap_or(false)
    })
}

fn snapshot(window: &JsValue) -> Injected<JsValue> {
    let named = NAMED_GLOBALS.iter().find_map(|name| {
        field(window, name)
            .filter(has_request)
            .map(|provider| (*name, provider))
    });

    let ethereum = field(window, "ethereum").filter(has_request);
    let providers = ethereum
        .as_ref()
        .and_then(|eth| field(eth, "providers"))
        .filter(Array::is_array)
        .map(|list| {
            Array::from(&list)
                .iter()
                .filter(has_request)
                .map(|provider| {
                    let flags = flags_of(&provider);
                    (provider, flags)
                })
                .collect()
        })
        .unwrap_or_default();

    Injected {
        named,
        providers,
        ethereum: ethereum.map(|eth| {
            let flags = flags_of(&eth);
            (eth, flags)
        }),
    }
}

fn field(value: &JsValue, name: &str) -> Option<JsValue> {
    Reflect::get(value, &JsValue::from_str(name))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

/// Wallet errors arrive as `{ code, message, data }` objects.
fn provider_error(err: JsValue) -> ProviderError {
    let code = field(&err, "code")
        .and_then(|c| c.as_f64())
        .map(|c| c as i64)
        .unwrap_or(codes::INTERNAL);
    let message = field(&err, "message")
        .and_then(|m| m.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| "wallet request failed".to_string());
    let data = field(&err, "data").map(|d| from_js(&d));
    ProviderError { code, message, data }
}

#[async_trait(?Send)]
impl Eip1193Provider for InjectedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let request = self.method("request")?;
        let args = Object::new();
        Reflect::set(&args, &JsValue::from_str("method"), &JsValue::from_str(method))
            .map_err(provider_error)?;
        Reflect::set(&args, &JsValue::from_str("params"), &to_js(&params)?)
            .map_err(provider_error)?;

        let promise: Promise = request
            .call1(&self.ethereum, &args)
            .map_err(provider_error)?
            .dyn_into()
            .map_err(|_| ProviderError::internal("request() did not return a promise"))?;
        let result = JsFuture::from(promise).await.map_err(provider_error)?;
        Ok(from_js(&result))
    }
}

/// Browser timers through `gloo-timers`.
pub struct BrowserTimer;

#[async_trait(?Send)]
impl Timer for BrowserTimer {
    async fn sleep(&self, duration: Duration) {
        gloo_timers::future::sleep(duration).await;
    }
}

pub struct BrowserHost;

const MOBILE_MARKERS: [&str; 5] = ["android", "iphone", "ipad", "ipod", "mobile"];

impl WalletHost for BrowserHost {
    type Provider = InjectedProvider;

    fn detect_provider(&self) -> Option<Rc<InjectedProvider>> {
        InjectedProvider::detect().map(Rc::new)
    }

    fn is_mobile(&self) -> bool {
        let agent = web_sys::window()
            .and_then(|w| w.navigator().user_agent().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        MOBILE_MARKERS.iter().any(|marker| agent.contains(marker))
    }

    fn page_url(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().href().ok())
            .unwrap_or_default()
    }

    fn open_url(&self, url: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.location().set_href(url);
        }
    }

    fn timer(&self) -> Rc<dyn Timer> {
        Rc::new(BrowserTimer)
    }
}
