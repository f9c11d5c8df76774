//! Browser host (wasm32 only)
//!
//! Binds the guard to `window.localStorage`, `document.cookie` and real
//! `<form>` elements, and exports the JS entry points.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Event, EventTarget, HtmlDocument, HtmlFormElement, HtmlInputElement, HtmlTextAreaElement, Storage, Window};

use super::{CookieJar, Environment, KeyValueArea};
use crate::error::{Result, VapeError};
use crate::field::{FieldElement, FieldInfo, FormElement};
use crate::settings::Settings;

fn host_error(err: JsValue) -> VapeError {
    VapeError::Host(format!("{err:?}"))
}

/// Run `handler` whenever any of `events` fires on `target`
fn listen(target: &EventTarget, events: &[&str], handler: Box<dyn FnMut()>) {
    let mut handler = handler;
    let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| handler());
    for event in events {
        if let Err(err) = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
            log::warn!("VAPE: could not listen for {event}: {err:?}");
        }
    }
    // Listeners live as long as the page
    closure.forget();
}

// === Storage ===

impl KeyValueArea for Storage {
    fn get_item(&self, key: &str) -> Option<String> {
        Storage::get_item(self, key).ok().flatten()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        Storage::set_item(self, key, value).map_err(|err| VapeError::QuotaExceeded {
            key: key.to_string(),
            reason: format!("{err:?}"),
        })
    }

    fn remove_item(&self, key: &str) {
        if let Err(err) = Storage::remove_item(self, key) {
            log::warn!("VAPE: could not remove {key}: {err:?}");
        }
    }
}

/// `document.cookie` of an HTML document
pub struct DocumentCookies(HtmlDocument);

impl CookieJar for DocumentCookies {
    fn cookie_string(&self) -> String {
        self.0.cookie().unwrap_or_default()
    }

    fn set_cookie(&self, declaration: &str) {
        if let Err(err) = self.0.set_cookie(declaration) {
            log::warn!("VAPE: could not write cookie: {err:?}");
        }
    }

    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

pub struct WebEnvironment {
    window: Window,
}

impl WebEnvironment {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| VapeError::Host("no window".into()))?;
        Ok(Self { window })
    }

    fn document(&self) -> Result<Document> {
        self.window
            .document()
            .ok_or_else(|| VapeError::Host("no document".into()))
    }
}

impl Environment for WebEnvironment {
    type Area = Storage;
    type Jar = DocumentCookies;

    fn local_storage(&self) -> Option<Storage> {
        self.window.local_storage().ok().flatten()
    }

    fn cookie_jar(&self) -> Option<DocumentCookies> {
        let document = self.document().ok()?;
        document.dyn_into::<HtmlDocument>().ok().map(DocumentCookies)
    }
}

// === Forms ===

#[derive(Clone)]
pub enum WebField {
    Input(HtmlInputElement),
    TextArea(HtmlTextAreaElement),
}

impl WebField {
    fn element(&self) -> &web_sys::Element {
        match self {
            WebField::Input(input) => input,
            WebField::TextArea(area) => area,
        }
    }
}

impl FieldElement for WebField {
    fn info(&self) -> FieldInfo {
        let element = self.element();
        let id = element.get_attribute("id");
        let name = element.get_attribute("name");
        let info = match self {
            WebField::Input(input) => FieldInfo::input(&input.type_(), id.as_deref(), name.as_deref()),
            WebField::TextArea(_) => FieldInfo::textarea(id.as_deref(), name.as_deref()),
        };
        info.with_classes(element.class_name().split_whitespace())
    }

    fn value(&self) -> String {
        match self {
            WebField::Input(input) => input.value(),
            WebField::TextArea(area) => area.value(),
        }
    }

    fn set_value(&self, value: &str) {
        match self {
            WebField::Input(input) => input.set_value(value),
            WebField::TextArea(area) => area.set_value(value),
        }
    }

    fn on_change(&self, handler: Box<dyn FnMut()>) {
        listen(self.element(), &["input"], handler);
    }
}

pub struct WebForm(HtmlFormElement);

impl FormElement for WebForm {
    type Field = WebField;

    fn id(&self) -> Option<String> {
        self.0.get_attribute("id")
    }

    fn candidate_fields(&self) -> Vec<WebField> {
        let nodes = match self.0.query_selector_all("input, textarea") {
            Ok(nodes) => nodes,
            Err(err) => {
                log::warn!("VAPE: could not list fields: {err:?}");
                return Vec::new();
            }
        };

        (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| match node.dyn_into::<HtmlInputElement>() {
                Ok(input) => Some(WebField::Input(input)),
                Err(node) => node.dyn_into::<HtmlTextAreaElement>().ok().map(WebField::TextArea),
            })
            .collect()
    }

    fn on_release(&self, handler: Box<dyn FnMut()>) {
        listen(&self.0, &["submit", "reset"], handler);
    }
}

// === JS exports ===

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    // Another module may already have installed a logger
    let _ = console_log::init_with_level(log::Level::Info);
}

fn parse_options(options: Option<String>) -> Result<Settings> {
    options.as_deref().map_or_else(|| Ok(Settings::default()), Settings::from_json)
}

fn protect_with(env: &WebEnvironment, form: HtmlFormElement, settings: &Settings) -> bool {
    crate::guard::protect(env, &WebForm(form), settings).is_ok()
}

/// Protect one form. Resolves to `false` when no storage can be used.
#[wasm_bindgen(js_name = protect)]
pub fn protect_form(form: HtmlFormElement, options: Option<String>) -> std::result::Result<bool, JsValue> {
    let settings = parse_options(options).map_err(|err| JsValue::from_str(&err.to_string()))?;
    let env = WebEnvironment::new().map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(protect_with(&env, form, &settings))
}

/// Protect every form matching `selector`. Returns how many are protected.
#[wasm_bindgen(js_name = protectAll)]
pub fn protect_all(selector: &str, options: Option<String>) -> std::result::Result<u32, JsValue> {
    let run = || -> Result<u32> {
        let settings = parse_options(options)?;
        let env = WebEnvironment::new()?;
        let nodes = env.document()?.query_selector_all(selector).map_err(host_error)?;

        let forms = (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| match node.dyn_into::<HtmlFormElement>() {
                Ok(form) => Some(WebForm(form)),
                Err(_) => {
                    log::warn!("VAPE: {selector:?} matched a non-form element");
                    None
                }
            });
        Ok(crate::guard::protect_each(&env, forms, &settings))
    };
    run().map_err(|err| JsValue::from_str(&err.to_string()))
}
