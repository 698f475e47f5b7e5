//! Toast notifications.

use crate::dom::{self, Elements};
use gloo_timers::callback::Timeout;
use gw_contracts::{AdminError, ContractError};
use gw_registration::RegistrationError;
use gw_wallet_core::WalletError;
use std::fmt::Display;
use tracing::{info, warn};

const TOAST_MS: u32 = 5_000;

/// Errors the UI reports; wallet rejections stay silent.
pub trait Reportable: Display {
    fn rejected_by_user(&self) -> bool;
}

impl Reportable for ContractError {
    fn rejected_by_user(&self) -> bool {
        self.is_user_rejected()
    }
}

impl Reportable for AdminError {
    fn rejected_by_user(&self) -> bool {
        self.is_user_rejected()
    }
}

impl Reportable for RegistrationError {
    fn rejected_by_user(&self) -> bool {
        self.is_user_rejected()
    }
}

impl Reportable for WalletError {
    fn rejected_by_user(&self) -> bool {
        self.is_user_rejected()
    }
}

fn toast(els: &Elements, class: &str, message: &str) {
    let Ok(el) = dom::create_with_text("div", &format!("toast {class}"), message) else {
        return;
    };
    if els.toast_container.append_child(&el).is_err() {
        return;
    }
    Timeout::new(TOAST_MS, move || el.remove()).forget();
}

pub fn success(els: &Elements, message: &str) {
    info!("{message}");
    toast(els, "toast-success", message);
}

pub fn warning(els: &Elements, message: &str) {
    warn!("{message}");
    toast(els, "toast-warning", message);
}

pub fn failure<E: Reportable>(els: &Elements, action: &str, err: &E) {
    if err.rejected_by_user() {
        info!("{action}: rejected in wallet");
        return;
    }
    warn!("{action} failed: {err}");
    toast(els, "toast-error", &format!("{action}: {err}"));
}
