//! Registration modal.

use crate::app::App;
use crate::{dashboard, dom, notify};

/// Show the modal, prefilled with a captured referral sponsor.
pub fn open(app: &App) {
    let els = &app.els;
    if dom::get_input_value(&els.sponsor_input).is_empty() {
        if let Some(sponsor) = app.registration.pending_sponsor() {
            els.sponsor_input.set_value(&sponsor);
        }
    }
    dom::set_text(&els.register_error, "");
    dom::set_visible(&els.register_modal, true);
}

pub fn close(app: &App) {
    dom::set_visible(&app.els.register_modal, false);
}

pub async fn on_register(app: &App) {
    let els = &app.els;
    let Some(address) = app.wallet.address() else {
        dom::set_text(&els.register_error, "Connect a wallet first");
        return;
    };
    let input = dom::get_input_value(&els.sponsor_input);

    dom::set_disabled(&els.register_btn, true);
    let result = app
        .registration
        .register(&*app.contracts, address, &input)
        .await;
    dom::set_disabled(&els.register_btn, false);

    match result {
        Ok(_) => {
            close(app);
            notify::success(els, "Registration complete");
            dashboard::refresh(app).await;
        }
        Err(err) if err.is_user_rejected() => {}
        Err(err) => {
            dom::set_text(&els.register_error, &err.to_string());
            notify::failure(els, "Registration", &err);
        }
    }
}
