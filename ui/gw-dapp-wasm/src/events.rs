//! Event binding.
//!
//! Wires all UI event listeners. Async handlers receive the shared `App`
//! and run via `wasm_bindgen_futures::spawn_local`.

use crate::app::App;
use crate::dom::{self, Elements};
use crate::{admin_panel, dashboard, matrix_view, notify, registration, state, token};
use gw_api_types::RewardPool;
use gw_wallet_core::WalletError;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

/// Attach an async click handler taking `&App`.
macro_rules! on_click_async {
    ($el:expr, $app:expr, $handler:expr) => {{
        let app = Rc::clone($app);
        let cb = Closure::wrap(Box::new(move |_: web_sys::MouseEvent| {
            let app = Rc::clone(&app);
            spawn_local(async move {
                $handler(&app).await;
            });
        }) as Box<dyn FnMut(_)>);
        $el.add_event_listener_with_callback("click", cb.as_ref().unchecked_ref())?;
        cb.forget();
    }};
}

/// Attach a sync listener for `$event`.
macro_rules! on_event {
    ($el:expr, $event:expr, $cb:expr) => {{
        let cb = Closure::wrap(Box::new($cb) as Box<dyn FnMut(web_sys::Event)>);
        $el.add_event_listener_with_callback($event, cb.as_ref().unchecked_ref())?;
        cb.forget();
    }};
}

/// Bind all UI event listeners. Call once after init.
pub fn bind_events(app: &Rc<App>) -> Result<(), JsValue> {
    let els = &app.els;

    // ── Tabs ──
    for tab in &els.tabs {
        let tab_name = tab.get_attribute("data-tab").unwrap_or_default();
        let app2 = Rc::clone(app);
        on_event!(tab, "click", move |_: web_sys::Event| {
            set_active_tab(&app2.els, &tab_name);
            let app3 = Rc::clone(&app2);
            let name = tab_name.clone();
            spawn_local(async move {
                match name.as_str() {
                    "matrix" => matrix_view::render(&app3).await,
                    "token" => token::refresh(&app3).await,
                    "admin" => admin_panel::refresh(&app3).await,
                    _ => {}
                }
            });
        });
    }

    // ── Wallet ──
    on_click_async!(els.connect_btn, app, on_connect);
    on_click_async!(els.disconnect_btn, app, on_disconnect);
    {
        let app2 = Rc::clone(app);
        on_event!(els.language_select, "change", move |_: web_sys::Event| {
            let language = dom::get_select_value(&app2.els.language_select);
            apply_language(&language);
            if let Err(err) = app2.wallet.store().set_language(&language) {
                tracing::warn!("language not saved: {err}");
            }
        });
    }

    // ── Dashboard ──
    on_click_async!(els.pay_quarterly_btn, app, dashboard::on_pay_quarterly);
    on_click_async!(els.copy_referral_btn, app, dashboard::on_copy_referral);
    on_click_async!(els.claim_leader_btn, app, claim_leader);
    on_click_async!(els.claim_investment_btn, app, claim_investment);
    on_click_async!(els.claim_marketing_btn, app, claim_marketing);
    {
        let app2 = Rc::clone(app);
        on_event!(els.levels_grid, "click", move |event: web_sys::Event| {
            let Some(level) = dom::closest_with_attr(event.target(), "data-level")
                .and_then(|el| el.get_attribute("data-level"))
                .and_then(|raw| raw.parse::<u8>().ok())
            else {
                return;
            };
            let app3 = Rc::clone(&app2);
            spawn_local(async move {
                dashboard::on_buy_level(&app3, level).await;
            });
        });
    }

    // ── Matrix ──
    {
        let app2 = Rc::clone(app);
        on_event!(els.matrix_level_select, "change", move |_: web_sys::Event| {
            let app3 = Rc::clone(&app2);
            spawn_local(async move {
                matrix_view::on_level_change(&app3).await;
            });
        });
    }
    {
        let app2 = Rc::clone(app);
        on_event!(els.matrix_depth_select, "change", move |_: web_sys::Event| {
            let app3 = Rc::clone(&app2);
            spawn_local(async move {
                matrix_view::on_depth_change(&app3).await;
            });
        });
    }
    on_click_async!(els.matrix_home_btn, app, matrix_view::on_home);
    {
        let app2 = Rc::clone(app);
        on_event!(els.matrix_tree, "click", move |event: web_sys::Event| {
            let Some(global) = dom::closest_with_attr(event.target(), "data-global")
                .and_then(|el| el.get_attribute("data-global"))
                .and_then(|raw| raw.parse::<u64>().ok())
            else {
                return;
            };
            let app3 = Rc::clone(&app2);
            spawn_local(async move {
                matrix_view::on_navigate(&app3, global).await;
            });
        });
    }

    // ── Token ──
    on_click_async!(els.token_buy_btn, app, token::on_buy);
    on_click_async!(els.token_sell_btn, app, token::on_sell);
    on_click_async!(els.token_transfer_btn, app, token::on_transfer);

    // ── Registration ──
    on_click_async!(els.register_btn, app, registration::on_register);
    {
        let app2 = Rc::clone(app);
        on_event!(els.register_close_btn, "click", move |_: web_sys::Event| {
            registration::close(&app2);
        });
    }

    // ── Admin ──
    on_click_async!(els.admin_pause_btn, app, admin_panel::on_pause);
    on_click_async!(els.admin_unpause_btn, app, admin_panel::on_unpause);
    on_click_async!(els.admin_emergency_btn, app, admin_panel::on_emergency);
    on_click_async!(els.admin_authorize_btn, app, authorize_project);
    on_click_async!(els.admin_revoke_btn, app, revoke_project);
    on_click_async!(els.admin_add_board_btn, app, add_board_member);
    on_click_async!(els.admin_remove_board_btn, app, remove_board_member);
    on_click_async!(els.admin_batch_btn, app, admin_panel::on_batch);
    on_click_async!(els.admin_block_btn, app, admin_panel::on_block);
    on_click_async!(els.admin_unblock_btn, app, admin_panel::on_unblock);
    on_click_async!(els.admin_wd_btn, app, admin_panel::on_withdrawal);
    on_click_async!(els.admin_refresh_btn, app, admin_panel::load_proposals);
    {
        let app2 = Rc::clone(app);
        on_event!(els.admin_wd_amount, "input", move |_: web_sys::Event| {
            admin_panel::on_withdrawal_amount(&app2);
        });
    }
    {
        let app2 = Rc::clone(app);
        on_event!(els.admin_proposals, "click", move |event: web_sys::Event| {
            let Some(button) = dom::closest_with_attr(event.target(), "data-action") else {
                return;
            };
            let action = button.get_attribute("data-action").unwrap_or_default();
            let Some(id) = button
                .get_attribute("data-id")
                .and_then(|raw| raw.parse::<u64>().ok())
            else {
                return;
            };
            let app3 = Rc::clone(&app2);
            spawn_local(async move {
                admin_panel::on_proposal_action(&app3, &action, id).await;
            });
        });
    }

    Ok(())
}

fn set_active_tab(els: &Elements, tab_name: &str) {
    for tab in &els.tabs {
        dom::toggle_class(tab, "active", tab.get_attribute("data-tab").as_deref() == Some(tab_name));
    }
    for panel in &els.panels {
        dom::toggle_class(panel, "active", panel.id() == tab_name);
    }
}

pub fn apply_language(language: &str) {
    if let Some(root) = dom::document().ok().and_then(|doc| doc.document_element()) {
        let _ = root.set_attribute("lang", language);
    }
}

async fn on_connect(app: &Rc<App>) {
    dom::set_disabled(&app.els.connect_btn, true);
    let result = app.wallet.connect().await;
    dom::set_disabled(&app.els.connect_btn, false);
    crate::subscribe_wallet_events(app);
    match result {
        Ok(_) => {
            app.bind_contracts();
            crate::render(app).await;
        }
        Err(WalletError::OpenedInWalletApp) => {
            notify::warning(&app.els, "Continue in your wallet app");
        }
        Err(err) => notify::failure(&app.els, "Connect wallet", &err),
    }
}

async fn on_disconnect(app: &App) {
    app.wallet.disconnect();
    app.contracts.reset();
    state::reset();
    registration::close(app);
    crate::render(app).await;
}

async fn claim_leader(app: &App) {
    dashboard::on_claim(app, RewardPool::Leader).await;
}

async fn claim_investment(app: &App) {
    dashboard::on_claim(app, RewardPool::Investment).await;
}

async fn claim_marketing(app: &App) {
    dashboard::on_claim(app, RewardPool::Marketing).await;
}

async fn authorize_project(app: &App) {
    admin_panel::on_authorize(app, true).await;
}

async fn revoke_project(app: &App) {
    admin_panel::on_authorize(app, false).await;
}

async fn add_board_member(app: &App) {
    admin_panel::on_board(app, true).await;
}

async fn remove_board_member(app: &App) {
    admin_panel::on_board(app, false).await;
}
