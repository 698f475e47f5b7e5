//! GlobalWay dApp WASM frontend.
//!
//! Wallet session, contract access and matrix arithmetic live in the `gw-*`
//! crates; this crate binds them to the page. Each tab has its own module.

pub mod admin_panel;
pub mod api;
pub mod app;
pub mod dashboard;
pub mod dom;
pub mod events;
pub mod logging;
pub mod matrix_view;
pub mod network;
pub mod notify;
pub mod provider;
pub mod registration;
pub mod state;
pub mod storage;
pub mod token;

use app::App;
use gw_api_types::SessionChange;
use serde_json::Value;
use std::rc::Rc;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;

/// WASM entry point, called when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    logging::init();

    init().await
}

async fn init() -> Result<(), JsValue> {
    let els = dom::Elements::bind()?;
    let config = api::load_config().await;
    let app = Rc::new(App::new(els, config));

    // Language
    if let Some(language) = app.wallet.store().language() {
        dom::set_select_value_if_present(&app.els.language_select, &language);
        events::apply_language(&language);
    }

    // Referral link (`?ref=GW0000123` or `?ref=0x…`)
    let query = dom::window()?.location().search().unwrap_or_default();
    app.registration.capture_referral(&query);

    let loaded = app.contracts.load_abis(&api::HttpAbiSource).await;
    info!("{loaded} contract ABIs loaded");

    if app.wallet.init().await.is_some() {
        app.bind_contracts();
    }
    subscribe_wallet_events(&app);

    matrix_view::populate_levels(&app);
    events::bind_events(&app)?;
    render(&app).await;
    Ok(())
}

/// Account or chain changes invalidate every cached read; the page reloads.
/// Runs after boot and after every connect; listeners attach only once.
pub(crate) fn subscribe_wallet_events(app: &Rc<App>) {
    let Some(provider) = app.wallet.provider_for_events() else {
        return;
    };

    let accounts_app = Rc::clone(app);
    let accounts = provider.on("accountsChanged", move |payload: Value| {
        let accounts: Vec<String> = serde_json::from_value(payload).unwrap_or_default();
        match accounts_app.wallet.on_accounts_changed(&accounts) {
            SessionChange::Reload | SessionChange::DisconnectAndReload => app::reload_page(),
        }
    });

    let chain_app = Rc::clone(app);
    let chain = provider.on("chainChanged", move |payload: Value| {
        let chain_id = payload.as_str().unwrap_or_default().to_string();
        match chain_app.wallet.on_chain_changed(&chain_id) {
            SessionChange::Reload | SessionChange::DisconnectAndReload => app::reload_page(),
        }
    });

    if let Err(err) = accounts.and(chain) {
        warn!("wallet events unavailable: {err}");
    }
}

/// Redraw everything that depends on the session.
pub(crate) async fn render(app: &App) {
    network::refresh(app).await;
    dashboard::refresh(app).await;

    let home = match app.wallet.address() {
        Some(address) => {
            app.contracts
                .get_matrix_position(address, state::matrix_level())
                .await
        }
        None => 0,
    };
    state::set_matrix(state::matrix_level(), home);
    matrix_view::render(app).await;

    token::refresh(app).await;
    admin_panel::refresh(app).await;
}
