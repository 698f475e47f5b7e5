//! GWT token tab.

use crate::app::App;
use crate::dom;
use crate::notify;
use gw_api_types::ContractName;
use gw_api_types::format::group_thousands;
use gw_config::parse_address_any_case;
use gw_contracts::units;

pub async fn refresh(app: &App) {
    let els = &app.els;
    let available = app.contracts.has(ContractName::Token);
    for button in [&els.token_buy_btn, &els.token_sell_btn, &els.token_transfer_btn] {
        dom::set_disabled(button, !available);
    }
    let Some(address) = app.wallet.address().filter(|_| available) else {
        for el in [&els.token_price, &els.token_supply, &els.token_balance] {
            dom::set_text(el, "\u{2014}");
        }
        return;
    };

    let info = app.contracts.token_info(address).await;
    dom::set_text(&els.token_price, &format!("{} BNB", units::from_wei(info.price)));
    dom::set_text(
        &els.token_supply,
        &group_thousands(&units::from_wei(info.total_supply)),
    );
    dom::set_text(
        &els.token_balance,
        &format!("{} GWT", group_thousands(&units::from_wei(info.user_balance))),
    );
}

fn amount_input(app: &App) -> Option<String> {
    let amount = dom::get_input_value(&app.els.token_amount);
    if amount.is_empty() {
        notify::warning(&app.els, "Enter a token amount");
        return None;
    }
    Some(amount)
}

pub async fn on_buy(app: &App) {
    let Some(amount) = amount_input(app) else {
        return;
    };
    match app.contracts.buy_tokens(&amount).await {
        Ok(_) => {
            notify::success(&app.els, &format!("Bought {amount} GWT"));
            app.els.token_amount.set_value("");
            refresh(app).await;
        }
        Err(err) => notify::failure(&app.els, "Token purchase", &err),
    }
}

pub async fn on_sell(app: &App) {
    let Some(amount) = amount_input(app) else {
        return;
    };
    match app.contracts.sell_tokens(&amount).await {
        Ok(_) => {
            notify::success(&app.els, &format!("Sold {amount} GWT"));
            app.els.token_amount.set_value("");
            refresh(app).await;
        }
        Err(err) => notify::failure(&app.els, "Token sale", &err),
    }
}

pub async fn on_transfer(app: &App) {
    let els = &app.els;
    let Some(to) = parse_address_any_case(&dom::get_input_value(&els.token_transfer_to)) else {
        notify::warning(els, "Recipient is not a valid address");
        return;
    };
    let amount = dom::get_input_value(&els.token_transfer_amount);
    if amount.is_empty() {
        notify::warning(els, "Enter a token amount");
        return;
    }
    match app.contracts.transfer_tokens(to, &amount).await {
        Ok(_) => {
            notify::success(els, &format!("Sent {amount} GWT"));
            els.token_transfer_amount.set_value("");
            refresh(app).await;
        }
        Err(err) => notify::failure(els, "Token transfer", &err),
    }
}
