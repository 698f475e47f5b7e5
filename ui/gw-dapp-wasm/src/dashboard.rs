//! Header, dashboard and level purchase.

use crate::app::App;
use crate::dom::{self, Elements};
use crate::{notify, registration, state};
use alloy_primitives::Address;
use gw_api_types::format::{format_countdown, format_timestamp, group_thousands, short_address};
use gw_api_types::{ContractName, Level, RewardPool, UserInfo, UserStats};
use gw_contracts::units;
use gw_registration::format_user_id;
use tracing::debug;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

const DASH: &str = "\u{2014}";

/// Header bits that only depend on the wallet session.
pub async fn render_header(app: &App) {
    let els = &app.els;
    match app.wallet.address() {
        Some(address) => {
            dom::set_text(&els.wallet_address, &short_address(&address.to_string()));
            let balance = app.wallet.native_balance().await;
            dom::set_text(&els.wallet_balance, &format!("{balance} BNB"));
            dom::set_visible(&els.connect_btn, false);
            dom::set_visible(&els.disconnect_btn, true);
        }
        None => {
            dom::set_text(&els.wallet_address, "Not connected");
            dom::set_text(&els.wallet_balance, DASH);
            dom::set_visible(&els.connect_btn, true);
            dom::set_visible(&els.disconnect_btn, false);
        }
    }
}

/// Reload every dashboard figure from chain.
pub async fn refresh(app: &App) {
    render_header(app).await;

    let Some(address) = app.wallet.address() else {
        state::set_user(UserInfo::default());
        render_user(&app.els, &UserInfo::default());
        render_stats(&app.els, &UserStats::default());
        render_levels(app, &UserInfo::default());
        return;
    };

    let user = app.contracts.get_user_full_info(address).await;
    state::set_user(user.clone());
    render_user(&app.els, &user);
    render_levels(app, &user);
    render_referral_link(&app.els, &user);

    if !user.is_registered {
        registration::open(app);
    }

    let stats = app.contracts.get_user_stats(address).await;
    render_stats(&app.els, &stats);

    let gwt = app.contracts.token_balance(address).await;
    dom::set_text(&app.els.gwt_balance, &format!("{} GWT", group_thousands(&gwt)));

    render_quarterly(app, address).await;
    render_pool_rewards(app, address).await;
}

fn render_user(els: &Elements, user: &UserInfo) {
    if !user.is_registered {
        for el in [
            &els.user_id,
            &els.user_sponsor,
            &els.user_registered,
            &els.user_last_activity,
            &els.user_invites,
            &els.user_earned,
            &els.user_rank,
            &els.referral_count,
        ] {
            dom::set_text(el, DASH);
        }
        return;
    }
    dom::set_text(&els.user_id, &format_user_id(user.user_id));
    dom::set_text(&els.user_sponsor, &short_address(&user.sponsor.to_string()));
    dom::set_text(&els.user_registered, &format_timestamp(user.registration_time));
    dom::set_text(&els.user_last_activity, &format_timestamp(user.last_activity));
    dom::set_text(&els.user_invites, &user.personal_invites.to_string());
    dom::set_text(
        &els.user_earned,
        &format!("{} BNB", units::from_wei(user.total_earned)),
    );
    dom::set_text(&els.user_rank, &user.leader_rank.to_string());
    dom::set_text(&els.referral_count, &user.referrals.len().to_string());
}

fn render_stats(els: &Elements, stats: &UserStats) {
    dom::set_text(&els.stats_total, &units::from_wei(stats.total_earned));
    dom::set_text(&els.stats_referral, &units::from_wei(stats.referral_earnings));
    dom::set_text(&els.stats_matrix, &units::from_wei(stats.matrix_earnings));
    dom::set_text(&els.stats_leader, &units::from_wei(stats.leader_earnings));
    dom::set_text(&els.stats_team, &stats.team_size.to_string());
}

fn render_referral_link(els: &Elements, user: &UserInfo) {
    if !user.is_registered {
        els.referral_link.set_value("");
        return;
    }
    let base = dom::window()
        .ok()
        .map(|w| {
            let location = w.location();
            format!(
                "{}{}",
                location.origin().unwrap_or_default(),
                location.pathname().unwrap_or_default()
            )
        })
        .unwrap_or_default();
    els.referral_link
        .set_value(&format!("{base}?ref={}", format_user_id(user.user_id)));
}

async fn render_quarterly(app: &App, address: Address) {
    let els = &app.els;
    if !app.contracts.has(ContractName::Quarterly) {
        dom::set_text(&els.quarterly_next, DASH);
        dom::set_disabled(&els.pay_quarterly_btn, true);
        return;
    }
    dom::set_disabled(&els.pay_quarterly_btn, false);
    let due = app.contracts.next_quarterly_payment(address).await;
    if due == 0 {
        dom::set_text(&els.quarterly_next, DASH);
        return;
    }
    let now = (js_sys::Date::now() / 1000.0) as u64;
    let text = if due > now {
        format!("{} ({})", format_timestamp(due), format_countdown(due - now))
    } else {
        format!("Due since {}", format_timestamp(due))
    };
    dom::set_text(&els.quarterly_next, &text);
}

async fn render_pool_rewards(app: &App, address: Address) {
    let els = &app.els;
    let pools = [
        (RewardPool::Leader, "Leader", &els.claim_leader_btn),
        (RewardPool::Investment, "Investment", &els.claim_investment_btn),
        (RewardPool::Marketing, "Marketing", &els.claim_marketing_btn),
    ];
    dom::clear(&els.pool_rewards);
    for (pool, label, button) in pools {
        let available = app.contracts.has(pool.contract());
        dom::set_disabled(button, !available);
        if !available {
            continue;
        }
        let pending = app.contracts.pending_pool_rewards(pool, address).await;
        if let Ok(row) = dom::create_with_text("div", "pool-row", &format!("{label}: {pending} BNB")) {
            let _ = els.pool_rewards.append_child(&row);
        }
    }
}

/// One card per level; inactive levels carry a buy button with `data-level`.
fn render_levels(app: &App, user: &UserInfo) {
    let grid = &app.els.levels_grid;
    dom::clear(grid);
    let next = user
        .active_levels
        .highest()
        .map_or(1, |level| level.get() + 1);

    for level in Level::all() {
        if let Err(err) = append_level_card(app, user, level, next) {
            debug!("level card {level} not rendered: {err:?}");
        }
    }
}

fn append_level_card(app: &App, user: &UserInfo, level: Level, next: u8) -> Result<(), JsValue> {
    let active = user.active_levels.contains(level);
    let card = dom::create_element("div")?;
    card.set_class_name(if active { "level-card active" } else { "level-card" });

    card.append_child(&dom::create_with_text("h4", "", &format!("Level {level}"))?.into())?;
    if let Some(tier) = app.config.level_tier(level) {
        card.append_child(&dom::create_with_text("p", "level-price", &format!("{} BNB", tier.price))?.into())?;
        card.append_child(&dom::create_with_text(
            "p",
            "level-reward",
            &format!("+{} GWT", group_thousands(&tier.token_reward)),
        )?.into())?;
    }

    if active {
        card.append_child(&dom::create_with_text("span", "level-status", "Active")?.into())?;
    } else {
        let button = dom::create_with_text("button", "btn level-buy", "Activate")?;
        button.set_attribute("data-level", &level.to_string())?;
        if !user.is_registered || level.get() != next {
            button.set_attribute("disabled", "")?;
        }
        card.append_child(&button)?;
    }
    app.els.levels_grid.append_child(&card)?;
    Ok(())
}

pub async fn on_buy_level(app: &App, level: u8) {
    match app.contracts.buy_level(level).await {
        Ok(Some(tx_hash)) => {
            notify::success(&app.els, &format!("Level {level} activated ({})", short_address(&tx_hash.to_string())));
            refresh(app).await;
        }
        Ok(None) => notify::warning(&app.els, "A level purchase is already in progress"),
        Err(err) => notify::failure(&app.els, &format!("Level {level} purchase"), &err),
    }
}

pub async fn on_pay_quarterly(app: &App) {
    match app.contracts.pay_quarterly().await {
        Ok(_) => {
            notify::success(&app.els, "Quarterly activity paid");
            refresh(app).await;
        }
        Err(err) => notify::failure(&app.els, "Quarterly payment", &err),
    }
}

pub async fn on_claim(app: &App, pool: RewardPool) {
    match app.contracts.claim_pool_rewards(pool).await {
        Ok(_) => {
            notify::success(&app.els, "Rewards claimed");
            refresh(app).await;
        }
        Err(err) => notify::failure(&app.els, "Claim", &err),
    }
}

pub async fn on_copy_referral(app: &App) {
    let link = dom::get_input_value(&app.els.referral_link);
    if link.is_empty() {
        notify::warning(&app.els, "Register first to get a referral link");
        return;
    }
    let Ok(window) = dom::window() else {
        return;
    };
    let promise = window.navigator().clipboard().write_text(&link);
    match JsFuture::from(promise).await {
        Ok(_) => notify::success(&app.els, "Referral link copied"),
        Err(_) => {
            app.els.referral_link.select();
            notify::warning(&app.els, "Copy the selected link manually");
        }
    }
}
