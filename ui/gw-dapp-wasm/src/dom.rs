//! DOM element bindings.
//!
//! All fields are resolved once at startup. To add new UI elements, add a
//! field here and bind it in `Elements::bind()`.

use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, HtmlElement, HtmlInputElement, HtmlOptionElement, HtmlSelectElement,
    HtmlTextAreaElement,
};

// ── Helpers ──

pub fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))
}

pub fn document() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("window has no document"))
}

pub fn by_id(id: &str) -> Option<Element> {
    document().ok()?.get_element_by_id(id)
}

pub fn by_id_typed<T: JsCast>(id: &str) -> Option<T> {
    by_id(id).and_then(|e| e.dyn_into::<T>().ok())
}

pub fn query_all(selector: &str) -> Vec<Element> {
    let Some(list) = document()
        .ok()
        .and_then(|doc| doc.query_selector_all(selector).ok())
    else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn get_input_value(el: &HtmlInputElement) -> String {
    el.value().trim().to_string()
}

pub fn get_textarea_value(el: &HtmlTextAreaElement) -> String {
    el.value().trim().to_string()
}

pub fn get_select_value(el: &HtmlSelectElement) -> String {
    el.value()
}

pub fn has_option(sel: &HtmlSelectElement, value: &str) -> bool {
    (0..sel.length())
        .filter_map(|i| sel.item(i))
        .filter_map(|el| el.dyn_into::<HtmlOptionElement>().ok())
        .any(|opt| opt.value() == value)
}

/// Select `value` only when the select offers it.
pub fn set_select_value_if_present(sel: &HtmlSelectElement, value: &str) {
    if has_option(sel, value) {
        sel.set_value(value);
    }
}

pub fn toggle_class(el: &Element, cls: &str, force: bool) {
    let _ = el.class_list().toggle_with_force(cls, force);
}

pub fn set_visible(el: &Element, visible: bool) {
    toggle_class(el, "hidden", !visible);
}

pub fn set_disabled(el: &HtmlElement, disabled: bool) {
    if disabled {
        let _ = el.set_attribute("disabled", "");
    } else {
        let _ = el.remove_attribute("disabled");
    }
}

pub fn create_element(tag: &str) -> Result<Element, JsValue> {
    document()?.create_element(tag)
}

/// `<tag class="…">text</tag>`
pub fn create_with_text(tag: &str, class: &str, text: &str) -> Result<Element, JsValue> {
    let el = create_element(tag)?;
    if !class.is_empty() {
        el.set_class_name(class);
    }
    el.set_text_content(Some(text));
    Ok(el)
}

pub fn create_option(value: &str, text: &str, selected: bool) -> Result<HtmlOptionElement, JsValue> {
    let opt: HtmlOptionElement = create_element("option")?.dyn_into()?;
    opt.set_value(value);
    opt.set_text_content(Some(text));
    opt.set_selected(selected);
    Ok(opt)
}

pub fn clear(el: &Element) {
    el.set_inner_html("");
}

/// Nearest ancestor-or-self carrying `attr`, starting at an event target.
pub fn closest_with_attr(target: Option<web_sys::EventTarget>, attr: &str) -> Option<Element> {
    let el: Element = target?.dyn_into().ok()?;
    el.closest(&format!("[{attr}]")).ok().flatten()
}

// ── Elements struct ──

/// All DOM element references used by the dApp.
#[derive(Clone)]
pub struct Elements {
    // Header
    pub connect_btn: HtmlElement,
    pub disconnect_btn: HtmlElement,
    pub wallet_address: Element,
    pub wallet_balance: Element,
    pub network_status: Element,
    pub language_select: HtmlSelectElement,

    // Navigation
    pub tabs: Vec<Element>,
    pub panels: Vec<Element>,

    // Dashboard
    pub user_id: Element,
    pub user_sponsor: Element,
    pub user_registered: Element,
    pub user_last_activity: Element,
    pub user_invites: Element,
    pub user_earned: Element,
    pub user_rank: Element,
    pub stats_total: Element,
    pub stats_referral: Element,
    pub stats_matrix: Element,
    pub stats_leader: Element,
    pub stats_team: Element,
    pub referral_count: Element,
    pub gwt_balance: Element,
    pub quarterly_next: Element,
    pub pay_quarterly_btn: HtmlElement,
    pub levels_grid: Element,
    pub referral_link: HtmlInputElement,
    pub copy_referral_btn: HtmlElement,
    pub pool_rewards: Element,
    pub claim_leader_btn: HtmlElement,
    pub claim_investment_btn: HtmlElement,
    pub claim_marketing_btn: HtmlElement,

    // Matrix
    pub matrix_level_select: HtmlSelectElement,
    pub matrix_root_label: Element,
    pub matrix_tree: Element,
    pub matrix_table: Element,
    pub matrix_depth_select: HtmlSelectElement,
    pub matrix_home_btn: HtmlElement,

    // Token
    pub token_price: Element,
    pub token_supply: Element,
    pub token_balance: Element,
    pub token_amount: HtmlInputElement,
    pub token_buy_btn: HtmlElement,
    pub token_sell_btn: HtmlElement,
    pub token_transfer_to: HtmlInputElement,
    pub token_transfer_amount: HtmlInputElement,
    pub token_transfer_btn: HtmlElement,

    // Registration modal
    pub register_modal: Element,
    pub sponsor_input: HtmlInputElement,
    pub register_btn: HtmlElement,
    pub register_close_btn: HtmlElement,
    pub register_error: Element,

    // Admin
    pub admin_tab: Element,
    pub admin_role: Element,
    pub admin_pause_btn: HtmlElement,
    pub admin_unpause_btn: HtmlElement,
    pub admin_emergency_btn: HtmlElement,
    pub admin_project_input: HtmlInputElement,
    pub admin_authorize_btn: HtmlElement,
    pub admin_revoke_btn: HtmlElement,
    pub admin_board_input: HtmlInputElement,
    pub admin_add_board_btn: HtmlElement,
    pub admin_remove_board_btn: HtmlElement,
    pub admin_batch_users: HtmlTextAreaElement,
    pub admin_batch_level: HtmlInputElement,
    pub admin_batch_btn: HtmlElement,
    pub admin_block_user: HtmlInputElement,
    pub admin_block_reason: HtmlTextAreaElement,
    pub admin_block_btn: HtmlElement,
    pub admin_unblock_btn: HtmlElement,
    pub admin_wd_recipient: HtmlInputElement,
    pub admin_wd_amount: HtmlInputElement,
    pub admin_wd_description: HtmlTextAreaElement,
    pub admin_wd_votes: Element,
    pub admin_wd_btn: HtmlElement,
    pub admin_proposals: Element,
    pub admin_refresh_btn: HtmlElement,

    pub toast_container: Element,
}

macro_rules! get_el {
    ($id:expr) => {
        by_id($id).ok_or_else(|| JsValue::from_str(&format!("missing element #{}", $id)))?
    };
}

macro_rules! get_input {
    ($id:expr) => {
        by_id_typed::<HtmlInputElement>($id)
            .ok_or_else(|| JsValue::from_str(&format!("missing input #{}", $id)))?
    };
}

macro_rules! get_select {
    ($id:expr) => {
        by_id_typed::<HtmlSelectElement>($id)
            .ok_or_else(|| JsValue::from_str(&format!("missing select #{}", $id)))?
    };
}

macro_rules! get_textarea {
    ($id:expr) => {
        by_id_typed::<HtmlTextAreaElement>($id)
            .ok_or_else(|| JsValue::from_str(&format!("missing textarea #{}", $id)))?
    };
}

macro_rules! get_html {
    ($id:expr) => {
        by_id_typed::<HtmlElement>($id)
            .ok_or_else(|| JsValue::from_str(&format!("missing html element #{}", $id)))?
    };
}

impl Elements {
    /// Resolve all DOM references. Call once after DOMContentLoaded.
    pub fn bind() -> Result<Elements, JsValue> {
        Ok(Elements {
            connect_btn: get_html!("connectBtn"),
            disconnect_btn: get_html!("disconnectBtn"),
            wallet_address: get_el!("walletAddress"),
            wallet_balance: get_el!("walletBalance"),
            network_status: get_el!("networkStatus"),
            language_select: get_select!("languageSelect"),

            tabs: query_all(".tab"),
            panels: query_all(".panel"),

            user_id: get_el!("userId"),
            user_sponsor: get_el!("userSponsor"),
            user_registered: get_el!("userRegistered"),
            user_last_activity: get_el!("userLastActivity"),
            user_invites: get_el!("userInvites"),
            user_earned: get_el!("userEarned"),
            user_rank: get_el!("userRank"),
            stats_total: get_el!("statsTotal"),
            stats_referral: get_el!("statsReferral"),
            stats_matrix: get_el!("statsMatrix"),
            stats_leader: get_el!("statsLeader"),
            stats_team: get_el!("statsTeam"),
            referral_count: get_el!("referralCount"),
            gwt_balance: get_el!("gwtBalance"),
            quarterly_next: get_el!("quarterlyNext"),
            pay_quarterly_btn: get_html!("payQuarterlyBtn"),
            levels_grid: get_el!("levelsGrid"),
            referral_link: get_input!("referralLink"),
            copy_referral_btn: get_html!("copyReferralBtn"),
            pool_rewards: get_el!("poolRewards"),
            claim_leader_btn: get_html!("claimLeaderBtn"),
            claim_investment_btn: get_html!("claimInvestmentBtn"),
            claim_marketing_btn: get_html!("claimMarketingBtn"),

            matrix_level_select: get_select!("matrixLevelSelect"),
            matrix_root_label: get_el!("matrixRootLabel"),
            matrix_tree: get_el!("matrixTree"),
            matrix_table: get_el!("matrixTable"),
            matrix_depth_select: get_select!("matrixDepthSelect"),
            matrix_home_btn: get_html!("matrixHomeBtn"),

            token_price: get_el!("tokenPrice"),
            token_supply: get_el!("tokenSupply"),
            token_balance: get_el!("tokenBalance"),
            token_amount: get_input!("tokenAmount"),
            token_buy_btn: get_html!("tokenBuyBtn"),
            token_sell_btn: get_html!("tokenSellBtn"),
            token_transfer_to: get_input!("tokenTransferTo"),
            token_transfer_amount: get_input!("tokenTransferAmount"),
            token_transfer_btn: get_html!("tokenTransferBtn"),

            register_modal: get_el!("registerModal"),
            sponsor_input: get_input!("sponsorInput"),
            register_btn: get_html!("registerBtn"),
            register_close_btn: get_html!("registerCloseBtn"),
            register_error: get_el!("registerError"),

            admin_tab: get_el!("adminTab"),
            admin_role: get_el!("adminRole"),
            admin_pause_btn: get_html!("adminPauseBtn"),
            admin_unpause_btn: get_html!("adminUnpauseBtn"),
            admin_emergency_btn: get_html!("adminEmergencyBtn"),
            admin_project_input: get_input!("adminProjectInput"),
            admin_authorize_btn: get_html!("adminAuthorizeBtn"),
            admin_revoke_btn: get_html!("adminRevokeBtn"),
            admin_board_input: get_input!("adminBoardInput"),
            admin_add_board_btn: get_html!("adminAddBoardBtn"),
            admin_remove_board_btn: get_html!("adminRemoveBoardBtn"),
            admin_batch_users: get_textarea!("adminBatchUsers"),
            admin_batch_level: get_input!("adminBatchLevel"),
            admin_batch_btn: get_html!("adminBatchBtn"),
            admin_block_user: get_input!("adminBlockUser"),
            admin_block_reason: get_textarea!("adminBlockReason"),
            admin_block_btn: get_html!("adminBlockBtn"),
            admin_unblock_btn: get_html!("adminUnblockBtn"),
            admin_wd_recipient: get_input!("adminWdRecipient"),
            admin_wd_amount: get_input!("adminWdAmount"),
            admin_wd_description: get_textarea!("adminWdDescription"),
            admin_wd_votes: get_el!("adminWdVotes"),
            admin_wd_btn: get_html!("adminWdBtn"),
            admin_proposals: get_el!("adminProposals"),
            admin_refresh_btn: get_html!("adminRefreshBtn"),

            toast_container: get_el!("toastContainer"),
        })
    }
}
