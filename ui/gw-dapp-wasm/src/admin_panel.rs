//! Admin tab. Visible to owner, founders and board members; each button is
//! enabled only for the roles its command needs.

use crate::app::App;
use crate::dom;
use crate::notify;
use alloy_primitives::{Address, U256};
use gw_api_types::format::{format_timestamp, short_address};
use gw_api_types::{ContractName, Proposal, RoleSet};
use gw_config::parse_address_any_case;
use gw_contracts::{AdminCommand, required_votes, units};
use tracing::debug;
use wasm_bindgen::JsValue;

/// Most recent proposals listed.
const PROPOSAL_PAGE: u64 = 20;

fn role_label(roles: RoleSet) -> String {
    let mut names = Vec::new();
    if roles.owner {
        names.push("Owner");
    }
    if roles.founder {
        names.push("Founder");
    }
    if roles.board {
        names.push("Board");
    }
    names.join(" / ")
}

pub async fn refresh(app: &App) {
    let els = &app.els;
    let admin = app.admin();
    let roles = admin.roles();
    dom::set_visible(&els.admin_tab, roles.any());
    if !roles.any() {
        return;
    }
    dom::set_text(&els.admin_role, &role_label(roles));

    let any = Address::ZERO;
    let gates = [
        (&els.admin_pause_btn, AdminCommand::Pause),
        (&els.admin_unpause_btn, AdminCommand::Unpause),
        (&els.admin_emergency_btn, AdminCommand::EmergencyWithdraw),
        (&els.admin_authorize_btn, AdminCommand::AuthorizeProject { project: any, authorized: true }),
        (&els.admin_revoke_btn, AdminCommand::AuthorizeProject { project: any, authorized: false }),
        (&els.admin_add_board_btn, AdminCommand::AddBoardMember(any)),
        (&els.admin_remove_board_btn, AdminCommand::RemoveBoardMember(any)),
        (&els.admin_batch_btn, AdminCommand::BatchActivate { users: Vec::new(), max_level: 1 }),
        (&els.admin_block_btn, AdminCommand::BlockUser { user: any, reason: String::new() }),
        (&els.admin_unblock_btn, AdminCommand::UnblockUser(any)),
        (
            &els.admin_wd_btn,
            AdminCommand::CreateWithdrawal {
                recipient: any,
                amount: String::new(),
                description: String::new(),
            },
        ),
    ];
    for (button, command) in gates {
        dom::set_disabled(button, !admin.can(&command));
    }

    if app.contracts.is_paused().await {
        notify::warning(els, "Contract is paused");
    }
    load_proposals(app).await;
}

pub async fn load_proposals(app: &App) {
    let els = &app.els;
    dom::clear(&els.admin_proposals);
    if !app.contracts.has(ContractName::Governance) {
        dom::set_text(&els.admin_proposals, "Governance contract unavailable");
        return;
    }
    let count = app.contracts.proposal_count().await;
    if count == 0 {
        dom::set_text(&els.admin_proposals, "No proposals");
        return;
    }
    let board = app.admin().roles().board;
    for id in (1..=count).rev().take(PROPOSAL_PAGE as usize) {
        let Some(proposal) = app.contracts.proposal(id).await else {
            continue;
        };
        if let Err(err) = append_proposal(app, &proposal, board) {
            debug!("proposal {id} not rendered: {err:?}");
        }
    }
}

fn append_proposal(app: &App, proposal: &Proposal, board: bool) -> Result<(), JsValue> {
    let row = dom::create_element("div")?;
    row.set_class_name(if proposal.executed { "proposal executed" } else { "proposal" });
    row.append_child(&dom::create_with_text(
        "h5",
        "",
        &format!("#{} {}", proposal.id, proposal.description),
    )?.into())?;
    row.append_child(&dom::create_with_text(
        "p",
        "",
        &format!(
            "{} BNB to {}, votes {}/{} (against {}), deadline {}",
            units::from_wei(proposal.amount),
            short_address(&proposal.recipient.to_string()),
            proposal.votes_for,
            proposal.votes_required,
            proposal.votes_against,
            format_timestamp(proposal.deadline),
        ),
    )?.into())?;

    if !proposal.executed && board {
        let actions: &[(&str, &str)] = if proposal.votes_for >= proposal.votes_required {
            &[("execute", "Execute")]
        } else {
            &[("vote-for", "Vote for"), ("vote-against", "Vote against")]
        };
        for (action, text) in actions {
            let button = dom::create_with_text("button", "btn btn-small", text)?;
            button.set_attribute("data-action", action)?;
            button.set_attribute("data-id", &proposal.id.to_string())?;
            row.append_child(&button)?;
        }
    }
    app.els.admin_proposals.append_child(&row)?;
    Ok(())
}

async fn run(app: &App, command: AdminCommand) -> bool {
    let label = command.label();
    match app.admin().dispatch(command).await {
        Ok(tx_hash) => {
            notify::success(&app.els, &format!("{label}: {}", short_address(&tx_hash.to_string())));
            true
        }
        Err(err) => {
            notify::failure(&app.els, label, &err);
            false
        }
    }
}

fn address_from(app: &App, raw: &str, what: &str) -> Option<Address> {
    let parsed = parse_address_any_case(raw);
    if parsed.is_none() {
        notify::warning(&app.els, &format!("{what} is not a valid address"));
    }
    parsed
}

pub async fn on_pause(app: &App) {
    run(app, AdminCommand::Pause).await;
}

pub async fn on_unpause(app: &App) {
    run(app, AdminCommand::Unpause).await;
}

pub async fn on_emergency(app: &App) {
    let confirmed = dom::window()
        .ok()
        .and_then(|w| w.confirm_with_message("Withdraw all contract funds to the owner?").ok())
        .unwrap_or(false);
    if confirmed {
        run(app, AdminCommand::EmergencyWithdraw).await;
    }
}

pub async fn on_authorize(app: &App, authorized: bool) {
    let raw = dom::get_input_value(&app.els.admin_project_input);
    let Some(project) = address_from(app, &raw, "Project") else {
        return;
    };
    if run(app, AdminCommand::AuthorizeProject { project, authorized }).await {
        app.els.admin_project_input.set_value("");
    }
}

pub async fn on_board(app: &App, add: bool) {
    let raw = dom::get_input_value(&app.els.admin_board_input);
    let Some(member) = address_from(app, &raw, "Board member") else {
        return;
    };
    let command = if add {
        AdminCommand::AddBoardMember(member)
    } else {
        AdminCommand::RemoveBoardMember(member)
    };
    if run(app, command).await {
        app.els.admin_board_input.set_value("");
    }
}

/// One address per line or comma-separated.
fn parse_address_list(raw: &str) -> Result<Vec<Address>, String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| parse_address_any_case(part).ok_or_else(|| format!("invalid address {part}")))
        .collect()
}

pub async fn on_batch(app: &App) {
    let users = match parse_address_list(&dom::get_textarea_value(&app.els.admin_batch_users)) {
        Ok(users) if !users.is_empty() => users,
        Ok(_) => {
            notify::warning(&app.els, "Enter at least one address");
            return;
        }
        Err(message) => {
            notify::warning(&app.els, &message);
            return;
        }
    };
    let Ok(max_level) = dom::get_input_value(&app.els.admin_batch_level).parse::<u8>() else {
        notify::warning(&app.els, "Level must be a number");
        return;
    };
    if run(app, AdminCommand::BatchActivate { users, max_level }).await {
        app.els.admin_batch_users.set_value("");
    }
}

pub async fn on_block(app: &App) {
    let raw = dom::get_input_value(&app.els.admin_block_user);
    let Some(user) = address_from(app, &raw, "User") else {
        return;
    };
    let reason = dom::get_textarea_value(&app.els.admin_block_reason);
    if run(app, AdminCommand::BlockUser { user, reason }).await {
        app.els.admin_block_reason.set_value("");
    }
}

pub async fn on_unblock(app: &App) {
    let raw = dom::get_input_value(&app.els.admin_block_user);
    let Some(user) = address_from(app, &raw, "User") else {
        return;
    };
    run(app, AdminCommand::UnblockUser(user)).await;
}

/// Live preview of the votes a withdrawal will need.
pub fn on_withdrawal_amount(app: &App) {
    let raw = dom::get_input_value(&app.els.admin_wd_amount);
    let text = match units::to_wei(&raw) {
        Ok(amount) if amount > U256::ZERO => format!("Requires {} votes", required_votes(amount)),
        _ => String::new(),
    };
    dom::set_text(&app.els.admin_wd_votes, &text);
}

pub async fn on_withdrawal(app: &App) {
    let els = &app.els;
    let raw = dom::get_input_value(&els.admin_wd_recipient);
    let Some(recipient) = address_from(app, &raw, "Recipient") else {
        return;
    };
    let command = AdminCommand::CreateWithdrawal {
        recipient,
        amount: dom::get_input_value(&els.admin_wd_amount),
        description: dom::get_textarea_value(&els.admin_wd_description),
    };
    if run(app, command).await {
        els.admin_wd_amount.set_value("");
        els.admin_wd_description.set_value("");
        dom::set_text(&els.admin_wd_votes, "");
        load_proposals(app).await;
    }
}

/// Delegated click on a proposal's vote or execute button.
pub async fn on_proposal_action(app: &App, action: &str, proposal_id: u64) {
    let command = match action {
        "vote-for" => AdminCommand::Vote { proposal_id, support: true },
        "vote-against" => AdminCommand::Vote { proposal_id, support: false },
        "execute" => AdminCommand::ExecuteProposal(proposal_id),
        other => {
            debug!("unknown proposal action {other}");
            return;
        }
    };
    if run(app, command).await {
        load_proposals(app).await;
    }
}
