//! Matrix tab: seven-slot tree plus one deeper table row.

use crate::app::App;
use crate::dom;
use crate::state;
use gw_api_types::format::short_address;
use gw_api_types::{Level, MatrixSlot};
use gw_matrix::{TABLE_DEPTHS, MatrixView, layout_of, load_neighborhood, load_row, table_depth};
use tracing::debug;
use wasm_bindgen::JsValue;

pub fn populate_levels(app: &App) {
    dom::clear(&app.els.matrix_level_select);
    let current = state::matrix_level();
    for level in Level::all() {
        let Ok(option) = dom::create_option(
            &level.to_string(),
            &format!("Level {level}"),
            level == current,
        ) else {
            continue;
        };
        let _ = app.els.matrix_level_select.append_child(&option);
    }

    dom::clear(&app.els.matrix_depth_select);
    let depth = state::matrix_table_depth();
    for option_depth in TABLE_DEPTHS {
        let Ok(option) = dom::create_option(
            &option_depth.to_string(),
            &format!("Depth {option_depth}"),
            option_depth == depth,
        ) else {
            continue;
        };
        let _ = app.els.matrix_depth_select.append_child(&option);
    }
}

pub async fn on_depth_change(app: &App) {
    let depth = table_depth(&dom::get_select_value(&app.els.matrix_depth_select));
    state::set_matrix_table_depth(depth);
    render(app).await;
}

/// Switch level and jump back to the user's own position on it.
pub async fn on_level_change(app: &App) {
    let raw = dom::get_select_value(&app.els.matrix_level_select);
    let level = raw
        .parse::<u8>()
        .ok()
        .and_then(Level::new)
        .unwrap_or(Level::FIRST);
    load_home(app, level).await;
}

pub async fn on_home(app: &App) {
    load_home(app, state::matrix_level()).await;
}

async fn load_home(app: &App, level: Level) {
    let home = match app.wallet.address() {
        Some(address) => app.contracts.get_matrix_position(address, level).await,
        None => 0,
    };
    state::set_matrix(level, home);
    render(app).await;
}

/// Re-root the view at an occupied slot.
pub async fn on_navigate(app: &App, global_index: u64) {
    if global_index == 0 {
        return;
    }
    state::set_matrix_root(global_index);
    render(app).await;
}

pub async fn render(app: &App) {
    let els = &app.els;
    let level = state::matrix_level();
    let root = state::matrix_root();

    dom::clear(&els.matrix_tree);
    dom::clear(&els.matrix_table);

    if root == 0 {
        dom::set_text(&els.matrix_root_label, "Not placed on this level yet");
        return;
    }
    let label = if root == state::matrix_home() {
        format!("Level {level}: your position #{root}")
    } else {
        format!("Level {level}: viewing #{root}")
    };
    dom::set_text(&els.matrix_root_label, &label);

    let view = load_neighborhood(&*app.contracts, level, root).await;
    debug!("matrix level {level} root {root}: {} of 7 filled", view.filled());
    if let Err(err) = render_tree(app, &view) {
        debug!("matrix tree not rendered: {err:?}");
    }

    let depth = state::matrix_table_depth();
    let row = load_row(&*app.contracts, level, root, depth, app.config.matrix_row_cap).await;
    if let Err(err) = render_row(app, depth, &row) {
        debug!("matrix row {depth} not rendered: {err:?}");
    }
}

fn render_tree(app: &App, view: &MatrixView) -> Result<(), JsValue> {
    let mut rows = Vec::new();
    for slot in &view.slots {
        let Some((depth, _)) = layout_of(slot.local_position) else {
            continue;
        };
        let depth = depth as usize;
        while rows.len() <= depth {
            let row = dom::create_element("div")?;
            row.set_class_name("matrix-row");
            app.els.matrix_tree.append_child(&row)?;
            rows.push(row);
        }
        rows[depth].append_child(&slot_node(slot)?.into())?;
    }
    Ok(())
}

fn render_row(app: &App, depth: u32, view: &MatrixView) -> Result<(), JsValue> {
    if view.slots.is_empty() {
        return Ok(());
    }
    let section = dom::create_element("div")?;
    section.set_class_name("matrix-table-row");
    section.append_child(&dom::create_with_text(
        "h5",
        "",
        &format!("Depth {depth}: {} / {}", view.filled(), 1u64 << depth),
    )?.into())?;
    for slot in &view.slots {
        section.append_child(&slot_node(slot)?.into())?;
    }
    app.els.matrix_table.append_child(&section)?;
    Ok(())
}

/// Occupied slots carry `data-global` so a click re-roots the view.
fn slot_node(slot: &MatrixSlot) -> Result<web_sys::Element, JsValue> {
    match slot.occupant {
        Some(address) => {
            let node = dom::create_with_text(
                "div",
                "matrix-slot filled",
                &format!("#{} {}", slot.global_index, short_address(&address.to_string())),
            )?;
            node.set_attribute("data-global", &slot.global_index.to_string())?;
            Ok(node)
        }
        None => dom::create_with_text("div", "matrix-slot empty", &format!("#{}", slot.global_index)),
    }
}
