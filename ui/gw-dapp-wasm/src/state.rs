//! View state shared between handlers.
//!
//! Uses `RefCell`-wrapped `thread_local!` storage (WASM is single-threaded).

use gw_api_types::{Level, UserInfo};
use std::cell::RefCell;

#[derive(Clone, Debug)]
pub struct ViewState {
    pub user: UserInfo,
    pub matrix_level: Level,
    /// Global index currently at the top of the matrix view; 0 until known.
    pub matrix_root: u64,
    /// The user's own position on `matrix_level`.
    pub matrix_home: u64,
    /// Row shown in the table under the tree.
    pub matrix_table_depth: u32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            user: UserInfo::default(),
            matrix_level: Level::FIRST,
            matrix_root: 0,
            matrix_home: 0,
            matrix_table_depth: gw_matrix::DEFAULT_TABLE_DEPTH,
        }
    }
}

thread_local! {
    static STATE: RefCell<ViewState> = RefCell::new(ViewState::default());
}

pub fn with<F, R>(f: F) -> R
where
    F: FnOnce(&ViewState) -> R,
{
    STATE.with(|s| f(&s.borrow()))
}

pub fn with_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut ViewState) -> R,
{
    STATE.with(|s| f(&mut s.borrow_mut()))
}

pub fn user() -> UserInfo {
    with(|s| s.user.clone())
}

pub fn set_user(user: UserInfo) {
    with_mut(|s| s.user = user);
}

pub fn matrix_level() -> Level {
    with(|s| s.matrix_level)
}

pub fn matrix_root() -> u64 {
    with(|s| s.matrix_root)
}

pub fn set_matrix(level: Level, home: u64) {
    with_mut(|s| {
        s.matrix_level = level;
        s.matrix_home = home;
        s.matrix_root = home;
    });
}

pub fn set_matrix_root(root: u64) {
    with_mut(|s| s.matrix_root = root);
}

pub fn matrix_home() -> u64 {
    with(|s| s.matrix_home)
}

pub fn matrix_table_depth() -> u32 {
    with(|s| s.matrix_table_depth)
}

pub fn set_matrix_table_depth(depth: u32) {
    with_mut(|s| s.matrix_table_depth = depth);
}

/// Forget the session; the chosen table depth is a page setting and stays.
pub fn reset() {
    with_mut(|s| {
        *s = ViewState {
            matrix_table_depth: s.matrix_table_depth,
            ..ViewState::default()
        }
    });
}
