mod auth;
pub use auth::can_delete;

mod forest;
pub use forest::{Forest, Node, Row};

mod ledger;
pub use ledger::{Ledger, ReplyPage};

mod mutation;
pub use mutation::{CommentSection, DeleteState, Notice};

mod store;
pub use store::{CommentStore, StoreConfig, PROBE_PAGE_SIZE, REPLY_PAGE_SIZE};

mod fuzz;

pub mod api {
    pub use bnusa_api::*;
}
