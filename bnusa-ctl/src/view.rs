use std::fmt::Write;

use bnusa_client::{api::CommentApi, CommentStore};

/// Renders the visible part of a thread, one comment per line
pub fn render<A: CommentApi>(store: &CommentStore<A>) -> String {
    let forest = store.forest();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} comments ({} loaded)",
        store.target(),
        store.reconciled_total(),
        forest.len(),
    );
    for row in forest.visible_rows() {
        let c = &row.node.comment;
        let indent = "  ".repeat(row.depth);
        let _ = write!(
            out,
            "{indent}[{}] {} at {}",
            c.id,
            c.author.display_name(),
            c.created_at.format("%Y-%m-%d %H:%M"),
        );
        if let Some(to) = &c.replying_to {
            let _ = write!(out, " to @{to}");
        }
        if row.node.deleting {
            let _ = write!(out, " (deleting)");
        }
        let _ = writeln!(out, ": {}", c.content);
        if row.depth == 0 {
            let replies = store.reply_count(row.node.id());
            let hidden = !forest.is_expanded(row.node.id());
            match (replies, hidden) {
                (0, _) => (),
                (n, true) => {
                    let _ = writeln!(out, "{indent}  +{n} replies");
                }
                (n, false) => {
                    let _ = writeln!(out, "{indent}  {n} replies");
                }
            }
        }
    }
    if forest.top_has_more() {
        let _ = writeln!(out, "more comments on page {}", forest.top_page() + 1);
    }
    out
}
