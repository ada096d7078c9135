#![cfg(test)]

use std::{panic::AssertUnwindSafe, sync::Arc};

use bnusa_mock_server::MockServer;

use crate::{
    api::{CommentId, Target, UserId, Viewer},
    CommentStore,
};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            if std::env::var("RUST_LOG").is_ok() {
                let _ = tracing_subscriber::fmt::try_init();
            }
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    /// Someone else posts, behind the back of the store
    Seed { parent: Option<usize> },
    LoadTopLevel { page: u8 },
    LoadMoreTopLevel,
    Expand { node: usize },
    LoadMore { node: usize },
    Insert { parent: Option<usize>, empty: bool },
    Delete { node: usize },
}

impl FuzzOp {
    fn only_loads(&self, forest_was_empty: bool) -> bool {
        match self {
            // a first page replaces whatever was loaded
            FuzzOp::LoadTopLevel { page } => *page > 1 || forest_was_empty,
            FuzzOp::LoadMoreTopLevel | FuzzOp::Expand { .. } | FuzzOp::LoadMore { .. } => true,
            _ => false,
        }
    }
}

fn resize_int(i: usize, len: usize) -> Option<usize> {
    (len > 0).then(|| i % len)
}

fn pick(store: &CommentStore<Arc<MockServer>>, i: usize) -> Option<CommentId> {
    let mut ids = store.forest().ids().cloned().collect::<Vec<_>>();
    ids.sort_unstable();
    resize_int(i, ids.len()).map(|i| ids.swap_remove(i))
}

fn assert_newest_first(store: &CommentStore<Arc<MockServer>>, ids: &[CommentId]) {
    let forest = store.forest();
    for pair in ids.windows(2) {
        let older = &forest.node(&pair[1]).expect("listed comment is loaded").comment;
        let newer = &forest.node(&pair[0]).expect("listed comment is loaded").comment;
        assert!(
            newer.created_at >= older.created_at,
            "{} is listed before the newer {}",
            newer.id,
            older.id
        );
    }
}

fn check_counts(store: &CommentStore<Arc<MockServer>>) {
    let forest = store.forest();
    forest.assert_consistent();
    let by_thread: u64 = forest
        .top_level()
        .iter()
        .map(|id| 1 + forest.reply_count(id))
        .sum();
    assert_eq!(by_thread, forest.reconciled_total());
    assert_newest_first(store, forest.top_level());
    for id in forest.ids() {
        assert_newest_first(store, forest.children(id));
    }
    let rows = forest.visible_rows();
    assert!(rows.len() <= forest.len());
    assert!(rows.len() >= forest.top_level().len());
}

async fn run(ops: Vec<FuzzOp>) {
    let alice = UserId(String::from("alice"));
    let bob = UserId(String::from("bob"));
    let target = Target::Review(String::from("fuzz"));
    let mock = Arc::new(MockServer::new());
    mock.act_as(Some(alice.clone()));
    mock.set_owner(&target, alice.clone());
    let mut store = CommentStore::new(mock.clone(), target.clone());
    store.set_viewer(Viewer::signed_in(alice.clone()));
    store.set_owner(Some(alice));

    for op in ops {
        let was_empty = store.forest().is_empty();
        let before = store.reconciled_total();
        match &op {
            FuzzOp::Seed { parent } => {
                let parent = parent.and_then(|p| pick(&store, p));
                mock.seed(&target, parent.as_ref(), &bob, "seeded");
            }
            FuzzOp::LoadTopLevel { page } => store.load_top_level(u32::from(*page)).await,
            FuzzOp::LoadMoreTopLevel => store.load_more_top_level().await,
            FuzzOp::Expand { node } => {
                if let Some(id) = pick(&store, *node) {
                    store.expand_replies(&id).await;
                }
            }
            FuzzOp::LoadMore { node } => {
                if let Some(id) = pick(&store, *node) {
                    store.load_more_replies(&id).await;
                }
            }
            FuzzOp::Insert { parent, empty } => {
                let parent = parent.and_then(|p| pick(&store, p));
                let content = if *empty { "  " } else { "fuzzed" };
                let res = store.insert_comment(content, parent.as_ref()).await;
                assert_eq!(res.is_ok(), !*empty, "{res:?}");
                if res.is_ok() {
                    assert_eq!(store.reconciled_total(), before + 1);
                }
            }
            FuzzOp::Delete { node } => {
                if let Some(id) = pick(&store, *node) {
                    let subtree = 1 + store.reply_count(&id);
                    store.delete_comment(&id).await.expect("deleting as owner");
                    assert!(!store.forest().contains(&id));
                    assert_eq!(store.reconciled_total(), before - subtree);
                }
            }
        }
        assert!(store.error().is_none(), "{op:?} failed: {:?}", store.error());
        if op.only_loads(was_empty) {
            assert!(
                store.reconciled_total() >= before,
                "{op:?} lowered the total from {before} to {}",
                store.reconciled_total()
            );
        }
        check_counts(&store);
    }
}

do_tokio_test!(fuzz_comment_store, Vec<FuzzOp>, run);
