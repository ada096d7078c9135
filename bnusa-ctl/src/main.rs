use std::collections::VecDeque;

use anyhow::{anyhow, Context};
use bnusa_client::{
    api::{CommentApi, CommentId, Target, UserId, Viewer},
    CommentSection, CommentStore, Notice,
};

mod http;
mod view;

use http::HttpApi;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Base URL of the bnusa backend
    #[structopt(short, long, env = "BNUSA_HOST")]
    host: String,

    /// Bearer token to authenticate with
    #[structopt(long, env = "BNUSA_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Id of the user the token belongs to
    #[structopt(short, long, env = "BNUSA_USER")]
    user: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Print the comments of an article, review or book (eg. `book:shaxawan`)
    Show {
        target: Target,

        /// Number of pages of top-level comments to load
        #[structopt(long, default_value = "1")]
        pages: u32,

        /// Comments whose replies to open
        #[structopt(long)]
        expand: Vec<String>,
    },

    /// Post a comment, or a reply with `--parent`
    Post {
        target: Target,

        content: String,

        #[structopt(long)]
        parent: Option<String>,

        /// Number of pages of top-level comments to search the parent in
        #[structopt(long, default_value = "1")]
        pages: u32,
    },

    /// Delete a comment and all its replies
    Delete {
        target: Target,

        id: String,

        /// Owner of the target, when deleting someone else's comment on it
        #[structopt(long)]
        owner: Option<String>,

        #[structopt(long, default_value = "1")]
        pages: u32,
    },
}

async fn load_pages<A: CommentApi>(store: &mut CommentStore<A>, pages: u32) -> anyhow::Result<()> {
    for _ in 0..pages.max(1) {
        store.load_more_top_level().await;
        if let Some(err) = store.error() {
            return Err(anyhow!("{err}")).context("loading comments");
        }
        if !store.forest().top_has_more() {
            break;
        }
    }
    Ok(())
}

/// Opens threads breadth-first until `id` is loaded
async fn locate<A: CommentApi>(store: &mut CommentStore<A>, id: &CommentId) -> anyhow::Result<()> {
    let mut queue = store.forest().top_level().iter().cloned().collect::<VecDeque<_>>();
    while !store.forest().contains(id) {
        let next = match queue.pop_front() {
            Some(next) => next,
            None => return Err(anyhow!("comment {id} is not in the loaded pages")),
        };
        if !store.forest().is_expanded(&next) {
            store.expand_replies(&next).await;
        }
        queue.extend(store.forest().children(&next).iter().cloned());
    }
    Ok(())
}

fn report(notices: Vec<Notice>) -> anyhow::Result<()> {
    let mut failed = None;
    for n in notices {
        match n {
            Notice::Success(msg) => println!("{msg}"),
            Notice::Error(msg) => failed = Some(msg),
        }
    }
    match failed {
        Some(msg) => Err(anyhow!(msg)),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let api = HttpApi::new(opt.host, opt.token);
    let viewer = match opt.user {
        Some(u) => Viewer::signed_in(UserId(u)),
        None => Viewer::anonymous(),
    };

    match opt.cmd {
        Command::Show {
            target,
            pages,
            expand,
        } => {
            let mut store = CommentStore::new(api, target);
            store.set_viewer(viewer);
            load_pages(&mut store, pages).await?;
            for id in expand.into_iter().map(CommentId) {
                locate(&mut store, &id).await?;
                if !store.forest().is_expanded(&id) {
                    store.expand_replies(&id).await;
                }
            }
            print!("{}", view::render(&store));
        }
        Command::Post {
            target,
            content,
            parent,
            pages,
        } => {
            let mut store = CommentStore::new(api, target);
            store.set_viewer(viewer);
            let parent = parent.map(CommentId);
            if let Some(p) = &parent {
                load_pages(&mut store, pages).await?;
                locate(&mut store, p).await?;
            }
            let mut section = CommentSection::new(store);
            let posted = match &parent {
                Some(p) => section.submit_reply(p, &content).await,
                None => section.submit_comment(&content).await,
            };
            if let (None, Some(err)) = (&posted, section.error()) {
                return Err(anyhow!("{err}")).context("posting comment");
            }
            report(section.take_notices())?;
            if let Some(id) = posted {
                println!("{id}");
            }
        }
        Command::Delete {
            target,
            id,
            owner,
            pages,
        } => {
            let mut store = CommentStore::new(api, target);
            store.set_viewer(viewer);
            store.set_owner(owner.map(UserId));
            let id = CommentId(id);
            load_pages(&mut store, pages).await?;
            locate(&mut store, &id).await?;
            let mut section = CommentSection::new(store);
            section.request_delete(&id);
            if !section.confirm_delete().await {
                let err = section.error().unwrap_or("unknown error");
                return Err(anyhow!("{err}")).with_context(|| format!("deleting comment {id}"));
            }
            report(section.take_notices())?;
        }
    }

    Ok(())
}
