use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use kasane::{Engine, MemoryCache, Node, Resolvable, ResolverDefinition, Results};

/// This demo resolves a small blog feed: the latest posts, each with its
/// author and the authors of its comments.
///
/// It shows how to:
/// 1. Declare resolvables as plain Rust types.
/// 2. Register batched resolvers working against a shared environment.
/// 3. Compose dependent fetches without writing a single loop over queries.
/// 4. Inspect what the engine did, round by round.
///
/// Run with `cargo run --example users --features logging`, optionally with
/// `RUST_LOG=kasane=trace` to see every round.

#[derive(Debug, Clone)]
struct User {
    id: u32,
    name: String,
}

#[derive(Debug, Clone)]
struct Post {
    id: u32,
    author: u32,
    title: String,
}

#[derive(Debug, Clone)]
struct Comment {
    author: u32,
    text: String,
}

// -----------------------------------------------------------------------
// Resolvables
// -----------------------------------------------------------------------
// Every resolvable names the value it resolves to. Equal resolvables are
// fetched once per resolve call, so they must derive `Eq` and `Hash`.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct UserById(u32);

impl Resolvable for UserById {
    type Output = User;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LatestPosts(usize);

impl Resolvable for LatestPosts {
    type Output = Vec<Post>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CommentsOf(u32);

impl Resolvable for CommentsOf {
    type Output = Vec<Comment>;
}

// -----------------------------------------------------------------------
// Environment
// -----------------------------------------------------------------------
// Stands in for a database connection. It counts queries so we can see the
// effect of batching.

struct Db {
    users: HashMap<u32, User>,
    posts: Vec<Post>,
    comments: HashMap<u32, Vec<Comment>>,
    queries: AtomicUsize,
}

impl Db {
    fn query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

fn seed() -> Db {
    let users = ["ayame", "botan", "chiyo", "daigo"]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let id = i as u32 + 1;
            (id, User { id, name: name.to_string() })
        })
        .collect();

    let posts = (1..=5)
        .map(|id| Post {
            id,
            author: id % 4 + 1,
            title: format!("Post #{id}"),
        })
        .collect();

    let comments = (1..=5)
        .map(|post| {
            let comments = (1..=3)
                .map(|n| Comment {
                    author: (post + n) % 4 + 1,
                    text: format!("Comment {n} on #{post}"),
                })
                .collect();
            (post, comments)
        })
        .collect();

    Db {
        users,
        posts,
        comments,
        queries: AtomicUsize::new(0),
    }
}

#[derive(Debug, Clone)]
struct Thread {
    title: String,
    author: String,
    comments: Vec<(String, String)>,
}

fn main() -> anyhow::Result<()> {
    kasane::logging::init()?;

    // -----------------------------------------------------------------------
    // 1. Register resolvers
    // -----------------------------------------------------------------------
    let engine = Engine::builder()
        .with_resolver(ResolverDefinition::batched(|db: &Db, ids: &[UserById]| {
            db.query();
            let rows = ids.iter().filter_map(|id| db.users.get(&id.0).cloned()).collect();
            Ok(Results::match_by(ids, |id| id.0, rows, |user: &User| user.id))
        }))
        .with_resolver(ResolverDefinition::single(|db: &Db, latest: &LatestPosts| {
            db.query();
            Ok(db.posts.iter().rev().take(latest.0).cloned().collect())
        }))
        .with_resolver(ResolverDefinition::batched_in_order(|db: &Db, posts: &[CommentsOf]| {
            db.query();
            Ok(posts
                .iter()
                .map(|post| db.comments.get(&post.0).cloned().unwrap_or_default())
                .collect())
        }))
        .with_parallelism()
        .build(seed());

    // -----------------------------------------------------------------------
    // 2. Describe the data
    // -----------------------------------------------------------------------
    // Nothing is fetched here. Each post asks for its author and comments,
    // and each comment for its author, yet all users end up in one batch per
    // round.
    let feed: Node<Vec<Thread>> = LatestPosts(3).into_node().flat_map_each(|post: Post| {
        let author = UserById(post.author).into_node();

        let comments = CommentsOf(post.id).into_node().flat_map_each(|comment: Comment| {
            UserById(comment.author)
                .into_node()
                .map(move |user| (user.name, comment.text.clone()))
        });

        author.map_with(comments, move |author, comments| Thread {
            title: post.title.clone(),
            author: author.name,
            comments,
        })
    });

    // -----------------------------------------------------------------------
    // 3. Resolve
    // -----------------------------------------------------------------------
    let cache = MemoryCache::new();
    let (threads, diagnostics) = engine.resolve_with_diagnostics(feed, &cache)?;

    for thread in &threads {
        println!("{} by {}", thread.title, thread.author);
        for (author, text) in &thread.comments {
            println!("    {author}: {text}");
        }
    }

    println!();
    println!("{diagnostics}");
    println!("{} queries", engine.environment().queries.load(Ordering::SeqCst));

    // -----------------------------------------------------------------------
    // 4. Reuse the cache
    // -----------------------------------------------------------------------
    // Every user is already known, so this costs no query at all.
    let again = engine.resolve_with(UserById(1).into_node(), &cache)?;
    println!("cached: {}", again.name);

    Ok(())
}
