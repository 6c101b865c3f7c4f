//! Document store for SyncaraBot.
//!
//! Every entity lives in a named, typed collection. On-disk collections are
//! a single JSON file each, rewritten atomically (temp file, then rename)
//! after every mutation; in-memory collections back the tests.
//!
//! ```text
//! <root>/
//! ├── users.json
//! ├── groups.json
//! ├── system_log.json
//! ├── channel_posts.json
//! ├── channel_analytics.json
//! ├── autonomous_tasks.json
//! ├── canvas_files.json
//! ├── todos.json
//! └── scheduled_tasks.json
//! ```
//!
//! # Example
//!
//! ```no_run
//! use syncara_persistence::DocumentStore;
//!
//! # async fn example() -> syncara_persistence::Result<()> {
//! let store = DocumentStore::open("/var/lib/syncara/db/syncara").await?;
//! let users = store.users.count(|_| true).await;
//! println!("{} known users", users);
//! # Ok(())
//! # }
//! ```

pub mod atomic;
pub mod collection;
pub mod error;
pub mod store;

pub use collection::{Collection, Document};
pub use error::{PersistenceError, Result};
pub use store::DocumentStore;
