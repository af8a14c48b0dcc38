//! Auto-vivifying nested JSON tree that saves itself to disk on every change.
//!
//! Connect to a file, then read and write nested keys as if the file were an
//! ordinary map. Missing levels are created on first access, and every real
//! change rewrites the file (pretty JSON, sorted keys, 2-space indent).
//!
//! ```rust,no_run
//! use json_autosync::{connect, AutoSave};
//! use serde_json::json;
//!
//! let config = connect("categories.json").unwrap();
//! config
//!     .at(["comics", "dc", "batman"])
//!     .unwrap()
//!     .set("antagonists", json!(["Scarecrow", "The Joker", "Bane"]))
//!     .unwrap();
//! config
//!     .at(["comics", "marvel", "ironman"])
//!     .unwrap()
//!     .set("antagonists", "Ultron")
//!     .unwrap();
//! config.flush().unwrap();
//! ```
//!
//! Arrays are leaf values: they are stored and written as-is but never
//! vivified into.
//!
//! **Single-process only.** Two trees connected to the same file overwrite
//! each other; the last writer wins.

#![deny(missing_docs)]
#![warn(clippy::all)]

mod arena;
pub mod connect;
pub mod error;
pub mod flush;
pub mod node;
pub mod persist;
pub mod registry;
pub mod serializer;
mod tree;

pub use connect::{connect, AutoSyncBuilder};
pub use error::{Error, Result};
pub use flush::FlushPolicy;
pub use node::{AutoSave, Item, Node, TraceRoot};
pub use registry::Registry;
pub use serializer::{PrettyJson, SerializeOptions, Serializer};
