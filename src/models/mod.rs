//! Data types shared across the engine.

mod account;
mod node;
mod snapshot;

pub use account::{Group, User};
pub use node::{DirEntry, FsNode, NodeKind};
pub use snapshot::Snapshot;
