//! twig-core: Core library for the twig version control system.
//!
//! twig is a single-user, local-first VCS. It records full snapshots of a
//! working tree as **commits** in a DAG, moves **branches** between them,
//! reconciles diverged branches with a three-way **merge**, and exchanges
//! history with **remotes** that live elsewhere on the filesystem.

pub mod branch;
pub mod commit;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod graph;
pub mod hash;
pub mod ignore;
pub mod index;
pub mod merge;
pub mod remote;
pub mod repo;
pub mod state;
pub mod status;
pub mod store;

pub use config::Config;
pub use error::{ErrorKind, TwigError, TwigResult};
pub use repo::Repository;
