//! JavaScript ecosystem lockfile parsers.

pub mod pnpm;

pub use pnpm::{
    LockfileVersion, PnpmLockfile, PnpmLockfileParser, lockfile_version, parse_lock_dependencies,
};
