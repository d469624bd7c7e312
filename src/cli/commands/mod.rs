//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Async Commands
//!
//! Every command that talks to the identity provider is async. Handlers
//! build a current-thread runtime from [`super::context::runtime`] and block
//! on the work.
//!
//! Human-readable status goes to stderr; stdout is reserved for data
//! (`list`) and the child's own output (`exec`).

mod cache;
mod exec;
mod flush;
mod list;
mod login;

pub use cache::cache;
pub use exec::exec;
pub use flush::flush;
pub use list::list;
pub use login::login;

use anyhow::Result;

use super::args::{selector, Command};
use super::context::Context;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<i32> {
    match command {
        Command::Exec {
            profile,
            arn,
            account,
            role,
            no_region,
            command,
        } => exec(ctx, &selector(profile, arn, account, role), command, no_region),
        Command::Login => login(ctx).map(|()| 0),
        Command::Cache => cache(ctx).map(|()| 0),
        Command::List { history } => list(ctx, history).map(|()| 0),
        Command::Flush { kind } => flush(ctx, kind).map(|()| 0),
    }
}
