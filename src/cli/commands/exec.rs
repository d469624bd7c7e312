//! cli::commands::exec
//!
//! Run a command under a role.

use anyhow::Result;

use crate::cli::context::{runtime, Context, Session};
use crate::inject::{check_environment, default_command, parent_environment, Injector, RoleSelector};

/// Run the exec command and return the child's exit code.
pub fn exec(
    ctx: &Context,
    selector: &RoleSelector,
    command: Vec<String>,
    no_region: bool,
) -> Result<i32> {
    // Fail before touching the store or the network.
    let parent = parent_environment();
    check_environment(&parent)?;
    selector.query()?;

    let command = if command.is_empty() {
        default_command()
    } else {
        command
    };

    let session = Session::open(ctx)?;
    let auth = session.auth();
    let catalogs = session.catalogs();
    let injector = Injector {
        client: &session.client,
        store: &session.store,
        auth: &auth,
        launcher: &session.launcher,
        catalogs: &catalogs,
        sso_name: session.sso_name,
        instance: session.instance,
    };

    let rt = runtime()?;
    let code = rt.block_on(injector.run(selector, &command, &parent, no_region))?;
    Ok(code)
}
