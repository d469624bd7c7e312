//! cli::commands::cache
//!
//! Force a rebuild of the role catalog.

use anyhow::Result;

use crate::cli::context::{runtime, Context, Session};

pub fn cache(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let auth = session.auth();
    let catalogs = session.catalogs();

    let rt = runtime()?;
    let catalog = rt.block_on(catalogs.refresh(
        session.sso_name,
        session.instance,
        &auth,
        &session.launcher,
    ))?;

    eprintln!(
        "Cached {} roles for SSO instance {} in {}.",
        catalog.len(),
        session.sso_name,
        catalogs.cache_path().display()
    );
    Ok(())
}
