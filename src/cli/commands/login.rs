//! cli::commands::login
//!
//! Authenticate to the selected SSO instance, reusing a valid cached token.

use anyhow::{Context as _, Result};

use crate::cli::context::{runtime, Context, Session};

pub fn login(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let auth = session.auth();

    let rt = runtime()?;
    let token = rt
        .block_on(auth.authenticate(&session.launcher))
        .with_context(|| format!("login to SSO instance '{}' failed", session.sso_name))?;

    eprintln!(
        "Authenticated to {} ({}); session valid until {}.",
        session.sso_name,
        session.instance.start_url,
        token.expires_at.to_rfc3339()
    );
    Ok(())
}
