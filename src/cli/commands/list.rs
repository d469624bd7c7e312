//! cli::commands::list
//!
//! Print the role catalog, or the usage history, one role per line.
//!
//! Output is tab-separated: profile, ARN, account name. History entries whose
//! role is no longer in the catalog print with an empty profile.

use std::io::{self, Write};

use anyhow::Result;

use crate::catalog::{RoleCatalog, RoleRecord};
use crate::cli::context::{runtime, Context, Session};
use crate::core::types::RoleArn;

pub fn list(ctx: &Context, history: bool) -> Result<()> {
    let session = Session::open(ctx)?;
    let auth = session.auth();
    let catalogs = session.catalogs();

    let rt = runtime()?;
    let catalog = rt.block_on(catalogs.catalog(
        session.sso_name,
        session.instance,
        &auth,
        &session.launcher,
    ))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if history {
        write_history(&mut out, &catalog, &catalogs.history())?;
    } else {
        write_catalog(&mut out, &catalog)?;
    }
    Ok(())
}

fn write_catalog(out: &mut impl Write, catalog: &RoleCatalog) -> io::Result<()> {
    let mut records: Vec<&RoleRecord> = catalog.records().collect();
    records.sort_by(|a, b| a.profile.cmp(&b.profile));
    for record in records {
        writeln!(out, "{}\t{}\t{}", record.profile, record.arn, record.account_name)?;
    }
    Ok(())
}

fn write_history(out: &mut impl Write, catalog: &RoleCatalog, history: &[String]) -> io::Result<()> {
    for entry in history {
        let record = entry
            .parse::<RoleArn>()
            .ok()
            .and_then(|arn| catalog.by_arn(&arn).ok());
        match record {
            Some(record) => writeln!(out, "{}\t{}\t{}", record.profile, record.arn, record.account_name)?,
            None => writeln!(out, "\t{}\t", entry)?,
        }
    }
    Ok(())
}
