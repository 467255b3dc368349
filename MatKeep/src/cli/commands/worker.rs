//! Hidden stage worker entry point.
//!
//! stdout carries exactly one sentinel line; everything else goes to the
//! stderr log.

use std::path::Path;

use crate::restore::worker::{failed_sentinel, ok_sentinel, serve};

pub fn execute(task: &Path) -> anyhow::Result<()> {
    match serve(task) {
        Ok(stage) => {
            println!("{}", ok_sentinel(stage));
            Ok(())
        }
        Err((stage, error)) => {
            tracing::error!("Stage failed: {error}");
            println!("{}", failed_sentinel(stage, &error.to_string()));
            Err(error.into())
        }
    }
}
