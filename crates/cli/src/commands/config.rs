// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::Context;
use crate::error::Result;

/// Prints the effective connection config, token hidden.
pub fn run(ctx: &Context) -> Result<()> {
    print!("{}", ctx.config.to_toml_redacted()?);
    println!("# state_dir = {:?}", ctx.state_dir.display().to_string());
    Ok(())
}
