//! `mdcanvas config`: print the effective configuration.

use anyhow::Result;

use crate::config::{self, Config};

pub fn run(config: &Config) -> Result<()> {
    print!("{}", config::serialize(config));
    Ok(())
}
