use anyhow::Result;

use crate::config::Config;
use crate::tui::canvas;

pub fn run(config: Config, demo: bool) -> Result<()> {
    canvas::run(config, demo)
}
