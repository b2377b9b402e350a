//! Print the effective configuration.

use std::path::Path;

use cantor_config::{SynthConfig, find_config, user_config_path};
use clap::Args;

use super::common::load_config;

#[derive(Args)]
pub struct ConfigArgs {
    /// Print the built-in defaults instead of the loaded file
    #[arg(long)]
    default: bool,

    /// Print where the configuration is read from
    #[arg(long, conflicts_with = "default")]
    path: bool,
}

pub fn run(args: ConfigArgs, config: Option<&Path>) -> anyhow::Result<()> {
    if args.path {
        match find_config(config) {
            Some(path) => println!("{}", path.display()),
            None => println!("{} (not present, using defaults)", user_config_path().display()),
        }
        return Ok(());
    }

    let config = if args.default {
        SynthConfig::default()
    } else {
        load_config(config)?
    };
    print!("{}", config.to_toml()?);
    Ok(())
}
