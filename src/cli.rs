use std::{env, path::PathBuf};

use anyhow::{Result, bail};

const DEFAULT_CONFIG_PATH: &str = "./reckoner.json5";
const USAGE: &str = "usage: reckoner [--config <path>]";

/// Resolves the config path from process arguments. `--config` may appear
/// more than once; the last occurrence wins.
pub fn config_path_from_args() -> Result<PathBuf> {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        if arg == "--config" {
            let Some(value) = args.next() else {
                bail!("--config requires a path. {USAGE}");
            };
            config_path = PathBuf::from(value);
        } else {
            bail!("unknown argument: {arg}. {USAGE}");
        }
    }

    Ok(config_path)
}
