use {anyhow::Result, beacon_config::BeaconConfig, clap::Subcommand};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the config directory and the resolved state file path.
    Paths,
}

pub fn handle_config(action: ConfigAction, config: &BeaconConfig) -> Result<()> {
    match action {
        ConfigAction::Show => print!("{}", render(config)?),
        ConfigAction::Paths => {
            match beacon_config::config_dir() {
                Some(dir) => println!("Config dir:  {}", dir.display()),
                None => println!("Config dir:  (unavailable)"),
            }
            println!("State file:  {}", config.store.resolved_path().display());
        },
    }
    Ok(())
}

/// Effective config with the store path filled in.
fn render(config: &BeaconConfig) -> Result<String> {
    let mut effective = config.clone();
    effective.store.path = Some(config.store.resolved_path());
    Ok(toml::to_string_pretty(&effective)?)
}
