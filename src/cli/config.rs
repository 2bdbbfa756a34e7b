use anyhow::Result;
use proactive_daemon::storage::config_store::ConfigStore;

/// `config show`: display the persisted config with the api key masked.
pub fn run_show() -> Result<()> {
    let store = ConfigStore::default_location();
    let config = store.load().redacted();
    println!("# {}", store.path().display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("# effective model: {}", config.effective_model());
    Ok(())
}
