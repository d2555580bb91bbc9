use clap::Parser;
use color_eyre::Result;
use tdl::{
    Config, Database, Profile, TaskStore,
    cli::{self, Cli},
    utils,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(&utils::expand_path(path))?,
        None => Config::load_with_profile(profile)?,
    };

    install_tracing(&config.log_level);

    let storage_path = config.get_storage_path();
    let db = Database::new(
        storage_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Storage path contains invalid UTF-8"))?,
    )?;
    let mut store = TaskStore::load(db);

    let skip_prompt = cli.yes || !config.confirm_deletes;
    let mut confirm = |prompt: &str| skip_prompt || cli::prompt_confirm(prompt);

    let mut stdout = std::io::stdout().lock();
    cli::run(
        cli.command,
        &mut store,
        utils::local_now(),
        &mut confirm,
        &mut stdout,
    )?;

    Ok(())
}

fn install_tracing(default_level: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
