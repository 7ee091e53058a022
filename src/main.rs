use clap::Parser;
use flowpatch::cli::{Action, Cli};
use flowpatch::config::Config;
use flowpatch::errors::FlowPatchError;
use flowpatch::nftables::NftManager;
use log::info;

fn ensure_root() -> Result<(), FlowPatchError> {
    let uid = unsafe { libc::getuid() };
    if uid != 0 {
        Err(FlowPatchError::NotRoot(uid))
    } else {
        Ok(())
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[cfg(feature = "nfqueue")]
mod hook {
    use flowpatch::config::Config;
    use flowpatch::engine::Engine;
    use flowpatch::handlers::{builtin_handlers, fs_watch::WatchStore};
    use flowpatch::nfqueue::NfQueue;
    use flowpatch::nftables::NftManager;
    use log::{debug, info};
    use std::sync::Arc;
    use std::thread;

    fn spawn_sweeper(engine: &Engine, config: &Config) -> anyhow::Result<()> {
        let Some(max_age) = config.registry.max_age() else {
            return Ok(());
        };
        let interval = config.registry.sweep_interval();
        let registry = engine.registry().clone();

        thread::Builder::new()
            .name("registry-sweeper".into())
            .spawn(move || loop {
                thread::sleep(interval);
                let expired = registry.expire_older_than(max_age);
                if expired > 0 {
                    info!("Expired {} stale registration(s)", expired);
                }
            })?;
        debug!("Sweeping registrations older than {:?} every {:?}", max_age, interval);
        Ok(())
    }

    pub fn start(config: Config) -> anyhow::Result<()> {
        let store = Arc::new(WatchStore::new());
        let engine = Arc::new(Engine::new(
            config.pattern_set()?,
            builtin_handlers(store.clone()),
        ));
        config.apply(&engine, &store);
        spawn_sweeper(&engine, &config)?;

        // Bind the queue before any rule sends packets to it
        let queue = NfQueue::open_and_bind(config.hook.queue_num, engine)?;
        NftManager::new(&config.hook).setup()?;
        queue.run()?;
        Ok(())
    }
}

#[cfg(not(feature = "nfqueue"))]
mod hook {
    use flowpatch::config::Config;

    pub fn start(_config: Config) -> anyhow::Result<()> {
        anyhow::bail!("built without the `nfqueue` feature; rebuild with --features nfqueue")
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config)?;
    ensure_root()?;

    match cli.action {
        Action::Start => hook::start(config)?,
        Action::Stop => {
            NftManager::new(&config.hook).teardown()?;
            info!("Stopped and cleaned up.");
        }
    }

    Ok(())
}
