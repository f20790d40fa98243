use neon_swarm::prelude::*;

fn main() -> Result<(), SwarmError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {}", path);
            SwarmConfig::load(&path)?
        }
        None => SwarmConfig::default(),
    };

    Swarm::new().with_config(config).run()
}
