use env_logger::Builder;
use log::LevelFilter;

/// Install a logger that prints this crate's records at `level` and every
/// other crate's at `Info`. `RUST_LOG` still overrides both.
///
/// Does nothing if a logger is already installed, so tests and embedders
/// can call it freely.
pub fn init_logging(level: LevelFilter) {
    let result = Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("lora_mesh_sim"), level)
        .parse_default_env()
        .is_test(cfg!(test))
        .try_init();
    if result.is_ok() {
        log::debug!("Logging initialized at {}", level);
    }
}
