pub mod analysis;
pub mod cards;
pub mod clustering;
pub mod evaluation;
pub mod gameplay;
pub mod mccfr;
pub mod sampling;

/// dimensional analysis types
pub type Chips = i32;
pub type Regret = i32;
pub type Probability = f64;
pub type Weight = f64;

// table stakes
pub const N_CARDS: usize = 52;
pub const N_COMBOS: usize = 1326;
pub const N_BOARD: usize = 5;
pub const N_STREETS: usize = 4;
pub const S_BLIND: Chips = 50;
pub const B_BLIND: Chips = 100;
pub const MAX_BET_LEVEL: u8 = 4;

// regret matching parameters
pub const REGRET_FLOOR: Regret = -310_000_000;
pub const REGRET_PRUNE: Regret = -300_000_000;
pub const PRUNE_PROBABILITY: Probability = 0.95;

// abstraction parameters
pub const N_HOLE_CLUSTERS: usize = 169;
pub const N_BOARD_CLUSTERS: usize = 200;
pub const N_ISO_FLOPS: usize = 1755;

// sampling parameters
pub const MAX_REJECTIONS: usize = 10_000;

// sampled blueprint parameters
pub const N_BIASES: usize = 4;
pub const BIAS_FACTOR: Weight = 5.0;

/// trait for random generation, mainly (strictly?) for testing
pub trait Arbitrary {
    fn random() -> Self;
}

/// progress bar
pub fn progress(n: usize) -> indicatif::ProgressBar {
    let tick = std::time::Duration::from_secs(5);
    let style = "{spinner:.cyan} {elapsed} ~ {percent:>3}% {wide_bar:.cyan}";
    let style = indicatif::ProgressStyle::with_template(style).unwrap();
    let progress = indicatif::ProgressBar::new(n as u64);
    progress.set_style(style);
    progress.enable_steady_tick(tick);
    progress
}

/// initialize logging to terminal and a timestamped file
pub fn init() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
