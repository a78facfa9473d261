use glove_preprocess::Pipeline;
use log::{error, LevelFilter};
use std::env;
use std::process;

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"));
    builder.format_timestamp_millis();
    builder.filter_level(LevelFilter::Debug);
    let _ = builder.try_init();
}

fn main() {

    // verbosity from the config lowers the level once it is read
    init_logging();

    let args: Vec<String> = env::args().collect();
    if let Err(e) = Pipeline::run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}
