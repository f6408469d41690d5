mod cli;
mod logging;

fn main() {
    logging::init_cli_logger();
    std::process::exit(cli::run_from_env());
}
