fn main() {
    env_logger::init();
    std::process::exit(sb_cli::run_cli_from_args(std::env::args_os()));
}
