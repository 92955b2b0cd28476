use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match data_dives::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("exiting with {err:?}");
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
