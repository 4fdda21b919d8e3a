use std::{env, io::Write};

use regex_bench::error::Error;

mod args;
mod cmd;
mod logger;
mod util;

fn main() -> anyhow::Result<()> {
    let rust_log = env::var("RUST_LOG").ok();
    logger::Logger::init(logger::level(rust_log.as_deref())?)?;

    if let Err(err) = cmd::run(&mut lexopt::Parser::from_env()) {
        let mut stderr = std::io::stderr();
        // If stderr is gone, the exit code is all that is left to report.
        let _ = if env::var("RUST_BACKTRACE").map_or(false, |v| v == "1") {
            writeln!(stderr, "{:?}", err)
        } else {
            writeln!(stderr, "{:#}", err)
        };
        let code = err.downcast_ref::<Error>().map_or(1, |e| e.exit_code());
        std::process::exit(code);
    }
    Ok(())
}
