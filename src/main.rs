use bitsy_agent::*;
use clap::Parser;

/// Takes no arguments: the spool path, debug address and clock are fixed.
#[derive(Parser, Debug)]
#[command(about, long_about = None, disable_help_flag = true, disable_version_flag = true)]
struct Args {}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args_os();
    let argv0 = args
        .next()
        .map(|argv0| argv0.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    // clap takes a lone `--` as the end of options, so count the arguments first
    if args.len() > 0 || Args::try_parse().is_err() {
        eprintln!("{}", AgentError::Usage(argv0));
        std::process::exit(1);
    }

    logging::init_logging()?;

    let config = Config::default();
    let engine = AgentEngine::new(design::top, config.start_paused);
    let mut harness = Harness::start(engine, &config, &mut std::io::stderr())?;
    match harness.run()? {}
}
