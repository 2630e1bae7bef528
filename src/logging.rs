/// Sends log records to stderr.
///
/// The level comes from the `LEVEL` environment variable (`TRACE`, `DEBUG` or `INFO`). Anything else
/// leaves it at `WARN`, so a healthy run prints nothing besides the status line.
pub fn init_logging() -> Result<(), log::SetLoggerError> {
    use chrono::{DateTime, Utc};

    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            let now: DateTime<Utc> = Utc::now();
            out.finish(format_args!(
                "[{} {} {}] {}",
                now.format("%Y-%m-%dT%H:%M:%S%.fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level_from_env(&std::env::var("LEVEL").unwrap_or_default()))
        .chain(std::io::stderr());

    dispatch.apply()
}

fn level_from_env(level: &str) -> log::LevelFilter {
    match level {
        "TRACE" => log::LevelFilter::Trace,
        "DEBUG" => log::LevelFilter::Debug,
        "INFO" => log::LevelFilter::Info,
        _ => log::LevelFilter::Warn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert_eq!(level_from_env("DEBUG"), log::LevelFilter::Debug);
        assert_eq!(level_from_env("TRACE"), log::LevelFilter::Trace);
        assert_eq!(level_from_env(""), log::LevelFilter::Warn);
        assert_eq!(level_from_env("debug"), log::LevelFilter::Warn);
    }
}
