mod cli;
mod error_fmt;
mod journal;
mod watch;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use eyre::WrapErr;
use tracing_subscriber::EnvFilter;
use weigh_core::parse_frame;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    match cli.cmd {
        Commands::Decode { protocol, frame } => {
            match parse_frame(&frame, protocol.into()) {
                Some(kg) => println!("{kg}"),
                None => eyre::bail!("frame not recognized: {frame:?}"),
            }
            Ok(())
        }
        Commands::Ports => {
            let ports = weigh_link::available_ports()?;
            if ports.is_empty() {
                eprintln!("no serial devices found");
            }
            for port in ports {
                println!("{port}");
            }
            Ok(())
        }
        Commands::Watch {
            operator,
            simulate,
            simulate_kg,
            roster,
            link_name,
            settle_secs,
            journal,
            duration_ms,
        } => {
            let cfg = load_config(&cli.config)?;
            cfg.validate()?;
            init_tracing(cli.json, &cli.log_level, &cfg.logging);
            watch::run(
                &cfg,
                watch::WatchOpts {
                    operator,
                    simulate,
                    simulate_kg,
                    roster,
                    link_name,
                    settle_secs,
                    journal,
                    duration_ms,
                },
            )
        }
    }
}

/// Load the TOML config. A missing file falls back to defaults, which is
/// enough for --simulate and --roster runs; hardware runs via [[scales]]
/// fail later with a pointer here.
fn load_config(path: &std::path::Path) -> eyre::Result<weigh_config::Config> {
    if !path.exists() {
        return Ok(weigh_config::Config::default());
    }
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    weigh_config::load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))
}

fn init_tracing(json: bool, level: &str, logging: &weigh_config::Logging) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_deref().unwrap_or(level)));

    if let Some(file) = &logging.file {
        let path = std::path::Path::new(file);
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = dir.unwrap_or_else(|| std::path::Path::new("."));
        let name = path.file_name().map_or_else(
            || std::ffi::OsString::from("weigh.log"),
            std::ffi::OsStr::to_os_string,
        );
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false);
        if json {
            builder.json().init();
        } else {
            builder.init();
        }
    } else {
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        if json {
            builder.json().init();
        } else {
            builder.init();
        }
    }
}
