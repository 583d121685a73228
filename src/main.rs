use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use district_shapes::{Pipeline, PipelineConfig, Region, ResumePolicy, SystemToolchain};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn cli() -> Command {
    Command::new("district-shapes")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Normalizes, clips and reprojects legislative district boundaries")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .num_args(1)
                .global(true)
                .help("TOML configuration file (defaults are used when omitted)"),
        )
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .num_args(1)
                .global(true)
                .help("Root holding the fetch, process, clipped, depointed and clean directories"),
        )
        .arg(
            Arg::new("region")
                .short('r')
                .long("region")
                .num_args(1)
                .action(ArgAction::Append)
                .value_parser(["house", "senate", "state"])
                .global(true)
                .help("Restrict the run to a region (repeatable)"),
        )
        .arg(
            Arg::new("resume")
                .long("resume")
                .num_args(1)
                .value_parser(["exists", "manifest"])
                .global(true)
                .help("Skip finished steps by output existence or by manifest hashes"),
        )
        .subcommand(
            Command::new("normalize")
                .about("Convert fetched shapefiles and normalize their properties"),
        )
        .subcommand(
            Command::new("depoint").about("Strip point parts from clipped files"),
        )
        .subcommand(
            Command::new("clean").about("Clip, depoint and reproject normalized files"),
        )
        .subcommand(Command::new("run").about("normalize, then clean"))
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<PipelineConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => PipelineConfig::load(&PathBuf::from(path))
            .with_context(|| format!("loading config {}", path))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = matches.get_one::<String>("data-dir") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(regions) = matches.get_many::<String>("region") {
        config.regions = regions
            .map(|r| r.parse::<Region>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(anyhow::Error::msg)?;
    }
    if let Some(resume) = matches.get_one::<String>("resume") {
        config.resume = resume.parse::<ResumePolicy>().map_err(anyhow::Error::msg)?;
    }
    Ok(config)
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let Some((command, sub)) = matches.subcommand() else {
        anyhow::bail!("no command given");
    };
    let config = load_config(sub)?;
    let tools = SystemToolchain::new(config.tools.clone());
    let mut pipeline = Pipeline::new(&config, &tools)?;

    match command {
        "normalize" => {
            let report = pipeline.normalize()?;
            info!(written = report.written.len(), "normalize finished");
        }
        "depoint" => {
            for &region in &config.regions {
                let cleaned = pipeline.depoint_region(region)?;
                info!(region = %region, cleaned, "depoint finished");
            }
        }
        "clean" => {
            let report = pipeline.clean()?;
            info!(?report, "clean finished");
        }
        "run" => {
            let report = pipeline.run()?;
            info!(?report, "run finished");
        }
        other => anyhow::bail!("unknown command {}", other),
    }
    Ok(())
}

fn main() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    match run(&matches) {
        Ok(()) => info!("processing completed successfully"),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
