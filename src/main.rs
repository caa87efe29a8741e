use anyhow::Result;
use clap::Parser;
use tach_map::config::{self, Cli, Commands, OutputFormat};
use tach_map::environment;
use tach_map::reporter::{report_map, HumanReporter, JsonReporter, Reporter};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    init_logging();
    let cli = Cli::parse();

    let mut reporter: Box<dyn Reporter> = match cli.format {
        OutputFormat::Human => Box::new(HumanReporter),
        OutputFormat::Json => Box::new(JsonReporter),
    };

    if let Err(e) = run(&cli, reporter.as_mut()) {
        reporter.on_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: &Cli, reporter: &mut dyn Reporter) -> Result<()> {
    match cli.command.clone().unwrap_or(Commands::Vars) {
        Commands::Vars => {
            let vars = config::resolve_vars(cli)?;
            info!(count = vars.len(), "resolved configuration variables");
            report_map("vars", vars.as_map(), reporter);
        }
        Commands::Env => {
            let base = environment::capture_environment()?;
            let overrides = config::load_env_overrides(&cli.root)?;
            let effective = environment::overlay(&base, &overrides)?;
            info!(
                captured = base.len(),
                overrides = overrides.len(),
                "resolved test environment"
            );
            report_map("env", &effective, reporter);
        }
    }
    Ok(())
}

/// Logs go to stderr so JSON output on stdout stays clean
fn init_logging() {
    let filter = EnvFilter::try_from_env("TACH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
