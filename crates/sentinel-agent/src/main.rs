use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use sentinel_agent::replay::{load_script, run_script};
use sentinel_agent::{DiagnosticAgent, JsonLinesTransport, NoHost};
use sentinel_core::{AgentConfig, Classifier, Transport};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Command::new("sentinel")
        .version(sentinel_agent::VERSION)
        .about("In-page diagnostic agent for embedded previews")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("replay")
                .about("Replay a JSON-lines event script and print host messages")
                .arg(
                    Arg::new("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Event script"),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("top-level")
                        .long("top-level")
                        .action(ArgAction::SetTrue)
                        .help("Run as a page with no host frame"),
                )
                .arg(
                    Arg::new("settle-ms")
                        .long("settle-ms")
                        .default_value("2000")
                        .value_parser(value_parser!(u64))
                        .help("Time to wait for pending timers after the last step"),
                ),
        )
        .subcommand(
            Command::new("classify")
                .about("Print the severity of an error message")
                .arg(Arg::new("message").required(true).help("Error message"))
                .arg(config_arg())
                .arg(
                    Arg::new("file")
                        .long("file")
                        .help("File the error came from"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration as TOML")
                .arg(config_arg()),
        );

    let matches = cli.get_matches();
    let Some((name, args)) = matches.subcommand() else {
        anyhow::bail!("missing subcommand");
    };
    let config = load_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    match name {
        "replay" => {
            let Some(script) = args.get_one::<PathBuf>("script") else {
                anyhow::bail!("missing script path");
            };
            let settle_ms = args.get_one::<u64>("settle-ms").copied().unwrap_or(2000);
            let settle = Duration::from_millis(settle_ms);
            let steps = load_script(script)?;

            if args.get_flag("top-level") {
                replay(config, NoHost, &steps, settle).await
            } else {
                replay(config, JsonLinesTransport::new(std::io::stdout()), &steps, settle).await
            }
        }
        "classify" => {
            let message = args.get_one::<String>("message").map_or("", String::as_str);
            let file = args.get_one::<String>("file").map(String::as_str);
            let severity = Classifier::new(&config.patterns)?.classify(message, file);
            println!("{}", if severity.is_critical() { "critical" } else { "normal" });
            Ok(())
        }
        "config" => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        other => anyhow::bail!("unknown subcommand '{other}'"),
    }
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .value_parser(value_parser!(PathBuf))
        .help("TOML configuration file")
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AgentConfig> {
    let Some(path) = path else {
        return Ok(AgentConfig::default());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    AgentConfig::from_toml_str(&source)
        .with_context(|| format!("loading config {}", path.display()))
}

async fn replay<T>(
    config: AgentConfig,
    transport: T,
    steps: &[sentinel_agent::ScriptStep],
    settle: Duration,
) -> anyhow::Result<()>
where
    T: Transport + 'static,
{
    let agent = DiagnosticAgent::start(config, transport)?;
    let stats = run_script(&agent, steps, settle).await;
    agent.dispose();

    eprintln!("Session {}", stats.session_id);
    eprintln!("  Reports sent:          {}/{}", stats.reported_count, stats.max_reports);
    eprintln!("  Suppressed in grace:   {}", stats.counters.suppressed_in_grace);
    eprintln!("  Duplicates:            {}", stats.counters.duplicates);
    eprintln!("  Rate limited:          {}", stats.counters.rate_limited);
    eprintln!("  Authorization reports: {}", stats.counters.authorization_reports);
    eprintln!("  Manual copies:         {}", stats.counters.manual_copies);
    eprintln!("  Transport failures:    {}", stats.counters.transport_failures);
    Ok(())
}
