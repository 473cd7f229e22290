use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skillshell")]
#[command(about = "Skillshell CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and default files (config, data directory, bundled skills).
    Init {
        /// Config file path (default: SKILLSHELL_CONFIG_PATH or ~/.skillshell/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run one shell command, e.g. `skillshell exec equip.exec '{"name": "git-flow"}'`.
    Exec {
        /// Config file path (default: SKILLSHELL_CONFIG_PATH or ~/.skillshell/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Argument object merged under the command's inline JSON.
        #[arg(long, value_name = "JSON")]
        args: Option<String>,

        /// The command words (`nav`, `jump <id>`, `<id>.exec {...}`, `exec {...}`).
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Interactive shell; the tree position persists between commands.
    Repl {
        /// Config file path (default: SKILLSHELL_CONFIG_PATH or ~/.skillshell/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Serve the line-delimited JSON protocol on stdin/stdout.
    Serve {
        /// Config file path (default: SKILLSHELL_CONFIG_PATH or ~/.skillshell/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("skillshell {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Exec {
            config,
            args,
            command,
        }) => match run_exec(config, args, command).await {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => {
                log::error!("exec failed: {:#}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Repl { config }) => {
            if let Err(e) = run_repl(config).await {
                log::error!("repl failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config }) => {
            if let Err(e) = run_serve(config).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(skillshell::config::default_config_path);
    let dir = skillshell::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn build_shell(config_path: Option<PathBuf>) -> anyhow::Result<skillshell::router::Shell> {
    let (config, path) = skillshell::config::load_config(config_path)?;
    skillshell::init::require_initialized(&path, &config)?;
    Ok(skillshell::router::Shell::from_config(&config, &path))
}

/// Returns whether the command succeeded.
async fn run_exec(
    config_path: Option<PathBuf>,
    args: Option<String>,
    command: Vec<String>,
) -> anyhow::Result<bool> {
    let shell = build_shell(config_path)?;
    let args = match args {
        Some(raw) => Some(
            serde_json::from_str::<serde_json::Value>(&raw)
                .map_err(|e| anyhow::anyhow!("--args is not valid JSON: {}", e))?,
        ),
        None => None,
    };
    let response = shell.dispatch(&command.join(" "), args).await;
    if response.success {
        println!("{}", response.text());
    } else {
        eprintln!("{}", response.text());
    }
    Ok(response.success)
}

async fn run_repl(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let shell = build_shell(config_path)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("{}", shell.dispatch("nav", None).await.text());

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        println!("{}", shell.dispatch(input, None).await.text());
    }

    Ok(())
}

async fn run_serve(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let shell = build_shell(config_path)?;
    log::info!("serving {} on stdio", skillshell::transport::METHOD_RUN);
    skillshell::transport::serve_stdio(&shell).await
}
