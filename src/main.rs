use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use lmchat::cli::Commands;
use lmchat::connector::tui::{self, AppConfig};
use lmchat::{
    ChatSession, ClientConfig, ConnectUseCase, ConversationHistoryUseCase, Endpoint,
    InMemoryConversationRepository, InferenceClientFactory, ListModelsUseCase,
    MockInferenceClient, ModelParameters, OpenAiCompatClientFactory, SendMessageUseCase,
};

const MOCK_CHUNK_DELAY: Duration = Duration::from_millis(40);

#[derive(Parser)]
#[command(name = "lmchat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Server base URL (overrides LMCHAT_BASE_URL)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Model id to use (overrides LMCHAT_MODEL)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Bearer token for servers that require one (overrides LMCHAT_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[arg(long, global = true)]
    temperature: Option<f32>,

    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    #[arg(long, global = true)]
    top_p: Option<f32>,

    #[arg(long, global = true)]
    top_k: Option<u32>,

    /// Use the built-in offline echo backend instead of a server
    #[arg(long, global = true)]
    mock: bool,

    /// Write logs to this file (the chat screen discards them otherwise)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn parameters(&self) -> ModelParameters {
        ModelParameters {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            top_k: self.top_k,
        }
    }
}

fn init_logging(cli: &Cli, interactive: bool) -> Result<()> {
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false);

    match (&cli.log_file, interactive) {
        (Some(path), _) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let subscriber = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        (None, true) => {
            let subscriber = builder.with_writer(std::io::sink).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        (None, false) => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or_default();
    init_logging(&cli, matches!(command, Commands::Chat { .. }))?;

    let config = ClientConfig::from_env().with_overrides(
        cli.endpoint.clone(),
        cli.model.clone(),
        cli.api_key.clone(),
    );

    let factory: Arc<dyn InferenceClientFactory> = if cli.mock {
        info!("Using mock inference backend");
        Arc::new(MockInferenceClient::new().with_chunk_delay(MOCK_CHUNK_DELAY))
    } else {
        Arc::new(OpenAiCompatClientFactory::new(config.api_key.clone()))
    };

    match command {
        Commands::Chat {
            no_connect,
            system,
            export_dir,
        } => {
            let mut session = ChatSession::new().with_parameters(cli.parameters());
            if let Some(prompt) = system {
                session = session.with_system_prompt(prompt);
            }
            if let Some(model) = &config.model {
                session.select_model(model.clone());
            }

            let history = ConversationHistoryUseCase::new(Arc::new(
                InMemoryConversationRepository::new(),
            ));
            tui::run(AppConfig {
                endpoint: config.base_url.clone(),
                auto_connect: !no_connect,
                session,
                connect: Arc::new(ConnectUseCase::new(factory)),
                history: Arc::new(history),
                export_dir: expand_tilde(&export_dir).into(),
            })
            .await?;
        }

        Commands::Ask { prompt, system } => {
            let endpoint = Endpoint::parse(&config.base_url)?;
            let client = factory.create(&endpoint);

            let mut session = ChatSession::new().with_parameters(cli.parameters());
            if let Some(system) = system {
                session = session.with_system_prompt(system);
            }
            match &config.model {
                Some(model) => session.select_model(model.clone()),
                None => {
                    ListModelsUseCase::new(client.clone())
                        .load_into(&mut session)
                        .await?;
                }
            }
            let Some(model) = session.selected_model() else {
                bail!("No model available at {endpoint}; pass --model");
            };
            info!("Asking {} via {}", model, endpoint);

            let mut stdout = std::io::stdout();
            let use_case = SendMessageUseCase::new(client);
            let mut write_error = None;
            use_case
                .execute(&mut session, &prompt, &mut |chunk: &str| {
                    if write_error.is_none() {
                        write_error = write_chunk(&mut stdout, chunk).err();
                    }
                })
                .await?;
            if let Some(e) = write_error {
                bail!("Failed to write reply to stdout: {e}");
            }
            println!();
        }

        Commands::Models => {
            let endpoint = Endpoint::parse(&config.base_url)?;
            let use_case = ListModelsUseCase::new(factory.create(&endpoint));
            let models = use_case.execute().await?;

            if models.is_empty() {
                println!("No models available at {endpoint}.");
            } else {
                println!("Models at {endpoint}:\n");
                for model in models {
                    let marker = if config.model.as_deref() == Some(model.id()) {
                        "*"
                    } else {
                        " "
                    };
                    println!(" {} {} ({})", marker, model.name(), model.id());
                }
            }
        }

        Commands::Ping => {
            let connect = ConnectUseCase::new(factory);
            let connection = connect.execute(&config.base_url).await?;
            println!("Connected to {}", connection.endpoint);
        }
    }

    Ok(())
}

fn write_chunk(out: &mut impl Write, chunk: &str) -> std::io::Result<()> {
    out.write_all(chunk.as_bytes())?;
    out.flush()
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn chat_is_the_default_command() {
        let cli = Cli::try_parse_from(["lmchat"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(
            cli.command.unwrap_or_default(),
            Commands::Chat { no_connect: false, .. }
        ));
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "lmchat",
            "ask",
            "hello",
            "--endpoint",
            "http://10.0.0.5:1234",
            "--temperature",
            "0.3",
        ])
        .unwrap();

        assert_eq!(cli.endpoint.as_deref(), Some("http://10.0.0.5:1234"));
        assert_eq!(cli.parameters().temperature, Some(0.3));
        assert_eq!(
            cli.command,
            Some(Commands::Ask {
                prompt: "hello".to_string(),
                system: None
            })
        );
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_chunk_reports_closed_pipe() {
        let err = write_chunk(&mut ClosedPipe, "hello").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);

        let mut buf = Vec::new();
        write_chunk(&mut buf, "hello").unwrap();
        assert_eq!(buf, b"hello");
    }

    #[test]
    fn expand_tilde_leaves_relative_paths() {
        assert_eq!(expand_tilde("./exports"), "./exports");
    }
}
