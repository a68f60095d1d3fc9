use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Interactive terminal chat (the default)
    Chat {
        /// Wait for Enter in the endpoint bar instead of connecting on start
        #[arg(long)]
        no_connect: bool,

        /// System prompt sent ahead of every conversation
        #[arg(short, long)]
        system: Option<String>,

        /// Directory for conversations exported with Ctrl+S
        #[arg(long, default_value = ".")]
        export_dir: String,
    },

    /// Send a single prompt and stream the reply to stdout
    Ask {
        prompt: String,

        /// System prompt sent ahead of the user prompt
        #[arg(short, long)]
        system: Option<String>,
    },

    /// List models offered by the server
    Models,

    /// Check that the server answers GET /v1/models
    Ping,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Chat {
            no_connect: false,
            system: None,
            export_dir: ".".to_string(),
        }
    }
}
