mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use pi_api_types::{SharePlatform, ShareRequest, SignalType};

use commands::CommandContext;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// podintel CLI -- query the podcast intelligence dashboard from a terminal.
#[derive(Parser)]
#[command(name = "podintel", version, about)]
struct Cli {
    /// podintel server URL (dashboard and search go through it).
    #[arg(
        long,
        env = "PODINTEL_URL",
        default_value = "http://localhost:3000",
        global = true
    )]
    api_url: String,

    /// Intelligence API URL (analytics, signals and sharing).
    #[arg(
        long,
        env = "API_URL",
        default_value = "http://localhost:8000",
        global = true
    )]
    upstream_url: String,

    /// Use generated demo data instead of live data (default follows USE_MOCK_DATA).
    #[arg(long, global = true)]
    demo: bool,

    /// Print raw JSON instead of a summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the latest episode briefs (default when no subcommand is given).
    Dashboard,

    /// Search episodes.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Weekly mention counts per topic.
    Velocity {
        #[arg(long, default_value_t = 12)]
        weeks: u32,
        /// Comma-separated topic names.
        #[arg(long, value_delimiter = ',')]
        topics: Vec<String>,
    },

    /// Weekly sentiment per topic.
    Sentiment {
        #[arg(long, default_value_t = 12)]
        weeks: u32,
        #[arg(long, value_delimiter = ',')]
        topics: Vec<String>,
    },

    /// List extracted signals (live only).
    Signals {
        #[arg(long = "type", value_enum)]
        signal_type: Option<SignalArg>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Share an episode by email or Slack (live only).
    Share {
        episode_id: String,
        #[arg(long, value_enum, default_value_t = PlatformArg::Email)]
        platform: PlatformArg,
        #[arg(long)]
        recipient: Option<String>,
        #[arg(long)]
        include_summary: bool,
        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SignalArg {
    Investable,
    Competitive,
    Portfolio,
    SoundBite,
}

impl From<SignalArg> for SignalType {
    fn from(arg: SignalArg) -> Self {
        match arg {
            SignalArg::Investable => SignalType::Investable,
            SignalArg::Competitive => SignalType::Competitive,
            SignalArg::Portfolio => SignalType::Portfolio,
            SignalArg::SoundBite => SignalType::SoundBite,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PlatformArg {
    Email,
    Slack,
}

impl From<PlatformArg> for SharePlatform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Email => SharePlatform::Email,
            PlatformArg::Slack => SharePlatform::Slack,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mode = commands::initial_mode(cli.demo, |key| std::env::var(key).ok())?;
    let ctx = CommandContext::new(&cli.api_url, &cli.upstream_url, mode, cli.json);

    match cli.command {
        None | Some(Commands::Dashboard) => commands::dashboard::run(&ctx).await?,
        Some(Commands::Search {
            query,
            limit,
            offset,
        }) => commands::search::run(&ctx, query, limit, offset).await?,
        Some(Commands::Velocity { weeks, topics }) => {
            commands::analytics::velocity(&ctx, weeks, topics).await?
        }
        Some(Commands::Sentiment { weeks, topics }) => {
            commands::analytics::sentiment(&ctx, weeks, topics).await?
        }
        Some(Commands::Signals { signal_type, limit }) => {
            commands::signals::run(&ctx, signal_type.map(Into::into), limit).await?
        }
        Some(Commands::Share {
            episode_id,
            platform,
            recipient,
            include_summary,
            note,
        }) => {
            let request = ShareRequest {
                episode_id,
                platform: platform.into(),
                recipient,
                include_summary: include_summary.then_some(true),
                personal_note: note,
            };
            commands::share::run(&ctx, request).await?
        }
    }

    Ok(())
}
