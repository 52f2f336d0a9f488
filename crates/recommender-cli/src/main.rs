// ============================================================================
// ai-recommend: terminal front-end for the product recommender
// ============================================================================
// Usage:
//   ai-recommend [chat]                       Interactive recommendation chat
//   ai-recommend recommend "QUERY"            One-shot recommendation
//   ai-recommend tip --phone P --amount A     Send an M-Pesa tip
//   ai-recommend transactions [--phone P]     Transaction history
//   ai-recommend status ID                    Tip status lookup
//   ai-recommend theme [show|toggle]          Show or flip the colour theme
// ============================================================================

mod render;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use recommender_core::config::ENV_API_URL;
use recommender_core::conversation::{ConversationState, Outcome, SubmitRejected};
use recommender_core::theme::{MemoryPreferenceStore, PreferenceStore};
use recommender_core::{
    ApiClient, ApiError, Backend, ClientConfig, HttpRecommendationService, MockRecommendationService,
    PreferenceDb, RecommendationApi, RecommendationResponse, RecommendationSession, ThemeSettings, TipForm, TipOutcome,
    TransactionList, TransactionSource, TransactionView,
};

use render::Palette;

/// AI product recommender with M-Pesa tipping
#[derive(Parser)]
#[command(name = "ai-recommend", version, about = "AI product recommendations in your terminal")]
struct Cli {
    /// Recommendation API base URL (overrides RECOMMENDER_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Use the built-in mock backend instead of the REST API
    #[arg(long, global = true)]
    mock: bool,

    /// Path to the preference database (default: ~/.ai-recommend/preferences.redb)
    #[arg(long, global = true)]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,

    /// Ask for recommendations once and print them
    Recommend {
        /// What you are looking for
        query: String,
    },

    /// Send an M-Pesa tip
    Tip {
        /// M-Pesa phone number, e.g. +254712345678
        #[arg(long)]
        phone: String,

        /// Amount in KSh
        #[arg(long)]
        amount: String,
    },

    /// Show transaction history
    Transactions {
        /// Phone number whose tips to list (required for the REST backend)
        #[arg(long)]
        phone: Option<String>,
    },

    /// Look up the status of a tip
    Status {
        /// Transaction id returned when the tip was sent
        id: String,
    },

    /// Show or toggle the colour theme
    Theme {
        #[arg(value_enum, default_value = "show")]
        action: ThemeAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeAction {
    Show,
    Toggle,
}

/// Backends behind the service traits
struct Services {
    api: Arc<dyn RecommendationApi>,
    http: Option<HttpRecommendationService>,
}

impl Services {
    fn build(cli: &Cli) -> Result<Self> {
        let config = ClientConfig::from_lookup(|key| {
            if key == ENV_API_URL {
                cli.api_url.clone().or_else(|| std::env::var(key).ok())
            } else {
                std::env::var(key).ok()
            }
        })?;
        let config = if cli.mock { config.with_backend(Backend::Mock) } else { config };

        match config.backend {
            Backend::Mock => {
                info!("Using mock backend");
                Ok(Self {
                    api: Arc::new(MockRecommendationService::new()),
                    http: None,
                })
            }
            Backend::Http => {
                info!("Using recommendation API at {}", config.base_url);
                let service = HttpRecommendationService::new(ApiClient::new(&config)?);
                Ok(Self {
                    api: Arc::new(service.clone()),
                    http: Some(service),
                })
            }
        }
    }

    /// REST history needs a phone number; everything else uses mock rows
    fn transactions(&self, phone: Option<&str>) -> Arc<dyn TransactionSource> {
        match (&self.http, phone) {
            (Some(http), Some(phone)) => Arc::new(http.history_for(phone)),
            (Some(_), None) => {
                warn!("No --phone given; showing sample transactions");
                Arc::new(MockRecommendationService::new())
            }
            (None, _) => Arc::new(MockRecommendationService::new()),
        }
    }
}

fn open_theme(db_path: Option<&str>) -> Result<ThemeSettings> {
    let store: Arc<dyn PreferenceStore> = match PreferenceDb::open(db_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            warn!("Preference database unavailable ({}); theme will not persist", e);
            Arc::new(MemoryPreferenceStore::default())
        }
    };
    ThemeSettings::init(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("recommender_core=info".parse()?)
                .add_directive("ai_recommend=info".parse()?),
        )
        .init();

    if let Err(e) = dotenv {
        debug!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();
    let mut theme = open_theme(cli.db_path.as_deref())?;
    let services = Services::build(&cli)?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => cmd_chat(&services, &mut theme).await,
        Commands::Recommend { query } => cmd_recommend(&services, &theme, &query).await,
        Commands::Tip { phone, amount } => cmd_tip(&services, &phone, &amount).await,
        Commands::Transactions { phone } => cmd_transactions(&services, &theme, phone.as_deref()).await,
        Commands::Status { id } => cmd_status(&services, &id).await,
        Commands::Theme { action } => cmd_theme(&mut theme, action),
    }
}

// ============================================================================
// One-shot commands
// ============================================================================

async fn cmd_recommend(services: &Services, theme: &ThemeSettings, query: &str) -> Result<()> {
    let palette = Palette::for_theme(theme.current());
    let mut session = RecommendationSession::new(services.api.clone());

    let outcome = session.submit(query).await.map_err(|e| anyhow!("{}", e))?;
    for turn in session.state().turns() {
        println!("{}", render::turn(turn, &palette));
    }
    println!();
    print!("{}", render::product_view(session.state().product_view(), &palette));
    if let Some(notice) = outcome.notice() {
        println!("{}", render::notice(notice));
    }
    match outcome {
        Outcome::Failed(_) => Err(anyhow!("recommendation request failed")),
        _ => Ok(()),
    }
}

async fn cmd_tip(services: &Services, phone: &str, amount: &str) -> Result<()> {
    let mut form = TipForm::new();
    form.open();
    form.set_phone_number(phone);
    form.set_amount(amount);

    println!("{}", "Sending STK push...".bright_black());
    let outcome = form.submit(services.api.as_ref()).await;
    if let Some(notice) = outcome.notice() {
        println!("{}", render::notice(notice));
    }
    match outcome {
        TipOutcome::Sent { response, .. } => {
            println!("Transaction: {} ({})", response.transaction_id, response.status);
            Ok(())
        }
        TipOutcome::Failed { error, .. } => Err(anyhow!("tip was not sent: {}", error)),
        _ => Err(anyhow!("tip was not sent")),
    }
}

async fn cmd_transactions(services: &Services, theme: &ThemeSettings, phone: Option<&str>) -> Result<()> {
    let palette = Palette::for_theme(theme.current());
    let mut list = TransactionList::new(services.transactions(phone));
    print!("{}", render::transaction_view(list.view(), &palette));
    list.load().await;
    if let Some(notice) = list.take_notice() {
        println!("{}", render::notice(&notice));
    }
    print!("{}", render::transaction_view(list.view(), &palette));
    load_result(list.view())
}

/// One-shot runs cannot prompt, so a failed load becomes the exit status
fn load_result(view: TransactionView<'_>) -> Result<()> {
    match view {
        TransactionView::RetryPrompt(message) => Err(anyhow!("{} (run the command again to retry)", message)),
        _ => Ok(()),
    }
}

async fn cmd_status(services: &Services, id: &str) -> Result<()> {
    let report = services.api.tip_status(id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_theme(theme: &mut ThemeSettings, action: ThemeAction) -> Result<()> {
    if let ThemeAction::Toggle = action {
        theme.toggle()?;
    }
    println!("Theme: {}", theme.current());
    Ok(())
}

// ============================================================================
// Interactive chat
// ============================================================================

const HELP: &str = "\
  <query>         ask for product recommendations
  /tip            support the tool with M-Pesa
  /transactions   show transaction history
  /theme          toggle light/dark theme
  /help           show this help
  /quit           exit";

type Reply = (u64, Result<RecommendationResponse, ApiError>);

async fn cmd_chat(services: &Services, theme: &mut ThemeSettings) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut state = ConversationState::new();
    let mut tip = TipForm::new();
    let (reply_tx, mut reply_rx) = mpsc::channel::<Reply>(8);

    let palette = Palette::for_theme(theme.current());
    println!("{}", render::heading("product_recommender", &palette));
    println!("{}", "Describe what you're looking for. /help lists commands.".color(palette.muted));
    println!();

    loop {
        // Replies to abandoned queries land here and are dropped as stale
        while let Ok((seq, result)) = reply_rx.try_recv() {
            let _ = state.complete(seq, result);
        }

        let palette = Palette::for_theme(theme.current());
        let line = match rl.readline("$ ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        match input {
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/theme" => {
                let next = theme.toggle()?;
                println!("Theme: {}", next);
            }
            "/transactions" => chat_transactions(services, &mut rl, &palette).await?,
            "/tip" => chat_tip(services, &mut rl, &mut tip).await?,
            _ if input.starts_with('/') => {
                println!("{}", format!("Unknown command {}. Try /help.", input).color(palette.muted));
            }
            query => {
                chat_query(services, &mut state, query, &reply_tx, &mut reply_rx, &palette).await;
            }
        }
    }

    println!("{}", "Goodbye!".bright_green());
    Ok(())
}

async fn chat_query(
    services: &Services,
    state: &mut ConversationState,
    query: &str,
    reply_tx: &mpsc::Sender<Reply>,
    reply_rx: &mut mpsc::Receiver<Reply>,
    palette: &Palette,
) {
    let pending = match state.begin(query) {
        Ok(pending) => pending,
        Err(SubmitRejected::Empty) => return,
        Err(e @ SubmitRejected::Busy) => {
            println!("{}", e.to_string().yellow());
            return;
        }
    };
    println!("{}", render::thinking(palette));

    let api = services.api.clone();
    let tx = reply_tx.clone();
    tokio::spawn(async move {
        let result = pending.send(api.as_ref()).await;
        let _ = tx.send((pending.seq, result)).await;
    });

    loop {
        tokio::select! {
            reply = reply_rx.recv() => {
                let Some((seq, result)) = reply else { return };
                let outcome = state.complete(seq, result);
                if outcome == Outcome::Discarded {
                    continue;
                }
                if let Some(turn) = state.turns().last() {
                    println!("{}", render::turn(turn, palette));
                }
                print!("{}", render::product_view(state.product_view(), palette));
                if let Some(notice) = outcome.notice() {
                    println!("{}", render::notice(notice));
                }
                return;
            }
            _ = tokio::signal::ctrl_c() => {
                state.abandon();
                println!("{}", "Stopped waiting for that answer.".yellow());
                return;
            }
        }
    }
}

async fn chat_tip(services: &Services, rl: &mut DefaultEditor, form: &mut TipForm) -> Result<()> {
    form.open();
    println!("{}", "$ support_free_tool()".bright_green());
    println!("{}", "Your appreciation helps maintain this free tool. No obligation!".bright_black());

    while form.is_open() {
        let phone = match rl.readline_with_initial("M-Pesa Phone Number: ", (form.phone_number(), "")) {
            Ok(phone) => phone,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                form.close();
                break;
            }
            Err(e) => return Err(e.into()),
        };
        form.set_phone_number(phone);

        let amount = match rl.readline_with_initial("Amount (KSh): ", (form.amount(), "")) {
            Ok(amount) => amount,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                form.close();
                break;
            }
            Err(e) => return Err(e.into()),
        };
        form.set_amount(amount);

        println!("{}", "Processing...".bright_black());
        let outcome = form.submit(services.api.as_ref()).await;
        if let Some(notice) = outcome.notice() {
            println!("{}", render::notice(notice));
        }
        if form.is_open() && !confirm(rl, "Try again? [y/N] ")? {
            form.close();
        }
    }
    Ok(())
}

async fn chat_transactions(services: &Services, rl: &mut DefaultEditor, palette: &Palette) -> Result<()> {
    let phone = rl.readline("Phone number (blank for sample data): ").unwrap_or_default();
    let phone = Some(phone.trim()).filter(|p| !p.is_empty());

    let mut list = TransactionList::new(services.transactions(phone));
    print!("{}", render::transaction_view(list.view(), palette));
    list.load().await;

    loop {
        if let Some(notice) = list.take_notice() {
            println!("{}", render::notice(&notice));
        }
        print!("{}", render::transaction_view(list.view(), palette));
        if !matches!(list.view(), TransactionView::RetryPrompt(_)) || !confirm(rl, "Retry? [y/N] ")? {
            return Ok(());
        }
        list = list.reload().await;
    }
}

fn confirm(rl: &mut DefaultEditor, prompt: &str) -> Result<bool> {
    match rl.readline(prompt) {
        Ok(answer) => Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_load_is_an_error() {
        let err = load_result(TransactionView::RetryPrompt("Failed to load transactions")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load transactions"));
        assert!(load_result(TransactionView::Empty).is_ok());
        assert!(load_result(TransactionView::Table(&[])).is_ok());
    }
}
