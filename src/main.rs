//! Crypto Advisor CLI
//!
//! Command-line front end for the Crypto Advisor client:
//! - Log in, register and complete onboarding
//! - Show the personalized dashboard and news
//! - Vote on dashboard sections and articles

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use crypto_advisor::config::{generate_default_config, Config, LoggingConfig};
use crypto_advisor::dashboard::{DashboardViewModel, Outcome};
use crypto_advisor::feedback::{Section, SubjectKey, VoteDirection, VoteOutcome};
use crypto_advisor::news::{format_time_ago, NewsFeedView};
use crypto_advisor::session::{
    Credentials, LifecycleKind, LifecycleState, OnboardingPreferences, RegistrationForm,
};
use crypto_advisor::{AdvisorClient, DashboardSnapshot};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "crypto-advisor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Personalized crypto dashboard in your terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: platform config dir, then ./config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current session state
    Status,

    /// Log in with email and password
    Login {
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Create an account (log in afterwards)
    Register {
        email: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        password: String,
    },

    /// Complete the onboarding questionnaire
    Onboard {
        /// Coins of interest (repeatable), e.g. --interest Bitcoin
        #[arg(short, long = "interest")]
        interests: Vec<String>,
        /// Investor type: HODLer, Day Trader, NFT Collector
        #[arg(short = 't', long)]
        investor_type: Option<String>,
        /// Content preferences (repeatable), e.g. --content "Market News"
        #[arg(long = "content")]
        content: Vec<String>,
    },

    /// Show prices, AI insight, meme and news
    Dashboard,

    /// Fetch a new AI insight
    RefreshInsight,

    /// Show the news feed
    News,

    /// Like or dislike a dashboard section or a news article
    Vote {
        /// Section (prices, ai, meme) or article id with --article
        subject: String,
        /// up/like or down/dislike
        direction: VoteDirection,
        /// Treat the subject as a news article id
        #[arg(long)]
        article: bool,
    },

    /// End the session and forget stored credentials
    Logout,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("crypto_advisor={}", logging.level).into());

    let json = logging.format.eq_ignore_ascii_case("json");
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let pretty_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("writing config to {}", path.display()))?;
                println!("Config written to {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let client = AdvisorClient::from_config(&config)?;

    match cli.command {
        Commands::Status => status(&client, cli.json).await?,

        Commands::Login { email, password } => {
            let kind = client
                .session()
                .login(&Credentials::new(email, password))
                .await?;
            match kind {
                LifecycleKind::Onboarding => {
                    println!("Logged in. Complete onboarding with `crypto-advisor onboard`.")
                }
                _ => println!("Logged in."),
            }
        }

        Commands::Register {
            email,
            name,
            password,
        } => {
            let user = client
                .session()
                .register(&RegistrationForm::new(email, name, password))
                .await?;
            client.session().back_to_login().await?;
            println!(
                "Account created for {} <{}>. Log in with `crypto-advisor login`.",
                user.name, user.email
            );
        }

        Commands::Onboard {
            interests,
            investor_type,
            content,
        } => {
            let preferences = OnboardingPreferences {
                crypto_interests: interests.into_iter().collect(),
                investor_type,
                content_preferences: content.into_iter().collect(),
            };
            client.session().complete_onboarding(&preferences).await?;
            println!("Preferences saved. Run `crypto-advisor dashboard`.");
        }

        Commands::Dashboard => {
            let snapshot = applied(client.enter_dashboard().await?)?;
            if cli.json {
                print_json(&snapshot)?;
            } else {
                print_snapshot(&client, &snapshot).await;
            }
        }

        Commands::RefreshInsight => {
            let insight = applied(client.dashboard().refresh_insight().await?)?;
            if cli.json {
                print_json(&serde_json::json!({ "insight": insight }))?;
            } else {
                println!("{}", insight);
            }
        }

        Commands::News => {
            let view = applied(client.news().load().await?)?;
            if cli.json {
                print_json(&view)?;
            } else {
                print_news(&client, &view).await;
            }
        }

        Commands::Vote {
            subject,
            direction,
            article,
        } => {
            let key = if article {
                SubjectKey::article(subject)
            } else {
                SubjectKey::Section(subject.parse::<Section>()?)
            };
            match client.feedback().submit_vote(key.clone(), direction).await? {
                VoteOutcome::Recorded(vote) => println!("Recorded {} vote on {}", vote, key),
                VoteOutcome::AlreadyPending => println!("A vote on {} is already in progress", key),
                VoteOutcome::Discarded => bail!("Session ended before the vote completed"),
            }
        }

        Commands::Logout => {
            client.logout().await;
            println!("Logged out.");
        }

        // Handled before the client is built
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn applied<T>(outcome: Outcome<T>) -> anyhow::Result<T> {
    match outcome {
        Outcome::Applied(value) => Ok(value),
        Outcome::Discarded => bail!("Session expired, please log in again"),
    }
}

#[derive(Serialize)]
struct StatusReport<'a> {
    state: LifecycleKind,
    user_id: Option<&'a str>,
    name: Option<&'a str>,
    investor_type: Option<&'a str>,
}

async fn status(client: &AdvisorClient, json: bool) -> anyhow::Result<()> {
    let state = client.session().state().await;
    let profile = match &state {
        LifecycleState::Onboarding(session) | LifecycleState::Dashboard(session) => {
            Some(&session.profile)
        }
        LifecycleState::Unauthenticated | LifecycleState::RegistrationPending => None,
    };

    let report = StatusReport {
        state: state.kind(),
        user_id: profile.map(|p| p.user_id.as_str()),
        name: profile.map(|p| p.name.as_str()),
        investor_type: profile.and_then(|p| p.investor_type.as_deref()),
    };

    if json {
        return print_json(&report);
    }

    match profile {
        Some(profile) => println!("{} ({}) - {}", profile.name, profile.email, report.state),
        None => println!("{}", report.state),
    }
    Ok(())
}

fn vote_marker(votes: &HashMap<Section, VoteDirection>, section: Section) -> &'static str {
    match votes.get(&section) {
        Some(VoteDirection::Up) => " [liked]",
        Some(VoteDirection::Down) => " [disliked]",
        None => "",
    }
}

async fn print_snapshot(client: &AdvisorClient, snapshot: &DashboardSnapshot) {
    let view: &DashboardViewModel = &snapshot.dashboard;
    let votes = &snapshot.section_votes;

    println!("== Prices{}", vote_marker(votes, Section::Prices));
    for quote in &view.prices {
        println!(
            "  {:<12} {:>14} {:>8}",
            quote.symbol,
            quote.price_display,
            quote.change_display()
        );
    }

    println!("\n== AI Insight{}", vote_marker(votes, Section::Ai));
    println!("  {}", view.ai_insight);

    println!("\n== Meme{}", vote_marker(votes, Section::Meme));
    match &view.meme {
        Some(meme) => {
            println!("  {} ({}, {})", meme.title, meme.source, meme.author);
            println!("  {}", meme.url);
            if let Some(link) = &meme.reddit_url {
                println!("  {}", link);
            }
        }
        None => println!("  No meme available right now"),
    }

    println!();
    print_news(client, &snapshot.news).await;

    if let Some(updated) = view.last_updated {
        println!("\nLast updated {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
    }
}

async fn print_news(client: &AdvisorClient, view: &NewsFeedView) {
    println!("== News");
    if view.articles.is_empty() {
        println!("  No news available right now");
        return;
    }

    let now = Utc::now();
    for article in &view.articles {
        let marker = match client.news().article_vote(&article.id).await {
            Some(VoteDirection::Up) => " [liked]",
            Some(VoteDirection::Down) => " [disliked]",
            None => "",
        };
        println!("  [{}] {}{}", article.id, article.title, marker);
        println!(
            "      {} - {}  {}",
            format_time_ago(&article.published_at_display, now),
            article.source,
            article.url
        );
    }
}
