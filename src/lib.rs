//! # Crypto Advisor
//!
//! Client for the Crypto Advisor service: session lifecycle, a personalized
//! dashboard aggregated from several remote sources, and like/dislike
//! feedback on dashboard sections and news articles.
//!
//! ## Features
//!
//! - **Session lifecycle**: login, registration, onboarding and logout with
//!   credentials persisted across restarts
//! - **Dashboard aggregation**: prices, AI insight and meme fetched
//!   concurrently, each with fallback content
//! - **Feedback**: last-write-wins votes with one in-flight submission per subject
//! - **News**: curated articles with relative publication times
//!
//! ## Modules
//!
//! - [`gateway`]: Request/response seam over HTTP
//! - [`backend`]: Typed backend endpoints
//! - [`session`]: Lifecycle state machine
//! - [`dashboard`]: Dashboard aggregation and fallbacks
//! - [`feedback`]: Vote submission and preload
//! - [`news`]: News feed
//! - [`client`]: Façade wiring the components together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crypto_advisor::client::AdvisorClient;
//! use crypto_advisor::config::Config;
//! use crypto_advisor::session::{Credentials, LifecycleKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AdvisorClient::from_config(&Config::load_default())?;
//!
//!     if client.session().kind().await == LifecycleKind::Unauthenticated {
//!         client
//!             .session()
//!             .login(&Credentials::new("ada@example.com", "secret"))
//!             .await?;
//!     }
//!
//!     if let Some(snapshot) = client.enter_dashboard().await?.applied() {
//!         for quote in &snapshot.dashboard.prices {
//!             println!("{} {} ({})", quote.symbol, quote.price_display, quote.change_display());
//!         }
//!         println!("{}", snapshot.dashboard.ai_insight);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod feedback;
pub mod gateway;
pub mod news;
pub mod session;

pub use client::{AdvisorClient, ClientError, DashboardSnapshot};
pub use config::Config;
pub use session::{LifecycleKind, SessionError, SessionMachine};
