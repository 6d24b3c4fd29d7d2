//! Creamery CLI - drive the cart and checkout from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in with a token issued by the auth service
//! creamery session login --token "$JWT"
//!
//! # Add a product (looked up through the API) and look at the cart
//! creamery cart add 65f0c0ffee --quantity 4
//! creamery cart show
//!
//! # Place the order
//! creamery checkout --payment cod --phone 9876543210 --address "12 MG Road" \
//!     --city Bengaluru --state KA --pincode 560001
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and change the current identity's cart
//! - `session` - Store or drop the session token and cached profile
//! - `checkout` - Run the delivery/review/payment flow and submit the order

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use creamery_storefront::config::StorefrontConfig;
use creamery_storefront::error::AppError;
use creamery_storefront::state::AppState;

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "creamery")]
#[command(author, version, about = "Creamery storefront cart and checkout")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the stored session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Place an order for everything in the cart
    Checkout(CheckoutArgs),
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show,
    /// Add a product
    Add {
        /// Product ID
        product_id: String,

        /// Quantity (defaults to the product's minimum order)
        #[arg(short, long)]
        quantity: Option<u32>,

        /// Unit price; skips the product lookup when given
        #[arg(long)]
        price: Option<Decimal>,

        /// Display name, used with --price
        #[arg(long, requires = "price")]
        name: Option<String>,
    },
    /// Remove a product
    Remove {
        /// Product ID
        product_id: String,
    },
    /// Set a product's quantity; 0 or below removes it
    Set {
        /// Product ID
        product_id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove everything from the current identity's cart
    Clear,
    /// Toggle the cart drawer
    Toggle,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Store a session token and optional cached profile
    Login {
        /// JWT issued by the auth service
        #[arg(short, long)]
        token: String,

        /// Profile JSON to cache under the `user` key
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Forget the session token and cached profile
    Logout,
    /// Show who the cart currently belongs to
    Whoami,
}

/// Delivery and payment details for checkout.
///
/// Blank fields are filled from the user's profile unless `--no-prefill`.
#[derive(Args)]
struct CheckoutArgs {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    pincode: Option<String>,

    /// Payment method (`cod`, `upi`, `card`)
    #[arg(long, default_value = "cod")]
    payment: String,
    #[arg(long)]
    upi_id: Option<String>,
    #[arg(long)]
    card_number: Option<String>,
    #[arg(long)]
    card_expiry: Option<String>,
    #[arg(long)]
    card_cvv: Option<String>,

    /// Do not fill blank fields from the profile
    #[arg(long)]
    no_prefill: bool,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "creamery_storefront=info,creamery_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            fail(&AppError::from(e));
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        fail(&e);
    }
}

#[allow(clippy::print_stderr)]
fn fail(error: &AppError) -> ! {
    error.report();
    eprintln!("error: {}", error.user_message());
    std::process::exit(1);
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), AppError> {
    let state = AppState::new(config)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state),
            CartAction::Add {
                product_id,
                quantity,
                price,
                name,
            } => commands::cart::add(&state, &product_id, quantity, price, name).await?,
            CartAction::Remove { product_id } => commands::cart::remove(&state, &product_id),
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(&state, &product_id, quantity),
            CartAction::Clear => commands::cart::clear(&state),
            CartAction::Toggle => commands::cart::toggle(&state),
        },
        Commands::Session { action } => match action {
            SessionAction::Login { token, profile } => {
                commands::session::login(&state, &token, profile.as_deref())?;
            }
            SessionAction::Logout => commands::session::logout(&state)?,
            SessionAction::Whoami => commands::session::whoami(&state),
        },
        Commands::Checkout(args) => commands::checkout::run(&state, args.into()).await?,
    }
    Ok(())
}

impl From<CheckoutArgs> for commands::checkout::CheckoutInput {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            delivery: creamery_storefront::services::DeliveryDetails {
                first_name: args.first_name.unwrap_or_default(),
                last_name: args.last_name.unwrap_or_default(),
                email: args.email.unwrap_or_default(),
                phone: args.phone.unwrap_or_default(),
                address: args.address.unwrap_or_default(),
                city: args.city.unwrap_or_default(),
                state: args.state.unwrap_or_default(),
                pincode: args.pincode.unwrap_or_default(),
            },
            payment: args.payment,
            payment_details: creamery_core::PaymentDetails {
                upi_id: args.upi_id,
                card_number: args.card_number,
                card_expiry: args.card_expiry,
                card_cvv: args.card_cvv,
            },
            prefill: !args.no_prefill,
        }
    }
}
