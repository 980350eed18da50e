use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use bistro::api::ApiClient;
use bistro::chat::ChatTranscript;
use bistro::config::{self, Config};
use bistro::db;
use bistro::error::Outcome;
use bistro::model::{CartOrderItem, MenuItem, Sender, SubmittedOrder};
use bistro::money;
use bistro::poller::{PollState, StatusPoller};
use bistro::session::SessionHolder;
use bistro::storefront::{
    CheckoutForm, Storefront, StorefrontError, EMPTY_CART_MESSAGE, EMPTY_MENU_MESSAGE,
    NO_ORDERS_MESSAGE,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Order from the restaurant in your terminal")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a sample config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Sign in and store the session
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BISTRO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// List the menu
    Menu,
    /// Add a menu item to the cart
    Add {
        /// Menu item id
        item: i64,
        #[arg(long, short, default_value_t = 1)]
        quantity: u32,
    },
    /// Show the cart and its total
    Cart,
    /// Remove one line from the cart
    Remove {
        /// Order id shown by `cart`
        orderid: String,
    },
    /// Place every cart item as an order
    Checkout {
        #[arg(long)]
        name: String,
        #[arg(long)]
        table: String,
        #[arg(long, default_value = "")]
        location: String,
    },
    /// Show submitted orders and their status
    Status {
        /// Keep refreshing until interrupted or signed out
        #[arg(long)]
        watch: bool,
    },
    /// Send feedback to the restaurant
    Feedback { text: Vec<String> },
    /// Chat with the support agent (one message, or interactive when omitted)
    Chat { message: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();

    if let Command::InitConfig { force } = &args.command {
        return init_config(&args.config, *force).await;
    }

    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    cfg.ensure_dirs()?;

    let storefront = open_storefront(&cfg).await?;
    match args.command {
        Command::InitConfig { .. } => unreachable!("handled above"),
        Command::Signin { email, password } => {
            let session = storefront.sign_in(&email, &password).await?;
            println!("Welcome back, {}!", display_name(&session.username, &session.useremail));
        }
        Command::Logout => {
            storefront.sign_out().await?;
            println!("Signed out.");
        }
        Command::Whoami => match storefront.session().current() {
            Some(s) => println!("{} <{}>", display_name(&s.username, &s.useremail), s.useremail),
            None => println!("{}", bistro::error::SIGN_IN_PROMPT),
        },
        Command::Menu => {
            let outcome = storefront.menu().await;
            if let Some(msg) = outcome.user_message(EMPTY_MENU_MESSAGE) {
                println!("{}", msg);
            }
            if let Outcome::Data(items) = outcome {
                print_menu(&items);
            }
        }
        Command::Add { item, quantity } => {
            let menu_item = find_menu_item(&storefront, item).await?;
            let added = storefront.add_to_cart(&menu_item, quantity).await?;
            println!(
                "Added {} x{} to your cart (order {}).",
                added.name, added.quantity, added.orderid
            );
        }
        Command::Cart => {
            let outcome = storefront.cart().await;
            if let Some(msg) = outcome.user_message(EMPTY_CART_MESSAGE) {
                println!("{}", msg);
            }
            if let Outcome::Data(items) = outcome {
                print_cart(&items);
            }
        }
        Command::Remove { orderid } => {
            storefront.remove_from_cart(&orderid).await?;
            println!("Removed {} from your cart.", orderid);
        }
        Command::Checkout {
            name,
            table,
            location,
        } => {
            let form = CheckoutForm {
                customer_name: name,
                table_no: table,
                location_name: location,
            };
            let receipt = storefront.checkout(&form).await?;
            println!(
                "Thank you for your order! {} item(s), total {}.",
                receipt.orders.len(),
                money::format(receipt.total)
            );
            println!("Run `bistro status --watch` to follow it.");
        }
        Command::Status { watch } => {
            if watch {
                watch_status(&storefront, Duration::from_millis(cfg.app.poll_interval_ms)).await?;
            } else {
                let outcome = storefront.order_status().await;
                if let Some(msg) = outcome.user_message(NO_ORDERS_MESSAGE) {
                    println!("{}", msg);
                }
                if let Outcome::Data(orders) = outcome {
                    print_orders(&orders);
                }
            }
        }
        Command::Feedback { text } => {
            storefront.submit_feedback(&text.join(" ")).await?;
            println!("Thanks for your valuable feedback!");
        }
        Command::Chat { message } => chat(&storefront, &message.join(" ")).await?,
    }
    Ok(())
}

async fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    tokio::fs::write(path, config::example()).await?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn open_storefront(cfg: &Config) -> Result<Storefront> {
    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;
    let session = SessionHolder::open(pool).await?;
    let api = ApiClient::from_config(cfg)?;
    info!(base_url = %api.base_url(), signed_in = session.is_signed_in(), "storefront ready");
    Ok(Storefront::new(Arc::new(api), session))
}

async fn find_menu_item(storefront: &Storefront, id: i64) -> Result<MenuItem> {
    match storefront.menu().await {
        Outcome::Data(items) => items
            .into_iter()
            .find(|item| item.id == id)
            .ok_or_else(|| anyhow!("no menu item with id {}", id)),
        Outcome::Empty => bail!(EMPTY_MENU_MESSAGE),
        Outcome::Unauthorized => bail!(bistro::error::SIGN_IN_PROMPT),
        Outcome::Failure(reason) => bail!("could not load the menu: {}", reason),
    }
}

async fn watch_status(storefront: &Storefront, interval: Duration) -> Result<()> {
    if !storefront.session().is_signed_in() {
        println!("{}", bistro::error::SIGN_IN_PROMPT);
        return Ok(());
    }
    let handle = StatusPoller::spawn(storefront.clone(), interval);
    let mut state = handle.state();
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                let settled = snapshot.all_settled();
                match snapshot {
                    PollState::Authenticated { orders, last_polled } => {
                        if let Some(at) = last_polled {
                            println!("--- {} ---", at.format("%H:%M:%S"));
                        }
                        if orders.is_empty() {
                            println!("{}", NO_ORDERS_MESSAGE);
                        } else {
                            print_orders(&orders);
                        }
                        if settled {
                            println!("All orders are settled.");
                            break;
                        }
                    }
                    PollState::Unauthenticated => {
                        println!("{}", bistro::error::SIGN_IN_PROMPT);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    handle.stop();
    Ok(())
}

async fn chat(storefront: &Storefront, first: &str) -> Result<()> {
    let mut transcript = ChatTranscript::new();
    if !first.trim().is_empty() {
        let reply = transcript.send(storefront, first).await?;
        println!("agent> {}", reply.text);
        return Ok(());
    }

    println!("Chat with our support agent. Empty line or Ctrl-D to quit.");
    let stdin = std::io::stdin();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }
        match transcript.send(storefront, line.trim()).await {
            Ok(reply) => println!("agent> {}", reply.text),
            Err(err @ StorefrontError::SessionExpired) | Err(err @ StorefrontError::NotSignedIn) => {
                return Err(err.into());
            }
            Err(err) => println!("{}", err),
        }
    }
    let sent = transcript
        .messages()
        .iter()
        .filter(|m| m.sender == Sender::User)
        .count();
    info!(sent, "chat ended");
    Ok(())
}

fn display_name<'a>(username: &'a str, useremail: &'a str) -> &'a str {
    if username.is_empty() {
        useremail
    } else {
        username
    }
}

fn print_menu(items: &[MenuItem]) {
    for item in items {
        let stars = "*".repeat(usize::from(item.rating.min(5)));
        println!("[{:>3}] {:<28} {:>8}  {:<5}", item.id, item.title, item.price, stars);
        if !item.description.is_empty() {
            println!("      {}", item.description);
        }
    }
}

fn print_cart(items: &[CartOrderItem]) {
    for item in items {
        println!(
            "{}  {} x{} @ {} = {}",
            item.orderid,
            item.name,
            item.quantity,
            item.price,
            money::format(money::line_total(&item.price, item.quantity))
        );
    }
    println!("Total: {}", money::format(money::cart_total(items)));
}

fn print_orders(orders: &[SubmittedOrder]) {
    for order in orders {
        println!(
            "{}  table {}  {} x{}  {}  [{}]",
            order.orderid,
            order.table_no,
            order.item_name,
            order.quantity,
            money::format(order.total),
            order.status
        );
    }
}
