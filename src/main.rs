mod config;
mod contact;
mod content_loader;
mod error;
mod hot_reload;
mod markdown;
mod models;
mod pages;
mod state;
mod store;
mod validation;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::{routing::get, Router};
use clap::{Parser, Subcommand};
use tokio::{net::TcpListener, sync::broadcast};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    contact::{ContactClient, ContactForm, SubmitOutcome},
    content_loader::PostLoader,
    hot_reload::{start_content_watcher, ws_handler},
    state::{AppState, RouterState},
    store::{MemoryStore, MessageStore, MongoStore},
};

#[derive(Parser)]
#[command(name = "personal-blog")]
#[command(about = "Markdown blog with a contact form", long_about = None)]
struct Cli {
    /// Configuration file; environment variables override it
    #[arg(short, long, global = true, default_value = "blog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the site (default)
    Serve,

    /// List posts, newest first
    Posts {
        /// Only featured posts
        #[arg(short, long)]
        featured: bool,
    },

    /// Print one post's front matter and markdown body
    Show {
        /// Post slug, with or without `.md`
        slug: String,
    },

    /// Submit a message through the contact form
    Contact {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        message: String,
        /// Defaults to this server's /api/contact
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(&cli.config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Posts { featured } => list_posts(&config, featured).await,
        Commands::Show { slug } => show_post(&config, &slug).await,
        Commands::Contact {
            email,
            name,
            message,
            endpoint,
        } => {
            let endpoint = endpoint.unwrap_or_else(|| config.contact_endpoint());
            send_contact(endpoint, &email, &name, &message).await
        }
    }
}

fn message_store(config: &Config) -> Arc<dyn MessageStore> {
    match &config.database.uri {
        Some(uri) => Arc::new(MongoStore::new(uri.clone(), &config.database)),
        None => {
            warn!("MONGO_URI is not set; contact messages are kept in memory");
            Arc::new(MemoryStore::new())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(development = config.development, "starting blog server");

    let app_state = Arc::new(
        AppState::load(&config)
            .await
            .context("failed to load initial content")?,
    );

    let (tx, _rx) = broadcast::channel(1);
    if config.development {
        info!("Hot reload enabled. Check logs for file change events.");
        start_content_watcher(tx.clone(), app_state.clone());
    }

    let router_state = RouterState {
        app_state,
        store: message_store(&config),
        broadcaster: tx,
    };

    let images = ServeDir::new(config.content.dir.join("images"));

    let app = Router::new()
        .merge(pages::routes())
        .merge(contact::routes())
        .nest_service("/images", images)
        .route("/ws", get(ws_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(router_state);

    let addr = config.addr()?;
    info!(%addr, "listening");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn list_posts(config: &Config, featured: bool) -> anyhow::Result<()> {
    let loader = PostLoader::new(&config.content.dir);
    let posts = if featured {
        loader.featured_posts().await?
    } else {
        loader.all_posts().await?
    };

    for post in posts {
        let marker = if post.is_featured { "*" } else { " " };
        println!("{} {} {:<40} {}", post.date, marker, post.slug, post.title);
    }
    Ok(())
}

async fn show_post(config: &Config, slug: &str) -> anyhow::Result<()> {
    let post = PostLoader::new(&config.content.dir).post(slug).await?;
    println!("title:      {}", post.title);
    println!("date:       {}", post.display_date());
    println!("image:      {}", post.image_path());
    println!("excerpt:    {}", post.excerpt);
    println!("isFeatured: {}", post.is_featured);
    println!();
    println!("{}", post.content);
    Ok(())
}

async fn send_contact(endpoint: String, email: &str, name: &str, message: &str) -> anyhow::Result<()> {
    let form = ContactForm::new(ContactClient::new(endpoint));
    form.fill(email, name, message);

    let mut rx = form.subscribe();
    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().clone();
            match status.notification() {
                Some(n) => println!("[{}] {}: {}", n.status, n.title, n.message),
                None => break,
            }
        }
    });

    match form.submit().await {
        SubmitOutcome::Invalid(reason) => {
            printer.abort();
            anyhow::bail!("{reason}")
        }
        SubmitOutcome::AlreadyPending => {
            printer.abort();
            anyhow::bail!("a submission is already in flight")
        }
        // Hold the form until its notification is dismissed.
        SubmitOutcome::Sent(_) => {
            printer.await?;
            Ok(())
        }
        SubmitOutcome::Failed(text) => {
            printer.await?;
            anyhow::bail!("{text}")
        }
    }
}
