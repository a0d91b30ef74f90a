use chat_relay::constants::{CLIENT_DEFAULT_PERSONA, ENV_CLIENT_PERSONA, ENV_PROVIDER_TOKEN};
use chat_relay::conversation::ConversationState;
use chat_relay::main_helper::{ChatArgs, Command, ServeArgs};
use chat_relay::provider::OpenAiCompatClient;
use chat_relay::relay::Relay;
use chat_relay::session::{ChatSession, HttpRelayClient};
use chat_relay::*;

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    match args.command {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Chat(chat_args) => chat(chat_args).await,
    }
}

async fn serve(args: ServeArgs) {
    let _guard = logging::init_tracing(&args.log_dir, true);
    logging::setup_panic_hook();

    let config = RelayConfig::from_env();
    if !config.has_credential() {
        // Serve anyway: relay calls answer 500 and /readyz reports unready
        tracing::error!(
            "{} is missing or empty; every relay call will fail as misconfigured",
            ENV_PROVIDER_TOKEN
        );
    }
    tracing::info!("Relay configuration: {:?}", config);

    let http = match reqwest::Client::builder()
        .timeout(Duration::from_secs(args.request_timeout_secs))
        .connect_timeout(Duration::from_secs(args.connect_timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let provider = OpenAiCompatClient::new(
        http,
        &config.base_url,
        config.api_key.clone().unwrap_or_default(),
    );
    let relay = Relay::new(config, Arc::new(provider));
    let state = Arc::new(AppState::new(relay));
    let app = server::build_router(state, args.max_body_size);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Relay listening on {}", addr);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn chat(args: ChatArgs) {
    // The terminal belongs to the conversation; logs go to the file only
    let _guard = logging::init_tracing(&args.log_dir, false);
    logging::setup_panic_hook();

    let http = match reqwest::Client::builder()
        .timeout(Duration::from_secs(args.request_timeout_secs))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let persona = args
        .persona
        .or_else(|| std::env::var(ENV_CLIENT_PERSONA).ok())
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| CLIENT_DEFAULT_PERSONA.to_string());

    let transport = HttpRelayClient::new(http, &args.url);
    tracing::info!("Chatting via {}", transport.endpoint());
    let session = ChatSession::new(transport, ConversationState::with_greeting(persona));

    if let Err(e) = console::run(session).await {
        eprintln!("Console error: {}", e);
        std::process::exit(1);
    }
}
