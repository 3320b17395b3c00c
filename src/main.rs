//! modelmux - manage AI provider credentials and talk to them from the terminal

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueHint};
use console::style;
use modelmux_core::config::ProviderConfig;
use modelmux_core::llm::BackendKind;
use modelmux_core::llm::error_display::{
    describe_failure, format_llm_error, format_llm_success, style_llm_warning, style_provider_name,
};
use modelmux_core::orchestration::{OrchestrationService, ProviderEvent, ProviderState};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "modelmux",
    version,
    about = "Manage AI provider credentials and route messages between backends\n\nSupported backends: anthropic, openai, gemini"
)]
struct Cli {
    /// Data directory holding config.toml and the credential files
    ///
    /// Default: the per-user config directory (e.g. ~/.config/modelmux)
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::DirPath)]
    home: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a credential and register a new provider
    Add(AddArgs),

    /// Remove a provider together with its stored credential
    Remove { name: String },

    /// List configured providers
    List {
        /// Print machine readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the status record of one provider
    Status { name: String },

    /// Probe a provider with one minimal live request
    Test { name: String },

    /// Send one message and print the reply
    Send {
        /// Provider to use instead of the active one
        #[arg(long, short)]
        provider: Option<String>,

        /// System instruction sent alongside the message
        #[arg(long)]
        context: Option<String>,

        /// Also print the reasoning trace when the backend returns one
        #[arg(long)]
        reasoning: bool,

        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },

    /// List the models a provider offers
    Models {
        name: String,

        /// Query the backend instead of using the built-in catalog
        #[arg(long)]
        refresh: bool,
    },

    /// Make a provider the default target
    Activate { name: String },

    /// Change the settings of a registered provider
    Update {
        name: String,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Interactive conversation (/history, /clear, /stats, /exit)
    Chat {
        #[arg(long, short)]
        provider: Option<String>,

        #[arg(long)]
        context: Option<String>,
    },
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Provider name, e.g. MyClaude
    name: String,

    /// Secret key (prefer --key-env to keep it out of shell history)
    #[arg(long, conflicts_with = "key_env")]
    key: Option<String>,

    /// Environment variable holding the secret key
    #[arg(long, value_name = "VAR")]
    key_env: Option<String>,

    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Backend type: anthropic, openai or gemini (inferred when omitted)
    #[arg(long = "type", value_name = "KIND")]
    kind: Option<BackendKind>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long)]
    max_tokens: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Request extended reasoning (supported models only)
    #[arg(long)]
    thinking: bool,

    #[arg(long, conflicts_with = "thinking")]
    no_thinking: bool,

    /// Endpoint override for proxies and gateways
    #[arg(long, value_hint = ValueHint::Url)]
    base_url: Option<String>,

    /// Keep the provider configured but skip it on startup
    #[arg(long)]
    disabled: bool,

    /// Turn a disabled provider back on
    #[arg(long, conflicts_with = "disabled")]
    enabled: bool,
}

impl SettingsArgs {
    fn apply(&self, mut config: ProviderConfig) -> ProviderConfig {
        if self.kind.is_some() {
            config.kind = self.kind;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if self.thinking {
            config.thinking_mode = true;
        }
        if self.no_thinking {
            config.thinking_mode = false;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if self.disabled {
            config.enabled = false;
        }
        if self.enabled {
            config.enabled = true;
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut service = match &cli.home {
        Some(home) => OrchestrationService::open(home),
        None => OrchestrationService::open_default(),
    }
    .context("Failed to open modelmux data directory")?;
    service.initialize_from_store();

    let result = run(&mut service, cli.command);
    service.shutdown();
    result
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run(service: &mut OrchestrationService, command: Commands) -> Result<()> {
    match command {
        Commands::Add(args) => add_provider(service, args),
        Commands::Remove { name } => {
            if !service.try_remove_provider(&name)? {
                bail!("Provider '{name}' not found");
            }
            println!("{}", format_llm_success(&name, "removed"));
            if let Some(active) = service.active_provider() {
                println!("Active provider: {}", style(active).bold());
            }
            Ok(())
        }
        Commands::List { json } => list_providers(service, json),
        Commands::Status { name } => show_status(service, &name),
        Commands::Test { name } => test_provider(service, &name),
        Commands::Send {
            provider,
            context,
            reasoning,
            message,
        } => send_once(
            service,
            provider.as_deref(),
            context.as_deref(),
            &message.join(" "),
            reasoning,
        ),
        Commands::Models { name, refresh } => {
            let models = service.list_models(&name, refresh)?;
            for model in models {
                println!("{model}");
            }
            Ok(())
        }
        Commands::Activate { name } => {
            if !service.set_active_provider(&name) {
                bail!("Provider '{name}' is not registered");
            }
            println!("Active provider: {}", style(&name).bold());
            Ok(())
        }
        Commands::Update { name, settings } => {
            let current = service
                .config()
                .provider(&name)
                .cloned()
                .ok_or_else(|| anyhow!("Provider '{name}' not found"))?;
            service.update_provider_config(&name, settings.apply(current))?;
            println!("{}", format_llm_success(&name, "updated"));
            Ok(())
        }
        Commands::Chat { provider, context } => {
            chat_loop(service, provider.as_deref(), context.as_deref())
        }
    }
}

fn add_provider(service: &mut OrchestrationService, args: AddArgs) -> Result<()> {
    let secret = match (&args.key, &args.key_env) {
        (Some(key), _) => key.clone(),
        (None, Some(var)) => std::env::var(var)
            .with_context(|| format!("Environment variable {var} is not set"))?,
        (None, None) => prompt_line(&format!("Secret key for {}: ", args.name))?,
    };

    let config = args.settings.apply(ProviderConfig::default());
    let kind = service.try_add_provider(&args.name, &secret, config)?;
    println!(
        "{} {}",
        format_llm_success(kind.as_str(), "provider added:"),
        style(&args.name).bold()
    );
    if !service.credential_store().is_encrypted() {
        println!(
            "{}",
            style_llm_warning("Secret encryption is unavailable; the key is stored as plaintext")
        );
    }
    Ok(())
}

fn list_providers(service: &OrchestrationService, json: bool) -> Result<()> {
    let providers = service.get_all_providers();
    if json {
        println!("{}", serde_json::to_string_pretty(&providers)?);
        return Ok(());
    }
    if providers.is_empty() {
        println!("No providers configured. Add one with `modelmux add <NAME> --key-env <VAR>`.");
        return Ok(());
    }

    for summary in providers.values() {
        let marker = if summary.active { "*" } else { " " };
        let kind = summary.kind.map(|kind| kind.as_str()).unwrap_or("?");
        println!(
            "{} {:<16} {:<10} {:<32} {}",
            marker,
            summary.name,
            style_provider_name(kind),
            summary.model,
            style_state(summary.state)
        );
    }
    Ok(())
}

fn show_status(service: &OrchestrationService, name: &str) -> Result<()> {
    let status = service
        .get_provider_status(name)
        .ok_or_else(|| anyhow!("Provider '{name}' is not registered"))?;
    println!("{}: {}", style(name).bold(), style_state(status.state));
    if !status.message.is_empty() {
        println!("  {}", status.message);
    }
    println!("  last checked: {}", status.last_checked.to_rfc3339());
    Ok(())
}

fn test_provider(service: &mut OrchestrationService, name: &str) -> Result<()> {
    let subscription = service.register_callback(|event| {
        if let ProviderEvent::StatusChanged { name, state, .. } = event {
            eprintln!("{} {}", style(name).dim(), style_state(*state));
        }
        Ok(())
    });
    let outcome = service.test_provider_connection(name);
    service.unregister_callback(subscription);

    match outcome {
        None => bail!("Provider '{name}' is not registered"),
        Some(ProviderState::Connected) => {
            println!("{}", format_llm_success(name, "connection successful"));
            Ok(())
        }
        Some(_) => {
            eprintln!("{}", format_llm_error(name, "connection test failed"));
            let message = service
                .get_provider_status(name)
                .map(|status| status.message.clone())
                .unwrap_or_default();
            bail!("{message}")
        }
    }
}

fn send_once(
    service: &mut OrchestrationService,
    provider: Option<&str>,
    context: Option<&str>,
    message: &str,
    show_reasoning: bool,
) -> Result<()> {
    match service.send_message(provider, message, context) {
        Ok((name, response)) => {
            if show_reasoning {
                if let Some(reasoning) = &response.reasoning {
                    println!("{}\n", style(reasoning).dim());
                }
            }
            println!("{}", response.content);
            if let Some(usage) = response.usage {
                tracing::debug!(
                    provider = %name,
                    model = %response.model,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "usage"
                );
            }
            Ok(())
        }
        Err(err) => {
            let target = provider
                .or(service.active_provider())
                .unwrap_or("modelmux");
            bail!("{}", describe_failure(target, &err))
        }
    }
}

fn chat_loop(
    service: &mut OrchestrationService,
    provider: Option<&str>,
    context: Option<&str>,
) -> Result<()> {
    let target = provider
        .or(service.active_provider())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No provider registered; add one first"))?;
    println!(
        "Chatting with {} (/history, /clear, /stats, /exit)",
        style(&target).bold()
    );

    let stdin = io::stdin();
    loop {
        print!("{} ", style(">").cyan());
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        match input {
            "" => continue,
            "/exit" | "/quit" => break,
            "/history" => {
                let history = service.export_history(&target).unwrap_or_default();
                println!("{}", serde_json::to_string_pretty(&history)?);
            }
            "/clear" => {
                service.clear_history(&target);
                println!("{}", style("history cleared").dim());
            }
            "/stats" => match service.provider_stats(&target) {
                Some(stats) => println!("{}", serde_json::to_string_pretty(stats)?),
                None => println!("{}", style("no requests yet").dim()),
            },
            message => {
                let reply = service.send_message_to_provider(Some(&target), message, context);
                println!("{reply}\n");
            }
        }
    }
    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn style_state(state: ProviderState) -> String {
    let label = state.as_str();
    match state {
        ProviderState::Connected => style(label).green().to_string(),
        ProviderState::Error => style(label).red().to_string(),
        ProviderState::Testing => style(label).yellow().to_string(),
        ProviderState::Initialized => style(label).cyan().to_string(),
        ProviderState::Unknown => style(label).dim().to_string(),
    }
}
