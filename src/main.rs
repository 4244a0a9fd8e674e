use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dm_facade::credentials::{BackendKind, Credential, CredentialResolver};
use dm_facade::{BindOverrides, ConfigStore, Settings};

#[derive(Parser)]
#[command(name = "dm-facade", version, about = "Inspect and manage dm-facade configuration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve, store or clear the plugin registration credential
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },
    /// Print the bind configuration produced by merging overrides onto the defaults
    BindConfig {
        #[arg(long, help = "Display mode: normal|gdi|gdi2|dx|dx2")]
        display: Option<String>,
        #[arg(long, help = "Mouse mode: normal|windows|windows2|windows3|dx|dx2")]
        mouse: Option<String>,
        #[arg(long, help = "Keypad mode: normal|windows|dx")]
        keypad: Option<String>,
        #[arg(long, help = "Bind mode: 0-7, 101 or 103")]
        mode: Option<i32>,
        #[arg(long, help = "Capability string passed through to the plugin")]
        public: Option<String>,
    },
    /// Describe a plugin status code
    ErrorCode {
        #[arg(allow_hyphen_values = true)]
        code: i32,
    },
    /// Report config locations and credential backend availability
    Doctor,
}

#[derive(Subcommand)]
enum CredentialsAction {
    /// Show which backend the credential resolves from
    Show,
    /// Persist a credential to one backend
    Store {
        #[arg(long, help = "Backend: env|vault|encrypted|plain")]
        backend: BackendKind,
        #[arg(long)]
        reg_code: String,
        #[arg(long)]
        ver_info: String,
    },
    /// Remove the credential from one backend
    Clear {
        #[arg(long, help = "Backend: env|vault|encrypted|plain")]
        backend: BackendKind,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    match cli.command {
        Command::Credentials { action } => credentials(&settings, action),
        Command::BindConfig {
            display,
            mouse,
            keypad,
            mode,
            public,
        } => {
            let overrides = BindOverrides {
                display,
                mouse,
                keypad,
                mode,
                public,
            };
            let config = ConfigStore::new().get_bind_config(&overrides)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::ErrorCode { code } => {
            println!("{}: {}", code, ConfigStore::new().describe_error_code(code));
            Ok(())
        }
        Command::Doctor => doctor(&settings),
    }
}

fn credentials(settings: &Settings, action: CredentialsAction) -> Result<()> {
    let resolver = CredentialResolver::standard(settings);

    match action {
        CredentialsAction::Show => {
            let resolved = resolver.resolve_with_source();
            let source = resolved
                .source
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "placeholder".to_string());
            println!("source:   {}", source);
            println!("reg_code: {}", resolved.credential.redacted_reg_code());
            println!("ver_info: {}", resolved.credential.ver_info);
        }
        CredentialsAction::Store {
            backend,
            reg_code,
            ver_info,
        } => {
            if backend == BackendKind::Environment {
                bail!("the env backend only lives for one process; export DM_REG_CODE and DM_VER_INFO instead");
            }
            resolver
                .store(&Credential::new(reg_code, ver_info), backend)
                .with_context(|| format!("storing credential in {} backend", backend))?;
            println!("stored credential in {} backend", backend);
        }
        CredentialsAction::Clear { backend } => {
            resolver
                .clear(backend)
                .with_context(|| format!("clearing {} backend", backend))?;
            println!("cleared {} backend", backend);
        }
    }
    Ok(())
}

fn doctor(settings: &Settings) -> Result<()> {
    let dll = settings.dll_path();
    println!("config dir: {}", settings.config_dir.display());
    println!(
        "plugin:     {} ({})",
        dll.display(),
        if dll.exists() { "found" } else { "missing" }
    );

    let resolver = CredentialResolver::standard(settings);
    println!("credential backends (priority order):");
    for (kind, available) in resolver.available_backends() {
        println!(
            "  {:<10} {}",
            kind.to_string(),
            if available { "available" } else { "unavailable" }
        );
    }

    let resolved = resolver.resolve_with_source();
    match resolved.source {
        Some(kind) => println!("credential resolves from: {}", kind),
        None => println!("credential resolves from: placeholder (activation will likely fail)"),
    }
    Ok(())
}
