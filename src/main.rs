use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_lsp::{LspService, Server};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use npmdesc_lsp::backend::NpmDescBackend;
use npmdesc_lsp::registries::http_client::create_shared_client;
use npmdesc_lsp::registries::npm::DEFAULT_REGISTRY_URL;

#[derive(Parser)]
#[command(name = "npmdesc-lsp")]
#[command(about = "Language server describing package.json dependencies", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the LSP server (default behavior)
    Lsp,
    /// Fetch registry metadata for every dependency of a manifest and print
    /// the resulting records as JSON
    Describe {
        /// Path to the package.json to describe
        #[arg(short, long)]
        file: PathBuf,

        /// Registry base URL
        #[arg(short, long, default_value = DEFAULT_REGISTRY_URL)]
        registry: String,

        /// Bearer token, may reference an environment variable as ${VAR}
        #[arg(short, long, env = "NPM_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Some(Commands::Describe {
            file,
            registry,
            token,
        }) => run_describe(file, registry, token).await,
        Some(Commands::Lsp) | None => run_lsp().await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_lsp() -> anyhow::Result<ExitCode> {
    tracing::info!("Starting npmdesc LSP server");

    let http_client = create_shared_client()?;

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) =
        LspService::new(move |client| NpmDescBackend::new(client, Arc::clone(&http_client)));
    Server::new(stdin, stdout, socket).serve(service).await;
    Ok(ExitCode::SUCCESS)
}

async fn run_describe(
    file: PathBuf,
    registry: String,
    token: Option<String>,
) -> anyhow::Result<ExitCode> {
    use npmdesc_lsp::auth::resolve_token;
    use npmdesc_lsp::parsers::npm::extract_dependencies;
    use npmdesc_lsp::parsers::read_manifest_file;
    use npmdesc_lsp::registries::npm::NpmRegistry;
    use npmdesc_lsp::store::{FetchDispatcher, FileKey, Store, selectors};

    let (manifest, content) = match read_manifest_file(&file).await {
        Ok(read) => read,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    let extracted = extract_dependencies(&manifest, &content);
    eprintln!(
        "Describing {} dependencies in {}...",
        extracted.len(),
        file.display()
    );

    let registry = NpmRegistry::with_base_url(create_shared_client()?, &registry);
    let store = Arc::new(Store::new());
    let dispatcher = FetchDispatcher::new(Arc::clone(&store), Arc::new(registry));
    let file_key = FileKey::from(file.display().to_string());
    let token = token.as_deref().and_then(resolve_token);

    for handle in dispatcher.reconcile_file(&file_key, &extracted, token.as_deref()) {
        let _ = handle.await?;
    }

    let state = store.state();
    let mut records: Vec<_> = selectors::select_dependencies(&state, &file_key)
        .map(|records| records.values().collect())
        .unwrap_or_default();
    records.sort_by_key(|record| record.line);

    let failed = records.iter().filter(|record| record.error).count();
    println!("{}", serde_json::to_string_pretty(&records)?);
    if failed > 0 {
        eprintln!("{} of {} lookups failed", failed, records.len());
    }

    Ok(ExitCode::SUCCESS)
}
