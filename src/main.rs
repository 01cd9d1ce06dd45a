// Módulos de la aplicación
mod config;
mod index;
mod ingest;
mod llm;
mod models;
mod rag;
mod repl;
mod vector_store;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        eprintln!("Erro: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env()?;

    // 3. Inicializar gestor de LLMs
    let llm = llm::LlmManager::from_config(&cfg)?;

    // 4. Construir o cargar el índice persistente
    let store = index::ensure_index(&cfg, &llm).await?;

    // 5. Bucle interactivo de preguntas
    repl::run(&cfg, &llm, &store).await
}
