//! Construcción o carga del índice vectorial al arranque.
//!
//! La existencia del directorio de persistencia decide, por sí sola, cuál
//! de las dos rutas se ejecuta: construir desde los PDF o reabrir la
//! colección ya persistida.

use anyhow::{anyhow, Result};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::ingest;
use crate::llm::LlmManager;
use crate::models::IndexEntry;
use crate::vector_store::VectorStore;

/// Decisión de arranque del índice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPlan {
    Build,
    Load,
}

impl IndexPlan {
    pub fn for_persist_dir(persist_dir: &std::path::Path) -> Self {
        if persist_dir.exists() {
            Self::Load
        } else {
            Self::Build
        }
    }
}

/// Resumen de una construcción del índice.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub documents_indexed: usize,
    pub chunks_indexed: usize,
}

impl std::fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Resumen: {} documento(s) indexado(s), {} chunks embebidos.",
            self.documents_indexed, self.chunks_indexed
        )
    }
}

/// Garantiza que haya un índice utilizable y devuelve su handle.
/// Exactamente una de las dos rutas (construir / cargar) se ejecuta.
pub async fn ensure_index(cfg: &AppConfig, llm: &LlmManager) -> Result<VectorStore> {
    match IndexPlan::for_persist_dir(&cfg.persist_dir) {
        IndexPlan::Build => {
            println!(
                "Diretório de persistência '{}' não encontrado.",
                cfg.persist_dir.display()
            );
            println!(
                "Criando novo índice a partir dos documentos em '{}'...",
                cfg.data_dir.display()
            );
            build_index(cfg, llm).await
        }
        IndexPlan::Load => {
            println!(
                "Carregando índice existente do diretório: '{}'...",
                cfg.persist_dir.display()
            );
            load_index(cfg)
        }
    }
}

/// Ruta de construcción: cargar PDFs, trocear, embeber y persistir.
///
/// La colección sólo se publica en disco al final; un fallo a mitad del
/// paso de embeddings no deja estado persistido parcial.
async fn build_index(cfg: &AppConfig, llm: &LlmManager) -> Result<VectorStore> {
    println!(
        "Carregando documentos PDF do diretório: {}",
        cfg.data_dir.display()
    );
    let documents = ingest::load_documents(&cfg.data_dir)?;
    println!("{} documento(s) carregado(s) com sucesso.", documents.len());

    let mut store = VectorStore::create(
        &cfg.persist_dir,
        &cfg.collection_name,
        &cfg.llm_embedding_model,
    );
    let mut summary = BuildSummary::default();
    let total = documents.len();

    println!("Criando índice vetorial (pode levar tempo)...");
    for (i, doc) in documents.iter().enumerate() {
        let chunks = ingest::split_into_chunks(&doc.text, cfg.chunk_size, cfg.chunk_overlap);
        if chunks.is_empty() {
            warn!("Documento sin chunks tras el troceado: {}", doc.filename);
            continue;
        }

        println!(
            "[{}/{}] Gerando embeddings para '{}' ({} chunks)...",
            i + 1,
            total,
            doc.filename,
            chunks.len()
        );

        let pairs: Vec<(String, String)> = chunks
            .into_iter()
            .map(|text| (Uuid::new_v4().to_string(), text))
            .collect();
        let embedded = llm.embed_chunks(&pairs).await?;

        let entries: Vec<IndexEntry> = embedded
            .into_iter()
            .enumerate()
            .map(|(idx, emb)| IndexEntry {
                id: emb.id,
                source: doc.filename.clone(),
                chunk_index: idx,
                text: emb.text,
                embedding: emb.vector,
            })
            .collect();

        summary.documents_indexed += 1;
        summary.chunks_indexed += entries.len();
        store.add_entries(entries);
    }

    if store.is_empty() {
        return Err(anyhow!(
            "Os documentos em '{}' não contêm texto útil para indexar.",
            cfg.data_dir.display()
        ));
    }

    store.persist()?;
    info!("{summary}");
    println!("Índice criado e salvo em '{}'.", cfg.persist_dir.display());
    Ok(store)
}

/// Ruta de carga: reabrir la colección persistida, en sólo lectura.
fn load_index(cfg: &AppConfig) -> Result<VectorStore> {
    let store = VectorStore::open(
        &cfg.persist_dir,
        &cfg.collection_name,
        &cfg.llm_embedding_model,
    )?;
    if store.is_empty() {
        warn!(
            "La colección '{}' existe pero está vacía; las consultas no recuperarán contexto.",
            store.collection()
        );
    }
    println!("Índice carregado com sucesso.");
    Ok(store)
}
