//! Motor de consulta RAG sobre la colección vectorial local.
//!
//! Flujo:
//!   1. Embedding de la pregunta.
//!   2. Búsqueda de los `top_k` chunks más próximos en la colección.
//!   3. Construcción del contexto concatenado.
//!   4. El LLM responde usando sólo ese contexto.

use tracing::debug;

use crate::{
    config::AppConfig,
    llm::{CompletionError, LlmManager},
    models::IndexEntry,
    vector_store::VectorStore,
};

/// Respuesta fija cuando la búsqueda no recupera ningún chunk.
const NO_CONTEXT_REPLY: &str =
    "Não foi encontrada informação relevante nos documentos para responder a esta pergunta.";

/// Lanza una consulta RAG:
/// - Recupera los `top_k` chunks más relevantes de la colección.
/// - Llama al LLM con el contexto concatenado.
/// - Devuelve la respuesta y los ficheros de origen de los chunks usados.
pub async fn rag_query(
    store: &VectorStore,
    llm: &LlmManager,
    cfg: &AppConfig,
    question: &str,
) -> Result<(String, Vec<String>), CompletionError> {
    let query_vec = llm
        .embed_query(question)
        .await
        .map_err(|e| CompletionError::Provider(e.into()))?;

    let results = store.search(&query_vec, cfg.top_k);
    if results.is_empty() {
        return Ok((NO_CONTEXT_REPLY.to_string(), Vec::new()));
    }

    for (score, entry) in &results {
        debug!(
            "Chunk recuperado de '{}' (índice {}, score {:.4})",
            entry.source, entry.chunk_index, score
        );
    }

    let (context, sources) = build_context(&results);
    let answer = llm.answer(question, &context).await?;
    Ok((answer, sources))
}

/// Concatena los chunks recuperados como contexto y recoge, sin
/// duplicados y en orden de relevancia, sus ficheros de origen.
fn build_context(results: &[(f64, &IndexEntry)]) -> (String, Vec<String>) {
    let mut parts = Vec::new();
    let mut sources: Vec<String> = Vec::new();
    for (_, entry) in results {
        parts.push(entry.text.as_str());
        if !sources.contains(&entry.source) {
            sources.push(entry.source.clone());
        }
    }
    (parts.join("\n\n---\n\n"), sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, text: &str) -> IndexEntry {
        IndexEntry {
            id: text.to_string(),
            source: source.to_string(),
            chunk_index: 0,
            text: text.to_string(),
            embedding: vec![1.0],
        }
    }

    #[test]
    fn el_contexto_concatena_con_separadores() {
        let a = entry("doc-a.pdf", "primeiro trecho");
        let b = entry("doc-b.pdf", "segundo trecho");
        let results = vec![(0.9, &a), (0.8, &b)];
        let (context, _) = build_context(&results);
        assert_eq!(context, "primeiro trecho\n\n---\n\nsegundo trecho");
    }

    #[test]
    fn las_fuentes_se_deduplican_en_orden_de_relevancia() {
        let a = entry("doc-a.pdf", "um");
        let b = entry("doc-b.pdf", "dois");
        let c = entry("doc-a.pdf", "três");
        let results = vec![(0.9, &a), (0.8, &b), (0.7, &c)];
        let (_, sources) = build_context(&results);
        assert_eq!(sources, vec!["doc-a.pdf".to_string(), "doc-b.pdf".to_string()]);
    }
}
