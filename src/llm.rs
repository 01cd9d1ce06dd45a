//! Abstracción sobre Rig para trabajar con distintos proveedores de LLM.
//! De momento se implementa OpenAI; Gemini/Ollama quedan preparados para el futuro.

use std::time::Duration;

use anyhow::{anyhow, Result};
use rig::completion::Prompt;
use rig::embeddings::EmbeddingModel; // <- para .embed_texts
use thiserror::Error;
use tracing::debug;

use crate::config::{AppConfig, LlmProvider};

/// Resultado de un embedding de un chunk.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub id: String,
    pub text: String,
    pub vector: Vec<f64>,
}

/// Resultado tipado de una petición de completion: el llamante decide si
/// un timeout se reintenta o se muestra al usuario.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("o modelo não respondeu dentro de {0} segundos")]
    Timeout(u64),
    #[error("falha do provedor LLM: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Instrucciones de grounding del asistente. El modelo sólo puede
/// responder con el contexto recuperado; es un contrato por instrucción,
/// no hay verificación posterior de que la respuesta esté fundamentada.
const GROUNDING_PREAMBLE: &str = r#"Você é um assistente jurídico especializado em certificação digital no âmbito do Instituto Nacional de Tecnologia da Informação (ITI) e da Infraestrutura de Chaves Públicas Brasileira (ICP-Brasil).

Seu papel é responder perguntas exclusivamente com base nos documentos fornecidos no contexto, sem citar ou se basear em outros documentos que não estejam expressamente incluídos.

Suas respostas devem ser:
- Claras, objetivas e completas;
- Rigorosamente baseadas no conteúdo disponível;
- Escritas em linguagem técnica, porém acessível.

Atenção:
- Não cite normas, leis, resoluções, instruções normativas ou documentos que não estejam presentes no contexto fornecido.
- Não mencione nomes de documentos, versões ou trechos que não estejam explicitamente presentes no conteúdo analisado.
- Nunca invente ou assuma informações, mesmo que pareçam plausíveis.
- Se a resposta envolver uma lista normativa (como requisitos, obrigações, procedimentos ou controles), enumere os itens com clareza, conforme descrito no conteúdo. Não omita pontos relevantes.

Caso a pergunta não esteja contemplada no conteúdo fornecido, informe educadamente que a informação não está disponível e recomende consultar a legislação vigente diretamente no site do ITI ou com um profissional jurídico especializado em certificação digital."#;

/// Gestor de LLMs y embeddings.
#[derive(Debug, Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f64,
    pub request_timeout: u64,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            provider: cfg.llm_provider.clone(),
            embedding_model: cfg.llm_embedding_model.clone(),
            chat_model: cfg.llm_chat_model.clone(),
            temperature: cfg.llm_temperature,
            request_timeout: cfg.llm_request_timeout,
        })
    }

    // ---------------------------------------------------------------------
    // EMBEDDINGS
    // ---------------------------------------------------------------------

    /// Calcula embeddings para una lista de (id, texto).
    ///
    /// Nota: sólo implementado para OpenAI. Para otros proveedores
    /// se podrían añadir ramas adicionales al `match`.
    pub async fn embed_chunks(
        &self,
        chunks: &[(String, String)],
    ) -> Result<Vec<EmbeddedChunk>> {
        match self.provider {
            LlmProvider::OpenAI => self.embed_with_openai(chunks).await,
            ref other => Err(anyhow!(
                "Proveedor LLM {:?} aún no implementado para embeddings",
                other
            )),
        }
    }

    /// Embedding de una consulta suelta del usuario.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f64>> {
        let embedded = self
            .embed_chunks(&[("query".to_string(), text.to_string())])
            .await?;
        embedded
            .into_iter()
            .next()
            .map(|e| e.vector)
            .ok_or_else(|| anyhow!("No se pudo generar el embedding de la consulta"))
    }

    async fn embed_with_openai(
        &self,
        chunks: &[(String, String)],
    ) -> Result<Vec<EmbeddedChunk>> {
        use rig::providers::openai::{self, TEXT_EMBEDDING_3_SMALL};
        // Trait para client.embedding_model(...)
        use rig::client::EmbeddingsClient as _;

        // Cliente OpenAI de Rig
        let client = openai::Client::from_env();

        // Modelo de embeddings: config o default
        let model_name = if self.embedding_model.is_empty() {
            TEXT_EMBEDDING_3_SMALL
        } else {
            self.embedding_model.as_str()
        };

        let embedding_model = client.embedding_model(model_name);

        // Extraemos sólo los textos
        let texts: Vec<String> = chunks.iter().map(|(_, text)| text.clone()).collect();

        // Embeddings en bloque (.embed_texts viene de EmbeddingModel)
        let embeddings = embedding_model.embed_texts(texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(anyhow!(
                "Número de embeddings ({}) distinto al número de chunks ({})",
                embeddings.len(),
                chunks.len()
            ));
        }

        // Reconstruimos EmbeddedChunk con id + texto + vector
        let mut result = Vec::new();
        for ((id, text), emb) in chunks.iter().zip(embeddings.iter()) {
            result.push(EmbeddedChunk {
                id: id.clone(),
                text: text.clone(),
                vector: emb.vec.clone(),
            });
        }

        Ok(result)
    }

    // ---------------------------------------------------------------------
    // CHAT / COMPLETION
    // ---------------------------------------------------------------------

    /// Genera una respuesta a partir de una pregunta y un contexto
    /// (concatenación de chunks relevantes), acotada por el timeout
    /// configurado.
    pub async fn answer(
        &self,
        question: &str,
        context: &str,
    ) -> Result<String, CompletionError> {
        match self.provider {
            LlmProvider::OpenAI => self.answer_with_openai(question, context).await,
            ref other => Err(CompletionError::Provider(
                format!("Proveedor LLM {other:?} aún no implementado para chat").into(),
            )),
        }
    }

    async fn answer_with_openai(
        &self,
        question: &str,
        context: &str,
    ) -> Result<String, CompletionError> {
        use rig::providers::openai;
        // Trait para client.agent(...)
        use rig::client::CompletionClient as _;

        let client = openai::Client::from_env();

        // Modelo de chat por defecto si no se ha configurado otro
        let model_name = if self.chat_model.is_empty() {
            "gpt-4o-mini"
        } else {
            self.chat_model.as_str()
        };

        debug!(
            "Completion con {} (temperature {}, timeout {}s)",
            model_name, self.temperature, self.request_timeout
        );

        // Instrucciones, contexto y pregunta viajan por separado; no se
        // concatenan en una única plantilla de texto.
        let agent = client
            .agent(model_name)
            .preamble(GROUNDING_PREAMBLE)
            .context(context)
            .temperature(self.temperature)
            .build();

        let request = agent.prompt(question);
        match tokio::time::timeout(Duration::from_secs(self.request_timeout), request).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(e)) => Err(CompletionError::Provider(Box::new(e))),
            Err(_) => Err(CompletionError::Timeout(self.request_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cfg() -> AppConfig {
        AppConfig {
            data_dir: PathBuf::from("./data"),
            persist_dir: PathBuf::from("./vector_db"),
            collection_name: "docs".to_string(),
            top_k: 5,
            chunk_size: 1500,
            chunk_overlap: 250,
            llm_provider: LlmProvider::Gemini,
            llm_embedding_model: "modelo-e".to_string(),
            llm_chat_model: "modelo-c".to_string(),
            llm_temperature: 0.0,
            llm_request_timeout: 80,
        }
    }

    #[tokio::test]
    async fn proveedor_no_implementado_para_embeddings() {
        let llm = LlmManager::from_config(&cfg()).unwrap();
        let err = llm
            .embed_chunks(&[("id".to_string(), "texto".to_string())])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no implementado"));
    }

    #[tokio::test]
    async fn proveedor_no_implementado_para_chat_es_error_tipado() {
        let llm = LlmManager::from_config(&cfg()).unwrap();
        let err = llm.answer("pergunta", "contexto").await.unwrap_err();
        assert!(matches!(err, CompletionError::Provider(_)));
    }

    #[test]
    fn el_manager_copia_los_ajustes_de_la_configuracion() {
        let llm = LlmManager::from_config(&cfg()).unwrap();
        assert_eq!(llm.embedding_model, "modelo-e");
        assert_eq!(llm.chat_model, "modelo-c");
        assert_eq!(llm.temperature, 0.0);
        assert_eq!(llm.request_timeout, 80);
    }
}
