//! Carga y gestión de configuración de la aplicación (corpus, índice y LLM).

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};

#[derive(Clone, Debug)]
pub enum LlmProvider {
    OpenAI,
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }
}

/// Configuración completa de la aplicación.
///
/// Se carga una única vez al arranque y se pasa por referencia a los
/// componentes; no hay estado global mutable.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Directorio con los PDF del corpus.
    pub data_dir: PathBuf,
    /// Directorio de persistencia del índice; su existencia decide
    /// construir-vs-cargar.
    pub persist_dir: PathBuf,
    /// Nombre de la colección dentro del directorio de persistencia.
    pub collection_name: String,

    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,

    pub llm_provider: LlmProvider,
    pub llm_embedding_model: String,
    pub llm_chat_model: String,
    pub llm_temperature: f64,
    /// Tiempo máximo de espera de una respuesta del LLM, en segundos.
    pub llm_request_timeout: u64,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let data_dir = PathBuf::from(
            env::var("RAG_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
        );
        let persist_dir = PathBuf::from(
            env::var("RAG_PERSIST_DIR").unwrap_or_else(|_| "./vector_db".to_string()),
        );
        let collection_name =
            env::var("RAG_COLLECTION").unwrap_or_else(|_| "icp_brasil_docs".to_string());

        let top_k = parse_value("RAG_TOP_K", env::var("RAG_TOP_K").ok(), 5)?;
        let chunk_size = parse_value("RAG_CHUNK_SIZE", env::var("RAG_CHUNK_SIZE").ok(), 1500)?;
        let chunk_overlap =
            parse_value("RAG_CHUNK_OVERLAP", env::var("RAG_CHUNK_OVERLAP").ok(), 250)?;

        if chunk_overlap >= chunk_size {
            return Err(anyhow!(
                "RAG_CHUNK_OVERLAP ({chunk_overlap}) debe ser menor que RAG_CHUNK_SIZE ({chunk_size})"
            ));
        }

        let llm_provider_str =
            env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let llm_provider = LlmProvider::from_str(&llm_provider_str)?;

        let llm_embedding_model = env::var("LLM_EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());
        let llm_chat_model =
            env::var("LLM_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let llm_temperature =
            parse_value("LLM_TEMPERATURE", env::var("LLM_TEMPERATURE").ok(), 0.0)?;
        let llm_request_timeout =
            parse_value("LLM_REQUEST_TIMEOUT", env::var("LLM_REQUEST_TIMEOUT").ok(), 80)?;

        Ok(Self {
            data_dir,
            persist_dir,
            collection_name,
            top_k,
            chunk_size,
            chunk_overlap,
            llm_provider,
            llm_embedding_model,
            llm_chat_model,
            llm_temperature,
            llm_request_timeout,
        })
    }
}

/// Parsea un valor numérico opcional del entorno, con su valor por defecto.
fn parse_value<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Valor inválido para {key} ('{raw}'): {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_usa_el_default_si_no_hay_variable() {
        let v: usize = parse_value("RAG_TOP_K", None, 5).unwrap();
        assert_eq!(v, 5);
    }

    #[test]
    fn parse_value_acepta_valores_con_espacios() {
        let v: u64 = parse_value("LLM_REQUEST_TIMEOUT", Some(" 120 ".to_string()), 80).unwrap();
        assert_eq!(v, 120);
    }

    #[test]
    fn parse_value_rechaza_valores_no_numericos() {
        let err = parse_value::<usize>("RAG_TOP_K", Some("cinco".to_string()), 5).unwrap_err();
        assert!(err.to_string().contains("RAG_TOP_K"));
        assert!(err.to_string().contains("cinco"));
    }

    #[test]
    fn provider_desde_cadena() {
        assert!(matches!(
            LlmProvider::from_str("OpenAI").unwrap(),
            LlmProvider::OpenAI
        ));
        assert!(matches!(
            LlmProvider::from_str("ollama").unwrap(),
            LlmProvider::Ollama
        ));
        assert!(LlmProvider::from_str("claude").is_err());
    }
}
