//! Colección vectorial persistente en disco local.
//!
//! Cada colección se serializa como un único fichero JSON dentro del
//! directorio de persistencia, con la versión del formato y el modelo de
//! embeddings con el que se construyó. La búsqueda es un barrido por
//! similitud coseno; para un corpus de normativa cabe de sobra en memoria.
//!
//! API pública:
//!   - `VectorStore::create` / `VectorStore::open`
//!   - `add_entries`, `persist`
//!   - `search`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::IndexEntry;

const COLLECTION_FORMAT_VERSION: u32 = 1;

/// Representación en disco de una colección.
#[derive(Serialize, Deserialize)]
struct CollectionFile {
    version: u32,
    collection: String,
    embedding_model: String,
    created_at: String,
    entries: Vec<IndexEntry>,
}

/// Colección de chunks embebidos, con persistencia en
/// `<persist_dir>/<collection>.json`.
#[derive(Debug)]
pub struct VectorStore {
    persist_dir: PathBuf,
    collection: String,
    embedding_model: String,
    entries: Vec<IndexEntry>,
}

impl VectorStore {
    /// Crea una colección vacía en memoria. No toca el disco hasta
    /// llamar a [`VectorStore::persist`].
    pub fn create(persist_dir: &Path, collection: &str, embedding_model: &str) -> Self {
        Self {
            persist_dir: persist_dir.to_path_buf(),
            collection: collection.to_string(),
            embedding_model: embedding_model.to_string(),
            entries: Vec::new(),
        }
    }

    /// Abre una colección existente por nombre.
    ///
    /// Un fichero ausente o corrupto es un error fatal: el mensaje guía
    /// al usuario a borrar el directorio y reconstruir el índice.
    pub fn open(persist_dir: &Path, collection: &str, embedding_model: &str) -> Result<Self> {
        let path = collection_path(persist_dir, collection);
        let raw = fs::read_to_string(&path).with_context(|| {
            format!(
                "Erro ao carregar a coleção '{}' de '{}'. \
                 Verifique se o diretório não está corrompido ou recrie o índice apagando a pasta.",
                collection,
                persist_dir.display()
            )
        })?;

        let file: CollectionFile = serde_json::from_str(&raw).with_context(|| {
            format!(
                "Erro ao carregar a coleção '{}': conteúdo inválido em '{}'. \
                 Recrie o índice apagando a pasta.",
                collection,
                path.display()
            )
        })?;

        if file.version != COLLECTION_FORMAT_VERSION {
            return Err(anyhow!(
                "Versión de formato no soportada en la colección '{}': {} (esperada {})",
                collection,
                file.version,
                COLLECTION_FORMAT_VERSION
            ));
        }
        if file.embedding_model != embedding_model {
            // Sin el mismo modelo las distancias no son comparables, pero
            // no hay ruta de reindexado incremental: se avisa y se sigue.
            warn!(
                "La colección '{}' se construyó con el modelo de embeddings '{}' y la \
                 configuración actual usa '{}'. Las distancias pueden no ser significativas.",
                collection, file.embedding_model, embedding_model
            );
        }

        info!(
            "Colección '{}' abierta con {} entradas (creada en {}).",
            collection,
            file.entries.len(),
            file.created_at
        );

        Ok(Self {
            persist_dir: persist_dir.to_path_buf(),
            collection: file.collection,
            embedding_model: file.embedding_model,
            entries: file.entries,
        })
    }

    pub fn add_entries(&mut self, batch: Vec<IndexEntry>) {
        self.entries.extend(batch);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Escribe la colección a disco. Se escribe primero a un fichero
    /// temporal y se renombra al final, de modo que un fallo a mitad no
    /// deja una colección parcial publicada.
    pub fn persist(&self) -> Result<()> {
        fs::create_dir_all(&self.persist_dir).with_context(|| {
            format!(
                "No se pudo crear el directorio de persistencia '{}'",
                self.persist_dir.display()
            )
        })?;

        let file = CollectionFile {
            version: COLLECTION_FORMAT_VERSION,
            collection: self.collection.clone(),
            embedding_model: self.embedding_model.clone(),
            created_at: Utc::now().to_rfc3339(),
            entries: self.entries.clone(),
        };

        let path = collection_path(&self.persist_dir, &self.collection);
        let tmp_path = path.with_extension("json.tmp");
        let data = serde_json::to_string(&file)?;
        fs::write(&tmp_path, data)
            .with_context(|| format!("No se pudo escribir '{}'", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("No se pudo publicar '{}'", path.display()))?;

        info!(
            "Colección '{}' persistida con {} entradas en '{}'.",
            self.collection,
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Devuelve las `top_k` entradas más próximas al vector de consulta
    /// por similitud coseno, en orden descendente de puntuación. Los
    /// empates conservan el orden de inserción.
    pub fn search(&self, query_vec: &[f64], top_k: usize) -> Vec<(f64, &IndexEntry)> {
        let mut scored: Vec<(f64, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query_vec, &entry.embedding), entry))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}

fn collection_path(persist_dir: &Path, collection: &str) -> PathBuf {
    persist_dir.join(format!("{collection}.json"))
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|y| y * y).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, embedding: Vec<f64>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            source: "doc.pdf".to_string(),
            chunk_index: 0,
            text: format!("texto de {id}"),
            embedding,
        }
    }

    #[test]
    fn persistir_y_reabrir_conserva_las_entradas() {
        let dir = tempfile::tempdir().unwrap();
        let persist_dir = dir.path().join("vector_db");

        let mut store = VectorStore::create(&persist_dir, "docs", "modelo-a");
        store.add_entries(vec![
            entry("a", vec![1.0, 0.0]),
            entry("b", vec![0.0, 1.0]),
        ]);
        store.persist().unwrap();

        let reopened = VectorStore::open(&persist_dir, "docs", "modelo-a").unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.collection(), "docs");
    }

    #[test]
    fn abrir_coleccion_inexistente_es_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorStore::open(dir.path(), "docs", "modelo-a").unwrap_err();
        assert!(err.to_string().contains("Erro ao carregar a coleção"));
    }

    #[test]
    fn abrir_coleccion_corrupta_es_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("docs.json"), "{esto no es json").unwrap();
        let err = VectorStore::open(dir.path(), "docs", "modelo-a").unwrap_err();
        assert!(err.to_string().contains("conteúdo inválido"));
    }

    #[test]
    fn abrir_con_otro_modelo_avisa_pero_no_falla() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::create(dir.path(), "docs", "modelo-a");
        store.add_entries(vec![entry("a", vec![1.0, 0.0])]);
        store.persist().unwrap();

        let reopened = VectorStore::open(dir.path(), "docs", "modelo-b").unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn la_busqueda_ordena_por_similitud_descendente() {
        let mut store = VectorStore::create(Path::new("/tmp/no_usado"), "docs", "m");
        store.add_entries(vec![
            entry("ortogonal", vec![0.0, 1.0]),
            entry("cercano", vec![0.9, 0.1]),
            entry("identico", vec![1.0, 0.0]),
        ]);

        let results = store.search(&[1.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1.id, "identico");
        assert_eq!(results[1].1.id, "cercano");
        assert!(results[0].0 > results[1].0);
    }

    #[test]
    fn top_k_mayor_que_el_tamano_devuelve_todo() {
        let mut store = VectorStore::create(Path::new("/tmp/no_usado"), "docs", "m");
        store.add_entries(vec![entry("a", vec![1.0]), entry("b", vec![0.5])]);
        assert_eq!(store.search(&[1.0], 10).len(), 2);
    }

    #[test]
    fn similitud_coseno_basica() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn la_busqueda_es_estable_ante_empates() {
        let mut store = VectorStore::create(Path::new("/tmp/no_usado"), "docs", "m");
        store.add_entries(vec![
            entry("primero", vec![1.0, 0.0]),
            entry("segundo", vec![1.0, 0.0]),
        ]);
        let results = store.search(&[1.0, 0.0], 2);
        assert_eq!(results[0].1.id, "primero");
        assert_eq!(results[1].1.id, "segundo");
    }
}
