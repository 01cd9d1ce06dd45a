//! Modelos de dominio (documentos del corpus y entradas del índice vectorial).

use serde::{Deserialize, Serialize};

/// Documento extraído de un PDF del corpus.
/// Vive sólo durante la fase de indexación; tras el chunking se descarta.
#[derive(Debug, Clone)]
pub struct Document {
    /// Nombre del fichero de origen (p.ej. "DOC-ICP-05.pdf").
    pub filename: String,
    /// Texto plano extraído del PDF.
    pub text: String,
}

/// Entrada persistida del índice: un chunk con su embedding y metadatos
/// de procedencia.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    /// Fichero del que procede el chunk.
    pub source: String,
    /// Posición del chunk dentro de su documento.
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f64>,
}
