//! Carga de documentos PDF del directorio de datos y troceado del texto
//! en chunks solapados, la unidad de embedding y recuperación.

use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::models::Document;

/// Recorre recursivamente el directorio de datos y extrae el texto de
/// todos los PDF encontrados.
///
/// Errores fatales: el directorio no existe, o no produce ningún
/// documento con texto útil. Un PDF individual ilegible se salta con
/// un aviso, igual que en la ingesta de ficheros sueltos.
pub fn load_documents(data_dir: &Path) -> Result<Vec<Document>> {
    if !data_dir.is_dir() {
        return Err(anyhow!(
            "O diretório de dados '{}' não foi encontrado.",
            data_dir.display()
        ));
    }

    let mut pdf_paths: Vec<_> = WalkDir::new(data_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            p.extension()
                .and_then(std::ffi::OsStr::to_str)
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    // Orden estable para que reconstrucciones del índice sean reproducibles.
    pdf_paths.sort();

    let mut documents = Vec::new();
    for path in &pdf_paths {
        let text = match pdf_extract::extract_text(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "No se pudo extraer texto del PDF {}: {}. Saltando fichero.",
                    path.display(),
                    e
                );
                continue;
            }
        };

        if text.trim().is_empty() {
            warn!("PDF vacío o sin texto útil: {}", path.display());
            continue;
        }

        let filename = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        info!("Documento cargado: {} ({} caracteres)", filename, text.len());
        documents.push(Document { filename, text });
    }

    if documents.is_empty() {
        return Err(anyhow!(
            "Nenhum documento PDF encontrado em '{}'.",
            data_dir.display()
        ));
    }

    Ok(documents)
}

/// Trocea un texto en chunks de como máximo `max_chars` caracteres,
/// agrupando párrafos completos cuando es posible. Cada chunk (salvo el
/// primero) arranca con los últimos `overlap` caracteres del anterior,
/// para no cortar el contexto en la frontera.
///
/// Un token indivisible más largo que el máximo se conserva entero:
/// es la única situación en la que un chunk supera `max_chars`.
pub fn split_into_chunks(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    // Ninguna pieza puede superar este presupuesto; así el solape
    // sembrado más el separador y la pieza siguiente siempre caben.
    let piece_max = max_chars.saturating_sub(overlap + 2).max(1);
    let pieces = collect_pieces(text, piece_max);

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        let extra = if current.is_empty() { 0 } else { 2 };
        if current.len() + extra + piece.len() > max_chars && !current.is_empty() {
            let tail = byte_tail(&current, overlap).to_string();
            chunks.push(std::mem::take(&mut current));
            current = tail;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&piece);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Divide el texto en piezas de como máximo `piece_max` caracteres:
/// párrafos enteros cuando caben, y párrafos largos repartidos por
/// palabras. Sólo una palabra indivisible puede superar el presupuesto.
fn collect_pieces(text: &str, piece_max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if paragraph.len() <= piece_max {
            pieces.push(paragraph.to_string());
            continue;
        }
        let mut piece = String::new();
        for word in paragraph.split_whitespace() {
            let extra = if piece.is_empty() { 0 } else { 1 };
            if piece.len() + extra + word.len() > piece_max && !piece.is_empty() {
                pieces.push(std::mem::take(&mut piece));
            }
            if !piece.is_empty() {
                piece.push(' ');
            }
            piece.push_str(word);
        }
        if !piece.is_empty() {
            pieces.push(piece);
        }
    }
    pieces
}

/// Sufijo de `s` de como máximo `max_bytes` bytes, respetando
/// fronteras UTF-8.
fn byte_tail(s: &str, max_bytes: usize) -> &str {
    if max_bytes == 0 {
        return "";
    }
    if s.len() <= max_bytes {
        return s;
    }
    let mut start = s.len() - max_bytes;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
