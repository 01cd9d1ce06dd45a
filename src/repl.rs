//! Bucle interactivo de consola: una pregunta por línea, una respuesta
//! completa antes de leer la siguiente.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use tracing::error;

use crate::{config::AppConfig, llm::LlmManager, rag, vector_store::VectorStore};

/// Palabras de salida aceptadas, sin distinguir mayúsculas.
const EXIT_KEYWORDS: [&str; 3] = ["sair", "exit", "quit"];

/// Comprueba si una línea de entrada es una orden de salida.
/// Se evalúa antes de tocar ningún proveedor.
pub fn is_exit_command(line: &str) -> bool {
    let trimmed = line.trim();
    EXIT_KEYWORDS.iter().any(|kw| trimmed.eq_ignore_ascii_case(kw))
}

/// Ejecuta el bucle de preguntas sobre stdin hasta una orden de salida o
/// fin de entrada. Los fallos de una consulta se informan y el bucle sigue
/// vivo; sólo los errores de E/S de consola lo interrumpen.
pub async fn run(cfg: &AppConfig, llm: &LlmManager, store: &VectorStore) -> Result<()> {
    println!(
        "\nAssistente Jurídico ICP-Brasil (Persistente) - Pergunte algo ou digite 'sair' para encerrar."
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("\n Pergunta: ");
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => {
                // EOF: tratar como salida.
                println!();
                break;
            }
        };

        if is_exit_command(&line) {
            break;
        }
        let question = line.trim();
        // Una línea en blanco no es una pregunta: se vuelve a pedir
        // entrada sin invocar al motor.
        if question.is_empty() {
            continue;
        }

        println!("\nProcessando sua pergunta...");
        match rag::rag_query(store, llm, cfg, question).await {
            Ok((answer, sources)) => {
                println!("\nResposta:\n{answer}");
                if !sources.is_empty() {
                    println!("\nFontes: {}", sources.join(", "));
                }
            }
            Err(err) => {
                error!("La consulta falló: {err}");
                println!("\nNão foi possível responder agora: {err}");
            }
        }
    }

    println!("Encerrando. Até mais!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn las_palabras_de_salida_se_reconocen_en_cualquier_caja() {
        assert!(is_exit_command("sair"));
        assert!(is_exit_command("SAIR"));
        assert!(is_exit_command("Exit"));
        assert!(is_exit_command("qUiT"));
    }

    #[test]
    fn se_ignoran_espacios_y_salto_de_linea() {
        assert!(is_exit_command("  sair  "));
        assert!(is_exit_command("exit\n"));
    }

    #[test]
    fn cualquier_otra_entrada_es_una_pregunta() {
        assert!(!is_exit_command("o que é ICP-Brasil?"));
        assert!(!is_exit_command("sai"));
        assert!(!is_exit_command("sair agora"));
        assert!(!is_exit_command(""));
    }
}
