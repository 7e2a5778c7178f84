// Compilação e execução nativa usando Cranelift.

pub mod cranelift_engine;

use std::fmt;

#[derive(Debug)]
pub enum ErroJit {
    /// Falha no rebaixamento nativo: ISA do host indisponível, função com
    /// mais parâmetros do que o despacho de chamada suporta, ou erro interno
    /// do Cranelift.
    Compilacao(String),
    /// Violação de contrato na fronteira de chamada: quantidade ou tipos de
    /// argumentos diferentes da assinatura compilada.
    AridadeOuTipoInvalido(String),
}

impl fmt::Display for ErroJit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErroJit::Compilacao(motivo) => write!(f, "erro de compilação: {}", motivo),
            ErroJit::AridadeOuTipoInvalido(motivo) => {
                write!(f, "aridade ou tipo inválido: {}", motivo)
            }
        }
    }
}

pub use cranelift_engine::{CompiladorJit, FuncaoCompilada};
