// src/lib.rs

//! Compilador JIT de Expressões Aritméticas
//!
//! Este projeto implementa o caminho completo expressão → código nativo:
//! - IR tipada (int32 e float64) com um único bloco de entrada
//! - Construtor de funções a partir de descritores de operação
//! - Verificador estrutural e de tipos (fail-fast)
//! - Compilação e execução nativa com Cranelift
//!
//! O fluxo é estritamente unidirecional:
//! construir → verificar → compilar → chamar.

// Declarar módulos principais
pub mod construtor;
pub mod ir;
pub mod jit;
pub mod verificador;

// Re-exportações básicas
pub use construtor::{ConstrutorFuncao, ErroConstrucao};
pub use ir::{Bloco, Funcao, Instrucao, Operacao, Operando, Parametro, Tipo, Valor};
pub use jit::{CompiladorJit, ErroJit, FuncaoCompilada};
pub use verificador::{verificar, ErroVerificacao};

// Estrutura principal do compilador
pub struct CompiladorExpressoes {
    jit: CompiladorJit,
}

impl CompiladorExpressoes {
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            jit: CompiladorJit::new().map_err(|e| e.to_string())?,
        })
    }

    /// Constrói, verifica, compila e executa uma função em uma única chamada.
    pub fn executar(
        &mut self,
        nome: &str,
        parametros: Vec<Parametro>,
        retorno: Tipo,
        operacoes: Vec<Operacao>,
        argumentos: &[Valor],
    ) -> Result<Valor, String> {
        let funcao = ConstrutorFuncao::construir(nome, parametros, retorno, operacoes)
            .map_err(|e| e.to_string())?;
        verificar(&funcao).map_err(|e| e.to_string())?;
        let compilada = self.jit.compilar(&funcao).map_err(|e| e.to_string())?;
        self.jit
            .chamar(&compilada, argumentos)
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teste_pipeline_completo() {
        let mut compilador = CompiladorExpressoes::new().expect("motor JIT");
        let resultado = compilador
            .executar(
                "soma",
                vec![
                    Parametro::new("x", Tipo::Int32),
                    Parametro::new("y", Tipo::Int32),
                ],
                Tipo::Int32,
                vec![
                    Operacao::Soma(Operando::Parametro(0), Operando::Parametro(1)),
                    Operacao::Retorna(Operando::Instrucao(0)),
                ],
                &[Valor::Int32(2), Valor::Int32(2)],
            )
            .expect("pipeline");
        assert_eq!(resultado, Valor::Int32(4));
    }
}
