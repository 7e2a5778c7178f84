// Verificador estrutural e de tipos, executado antes da compilação nativa.
// Cumpre o mesmo papel do `verifyModule` do programa original: revalida a
// função inteira, independente das checagens feitas durante a construção.
//
// Política fail-fast: devolve a primeira violação encontrada, sem enumerar
// as demais.

use crate::ir::{Funcao, Instrucao, Operacao, Operando, Tipo};
use std::fmt;

#[derive(Debug)]
pub enum ErroVerificacao {
    /// Operando que não resolve para parâmetro ou instrução anterior.
    ReferenciaInvalida(String),
    /// Operandos ou resultado com tipos incompatíveis com a operação.
    TiposIncompativeis(String),
    /// Retorno ausente, ou de tipo diferente do declarado pela função.
    RetornoInvalido(String),
    /// Instrução depois do retorno terminal.
    InstrucaoInalcancavel(String),
}

impl fmt::Display for ErroVerificacao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErroVerificacao::ReferenciaInvalida(motivo) => {
                write!(f, "referência inválida: {}", motivo)
            }
            ErroVerificacao::TiposIncompativeis(motivo) => {
                write!(f, "tipos incompatíveis: {}", motivo)
            }
            ErroVerificacao::RetornoInvalido(motivo) => write!(f, "retorno inválido: {}", motivo),
            ErroVerificacao::InstrucaoInalcancavel(motivo) => {
                write!(f, "instrução inalcançável: {}", motivo)
            }
        }
    }
}

/// Verifica uma `Funcao` construída (ou montada à mão).
///
/// Checagens, na ordem, por instrução:
/// (a) todo operando resolve para um parâmetro ou instrução anterior;
/// (b) os tipos dos operandos são compatíveis com a operação e com o tipo
///     de resultado registrado na instrução;
/// (c) o bloco termina em exatamente um `Retorna` do tipo declarado;
/// (d) nenhuma instrução aparece depois do `Retorna`.
pub fn verificar(funcao: &Funcao) -> Result<(), ErroVerificacao> {
    let instrucoes = &funcao.bloco.instrucoes;
    if instrucoes.is_empty() {
        return Err(ErroVerificacao::RetornoInvalido(format!(
            "função '{}' tem bloco vazio, sem retorno",
            funcao.nome
        )));
    }

    let ultima = instrucoes.len() - 1;
    for (posicao, instrucao) in instrucoes.iter().enumerate() {
        let anteriores = &instrucoes[..posicao];
        match &instrucao.operacao {
            Operacao::Soma(a, b)
            | Operacao::Subtrai(a, b)
            | Operacao::Multiplica(a, b)
            | Operacao::Divide(a, b) => {
                let tipo_a = resolver(funcao, posicao, a, anteriores)?;
                let tipo_b = resolver(funcao, posicao, b, anteriores)?;
                if tipo_a != tipo_b {
                    return Err(ErroVerificacao::TiposIncompativeis(format!(
                        "instrução {} mistura {} e {}",
                        posicao, tipo_a, tipo_b
                    )));
                }
                if instrucao.tipo != tipo_a {
                    return Err(ErroVerificacao::TiposIncompativeis(format!(
                        "instrução {} registra resultado {}, operandos são {}",
                        posicao, instrucao.tipo, tipo_a
                    )));
                }
            }
            Operacao::Converte(a) => {
                let tipo_a = resolver(funcao, posicao, a, anteriores)?;
                if tipo_a != Tipo::Int32 || instrucao.tipo != Tipo::Float64 {
                    return Err(ErroVerificacao::TiposIncompativeis(format!(
                        "instrução {}: conversão é int32 para float64, recebida {} para {}",
                        posicao, tipo_a, instrucao.tipo
                    )));
                }
            }
            Operacao::Retorna(a) => {
                if posicao != ultima {
                    return Err(ErroVerificacao::InstrucaoInalcancavel(format!(
                        "retorno na instrução {}, bloco segue até {}",
                        posicao, ultima
                    )));
                }
                let tipo_a = resolver(funcao, posicao, a, anteriores)?;
                if tipo_a != funcao.retorno {
                    return Err(ErroVerificacao::RetornoInvalido(format!(
                        "retorna {}, função '{}' declara {}",
                        tipo_a, funcao.nome, funcao.retorno
                    )));
                }
            }
        }
    }

    if !matches!(instrucoes[ultima].operacao, Operacao::Retorna(_)) {
        return Err(ErroVerificacao::RetornoInvalido(format!(
            "função '{}' não termina em retorno",
            funcao.nome
        )));
    }

    Ok(())
}

fn resolver(
    funcao: &Funcao,
    posicao: usize,
    operando: &Operando,
    anteriores: &[Instrucao],
) -> Result<Tipo, ErroVerificacao> {
    operando
        .tipo_em(&funcao.parametros, anteriores)
        .ok_or_else(|| {
            ErroVerificacao::ReferenciaInvalida(format!(
                "operando {:?} na instrução {} da função '{}'",
                operando, posicao, funcao.nome
            ))
        })
}
