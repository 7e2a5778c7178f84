// Construtor de funções: transforma uma sequência de descritores de operação
// em uma `Funcao` tipada, atribuindo posições e resolvendo operandos na ordem.

use crate::ir::{Bloco, Funcao, Instrucao, Operacao, Operando, Parametro, Tipo};
use std::fmt;

#[derive(Debug)]
pub enum ErroConstrucao {
    /// Erro estrutural: retorno ausente ou fora da última posição, tipo de
    /// retorno divergente do declarado, referência de operando que não resolve.
    FuncaoMalformada(String),
    /// Erro de tipos: operandos mistos em uma aritmética sem `Converte`
    /// explícito, ou `Converte` aplicado a um operando que não é Int32.
    TiposIncompativeis(String),
}

impl fmt::Display for ErroConstrucao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErroConstrucao::FuncaoMalformada(motivo) => {
                write!(f, "função malformada: {}", motivo)
            }
            ErroConstrucao::TiposIncompativeis(motivo) => {
                write!(f, "tipos incompatíveis: {}", motivo)
            }
        }
    }
}

pub struct ConstrutorFuncao;

impl ConstrutorFuncao {
    /// Constrói uma `Funcao` a partir da sequência de operações.
    ///
    /// Cada descritor é verificado na ordem: seus operandos devem resolver
    /// para um parâmetro, uma constante ou o resultado de uma instrução
    /// anterior. O último descritor deve ser um `Retorna` cujo tipo coincide
    /// com `retorno`. Não há efeitos colaterais além da `Funcao` produzida.
    pub fn construir(
        nome: &str,
        parametros: Vec<Parametro>,
        retorno: Tipo,
        operacoes: Vec<Operacao>,
    ) -> Result<Funcao, ErroConstrucao> {
        if operacoes.is_empty() {
            return Err(ErroConstrucao::FuncaoMalformada(
                "corpo vazio, sem instrução de retorno".to_string(),
            ));
        }

        let ultima = operacoes.len() - 1;
        let mut instrucoes: Vec<Instrucao> = Vec::with_capacity(operacoes.len());

        for (posicao, operacao) in operacoes.into_iter().enumerate() {
            let tipo = match operacao {
                Operacao::Soma(a, b)
                | Operacao::Subtrai(a, b)
                | Operacao::Multiplica(a, b)
                | Operacao::Divide(a, b) => {
                    let tipo_a = resolver(&parametros, &instrucoes, &a, posicao)?;
                    let tipo_b = resolver(&parametros, &instrucoes, &b, posicao)?;
                    if tipo_a != tipo_b {
                        return Err(ErroConstrucao::TiposIncompativeis(format!(
                            "operandos {} e {} na instrução {}",
                            tipo_a, tipo_b, posicao
                        )));
                    }
                    tipo_a
                }
                Operacao::Converte(a) => {
                    let tipo_a = resolver(&parametros, &instrucoes, &a, posicao)?;
                    if tipo_a != Tipo::Int32 {
                        return Err(ErroConstrucao::TiposIncompativeis(format!(
                            "conversão exige operando int32, recebido {} na instrução {}",
                            tipo_a, posicao
                        )));
                    }
                    Tipo::Float64
                }
                Operacao::Retorna(a) => {
                    if posicao != ultima {
                        return Err(ErroConstrucao::FuncaoMalformada(format!(
                            "retorno na instrução {} antes do fim do bloco",
                            posicao
                        )));
                    }
                    let tipo_a = resolver(&parametros, &instrucoes, &a, posicao)?;
                    if tipo_a != retorno {
                        return Err(ErroConstrucao::FuncaoMalformada(format!(
                            "retorno de tipo {}, função declara {}",
                            tipo_a, retorno
                        )));
                    }
                    tipo_a
                }
            };

            instrucoes.push(Instrucao { operacao, tipo });
        }

        // O laço garante que um Retorna só aparece na última posição; falta
        // garantir que a última posição é de fato um Retorna.
        if !matches!(
            instrucoes.last().map(|i| &i.operacao),
            Some(Operacao::Retorna(_))
        ) {
            return Err(ErroConstrucao::FuncaoMalformada(
                "última instrução não é um retorno".to_string(),
            ));
        }

        Ok(Funcao {
            nome: nome.to_string(),
            parametros,
            retorno,
            bloco: Bloco { instrucoes },
        })
    }
}

fn resolver(
    parametros: &[Parametro],
    anteriores: &[Instrucao],
    operando: &Operando,
    posicao: usize,
) -> Result<Tipo, ErroConstrucao> {
    operando.tipo_em(parametros, anteriores).ok_or_else(|| {
        ErroConstrucao::FuncaoMalformada(format!(
            "operando {:?} na instrução {} não referencia parâmetro ou instrução anterior",
            operando, posicao
        ))
    })
}
