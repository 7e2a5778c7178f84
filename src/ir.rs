// Representação intermediária: tipos, valores, operandos e instruções.
//
// Uma `Funcao` tem um único bloco de entrada; cada instrução referencia
// parâmetros, constantes ou resultados de instruções anteriores por índice.
// Nenhuma referência para frente é permitida.

use std::fmt;

/// Tipos primitivos suportados pela IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tipo {
    Int32,
    Float64,
}

impl fmt::Display for Tipo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tipo::Int32 => write!(f, "int32"),
            Tipo::Float64 => write!(f, "float64"),
        }
    }
}

/// Um valor concreto: constante na IR ou argumento/resultado na fronteira
/// de chamada do código nativo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Valor {
    Int32(i32),
    Float64(f64),
}

impl Valor {
    pub fn tipo(&self) -> Tipo {
        match self {
            Valor::Int32(_) => Tipo::Int32,
            Valor::Float64(_) => Tipo::Float64,
        }
    }
}

impl fmt::Display for Valor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Valor::Int32(n) => write!(f, "{}", n),
            Valor::Float64(x) => write!(f, "{}", x),
        }
    }
}

/// Referência a um valor dentro do corpo de uma função.
///
/// `Instrucao(i)` aponta para o resultado da instrução na posição `i`,
/// obrigatoriamente anterior à instrução que a usa.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operando {
    Parametro(usize),
    Constante(Valor),
    Instrucao(usize),
}

impl Operando {
    /// Resolve o tipo deste operando dado o contexto: os parâmetros da função
    /// e as instruções já construídas (anteriores à posição corrente).
    ///
    /// Retorna `None` se a referência não resolve: índice fora do intervalo ou
    /// referência a uma instrução que não produz resultado (`Retorna`).
    pub fn tipo_em(&self, parametros: &[Parametro], anteriores: &[Instrucao]) -> Option<Tipo> {
        match self {
            Operando::Parametro(i) => parametros.get(*i).map(|p| p.tipo),
            Operando::Constante(valor) => Some(valor.tipo()),
            Operando::Instrucao(i) => anteriores.get(*i).and_then(|instrucao| {
                if matches!(instrucao.operacao, Operacao::Retorna(_)) {
                    None
                } else {
                    Some(instrucao.tipo)
                }
            }),
        }
    }
}

/// Descritor de operação. As aritméticas exigem operandos do mesmo tipo;
/// `Converte` faz a conversão explícita Int32 → Float64.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operacao {
    Soma(Operando, Operando),
    Subtrai(Operando, Operando),
    Multiplica(Operando, Operando),
    Divide(Operando, Operando),
    Converte(Operando),
    Retorna(Operando),
}

/// Instrução construída: a operação mais o tipo do seu resultado.
/// Para `Retorna`, `tipo` é o tipo do valor devolvido.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrucao {
    pub operacao: Operacao,
    pub tipo: Tipo,
}

/// Bloco único de entrada. Invariante: exatamente um `Retorna`, sempre o último.
#[derive(Debug, Clone, PartialEq)]
pub struct Bloco {
    pub instrucoes: Vec<Instrucao>,
}

/// Parâmetro declarado de uma função.
#[derive(Debug, Clone, PartialEq)]
pub struct Parametro {
    pub nome: String,
    pub tipo: Tipo,
}

impl Parametro {
    pub fn new(nome: &str, tipo: Tipo) -> Self {
        Self {
            nome: nome.to_string(),
            tipo,
        }
    }
}

/// Função completa: nome, parâmetros ordenados, tipo de retorno e o bloco
/// de entrada. Construída pelo `ConstrutorFuncao` e validada pelo
/// `verificador` antes da compilação nativa.
#[derive(Debug, Clone, PartialEq)]
pub struct Funcao {
    pub nome: String,
    pub parametros: Vec<Parametro>,
    pub retorno: Tipo,
    pub bloco: Bloco,
}
