// Programa deslocamento: constrói e executa a fórmula cinemática
// x_0 + v_0*t - g*t²/2, com g = 9.78033.
//
// A constante 2 entra na IR como int32 convertida para float64, preservando
// a sequência do programa original.
//
// cargo run --bin deslocamento -- 10.0 0.0 1.0

use compilador_expressoes::{
    verificar, CompiladorJit, ConstrutorFuncao, Operacao, Operando, Parametro, Tipo, Valor,
};
use std::env;
use std::process;

const GRAVIDADE: f64 = 9.78033;

// Semântica de atof: ignora espaços iniciais, lê o prefixo numérico
// ([+-]?dígitos[.dígitos][e[+-]dígitos]) e devolve 0 quando não há prefixo
// válido.
fn real_ou_zero(texto: &str) -> f64 {
    let texto = texto.trim_start();
    let bytes = texto.as_bytes();
    let mut fim = 0;
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        fim = i;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            fim = i;
        }
    }
    // o expoente só conta se vier com dígitos
    if fim > 0 && i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let mut digitos = j;
        while digitos < bytes.len() && bytes[digitos].is_ascii_digit() {
            digitos += 1;
        }
        if digitos > j {
            fim = digitos;
        }
    }
    texto[..fim].parse().unwrap_or(0.0)
}

fn executar(argumentos: &[String]) -> Result<(), String> {
    // Argumentos posicionais opcionais: ausente cai no padrão do programa
    // original, presente é lido com a leniência do atof (não numérico vira 0).
    let x0: f64 = argumentos
        .get(1)
        .map(|s| real_ou_zero(s))
        .unwrap_or(10.0);
    let v0: f64 = argumentos
        .get(2)
        .map(|s| real_ou_zero(s))
        .unwrap_or(0.0);
    let t: f64 = argumentos
        .get(3)
        .map(|s| real_ou_zero(s))
        .unwrap_or(1.0);

    let funcao = ConstrutorFuncao::construir(
        "deslocamento",
        vec![
            Parametro::new("x_0", Tipo::Float64),
            Parametro::new("v_0", Tipo::Float64),
            Parametro::new("t", Tipo::Float64),
        ],
        Tipo::Float64,
        vec![
            // 0: dois = float64(2)
            Operacao::Converte(Operando::Constante(Valor::Int32(2))),
            // 1: v_0 * t
            Operacao::Multiplica(Operando::Parametro(1), Operando::Parametro(2)),
            // 2: x_0 + v_0*t
            Operacao::Soma(Operando::Parametro(0), Operando::Instrucao(1)),
            // 3: t * t
            Operacao::Multiplica(Operando::Parametro(2), Operando::Parametro(2)),
            // 4: g * t²
            Operacao::Multiplica(
                Operando::Constante(Valor::Float64(GRAVIDADE)),
                Operando::Instrucao(3),
            ),
            // 5: g*t² / dois
            Operacao::Divide(Operando::Instrucao(4), Operando::Instrucao(0)),
            // 6: (x_0 + v_0*t) - g*t²/2
            Operacao::Subtrai(Operando::Instrucao(2), Operando::Instrucao(5)),
            Operacao::Retorna(Operando::Instrucao(6)),
        ],
    )
    .map_err(|e| e.to_string())?;

    verificar(&funcao).map_err(|e| e.to_string())?;

    let mut jit = CompiladorJit::new().map_err(|e| e.to_string())?;
    let compilada = jit.compilar(&funcao).map_err(|e| e.to_string())?;

    eprintln!("iniciando deslocamento({}, {}, {}):", x0, v0, t);
    let resultado = jit
        .chamar(
            &compilada,
            &[Valor::Float64(x0), Valor::Float64(v0), Valor::Float64(t)],
        )
        .map_err(|e| e.to_string())?;

    println!("Output: {}", resultado);
    Ok(())
}

fn main() {
    let argumentos: Vec<String> = env::args().collect();
    if let Err(erro) = executar(&argumentos) {
        let programa = argumentos
            .first()
            .map(String::as_str)
            .unwrap_or("deslocamento");
        eprintln!("{}: {}", programa, erro);
        process::exit(1);
    }
}
