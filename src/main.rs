// Programa somador: constrói soma(x: int32, y: int32) -> int32 { x + y },
// compila para nativo e chama com os argumentos da linha de comando.
//
// cargo run --bin somador -- 40 2

use compilador_expressoes::{
    verificar, CompiladorJit, ConstrutorFuncao, Operacao, Operando, Parametro, Tipo, Valor,
};
use std::env;
use std::process;

// Semântica de atol: ignora espaços iniciais, lê o prefixo numérico
// ([+-]?dígitos) e devolve 0 quando não há prefixo válido.
fn inteiro_ou_zero(texto: &str) -> i32 {
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
    texto[..fim].parse().unwrap_or(0)
}

fn executar(argumentos: &[String]) -> Result<(), String> {
    // Argumentos posicionais opcionais: ausente cai no padrão do programa
    // original, presente é lido com a leniência do atol (não numérico vira 0).
    let x: i32 = argumentos
        .get(1)
        .map(|s| inteiro_ou_zero(s))
        .unwrap_or(200);
    let y: i32 = argumentos
        .get(2)
        .map(|s| inteiro_ou_zero(s))
        .unwrap_or(-300);

    let funcao = ConstrutorFuncao::construir(
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
    )
    .map_err(|e| e.to_string())?;

    verificar(&funcao).map_err(|e| e.to_string())?;

    let mut jit = CompiladorJit::new().map_err(|e| e.to_string())?;
    let compilada = jit.compilar(&funcao).map_err(|e| e.to_string())?;

    eprintln!("iniciando soma({}, {}):", x, y);
    let resultado = jit
        .chamar(&compilada, &[Valor::Int32(x), Valor::Int32(y)])
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
            .unwrap_or("somador");
        eprintln!("{}: {}", programa, erro);
        process::exit(1);
    }
}
