// Propriedades do pipeline construir → verificar → compilar → chamar,
// exercidas pela biblioteca (sem passar pelos binários).

use compilador_expressoes::{
    verificar, CompiladorJit, ConstrutorFuncao, ErroConstrucao, ErroJit, Funcao, Operacao,
    Operando, Parametro, Tipo, Valor,
};

const GRAVIDADE: f64 = 9.78033;

fn construir_soma() -> Funcao {
    ConstrutorFuncao::construir(
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
    .expect("a soma deveria construir")
}

fn construir_deslocamento() -> Funcao {
    ConstrutorFuncao::construir(
        "deslocamento",
        vec![
            Parametro::new("x_0", Tipo::Float64),
            Parametro::new("v_0", Tipo::Float64),
            Parametro::new("t", Tipo::Float64),
        ],
        Tipo::Float64,
        vec![
            Operacao::Converte(Operando::Constante(Valor::Int32(2))),
            Operacao::Multiplica(Operando::Parametro(1), Operando::Parametro(2)),
            Operacao::Soma(Operando::Parametro(0), Operando::Instrucao(1)),
            Operacao::Multiplica(Operando::Parametro(2), Operando::Parametro(2)),
            Operacao::Multiplica(
                Operando::Constante(Valor::Float64(GRAVIDADE)),
                Operando::Instrucao(3),
            ),
            Operacao::Divide(Operando::Instrucao(4), Operando::Instrucao(0)),
            Operacao::Subtrai(Operando::Instrucao(2), Operando::Instrucao(5)),
            Operacao::Retorna(Operando::Instrucao(6)),
        ],
    )
    .expect("o deslocamento deveria construir")
}

fn chamar_soma(jit: &CompiladorJit, compilada: &compilador_expressoes::FuncaoCompilada, x: i32, y: i32) -> i32 {
    match jit
        .chamar(compilada, &[Valor::Int32(x), Valor::Int32(y)])
        .expect("chamada da soma")
    {
        Valor::Int32(n) => n,
        outro => panic!("soma devolveu {:?}", outro),
    }
}

#[test]
fn teste_soma_basica_e_wraparound() {
    let funcao = construir_soma();
    verificar(&funcao).expect("verificação");

    let mut jit = CompiladorJit::new().expect("motor JIT");
    let compilada = jit.compilar(&funcao).expect("compilação");

    assert_eq!(chamar_soma(&jit, &compilada, 200, -300), -100);
    // Overflow com wraparound de complemento de dois, sem trap.
    assert_eq!(chamar_soma(&jit, &compilada, i32::MAX, 1), i32::MIN);
    assert_eq!(chamar_soma(&jit, &compilada, i32::MIN, -1), i32::MAX);

    for (a, b) in [(0, 0), (123_456, 654_321), (-1, 1), (i32::MAX, i32::MAX)] {
        assert_eq!(chamar_soma(&jit, &compilada, a, b), a.wrapping_add(b));
    }
}

#[test]
fn teste_formula_do_deslocamento() {
    let funcao = construir_deslocamento();
    verificar(&funcao).expect("verificação");

    let mut jit = CompiladorJit::new().expect("motor JIT");
    let compilada = jit.compilar(&funcao).expect("compilação");

    for (x0, v0, t) in [
        (10.0, 0.0, 1.0),
        (0.0, 3.0, 2.0),
        (-5.5, 12.25, 0.5),
        (100.0, -9.8, 3.0),
    ] {
        let esperado = x0 + v0 * t - GRAVIDADE * (t * t) / 2.0;
        let resultado = jit
            .chamar(
                &compilada,
                &[Valor::Float64(x0), Valor::Float64(v0), Valor::Float64(t)],
            )
            .expect("chamada do deslocamento");
        match resultado {
            Valor::Float64(r) => assert!(
                (r - esperado).abs() < 1e-9,
                "deslocamento({}, {}, {}) = {}, esperado {}",
                x0,
                v0,
                t,
                r,
                esperado
            ),
            outro => panic!("deslocamento devolveu {:?}", outro),
        }
    }
}

#[test]
fn teste_divisao_int32_com_wraparound() {
    let funcao = ConstrutorFuncao::construir(
        "divide",
        vec![
            Parametro::new("a", Tipo::Int32),
            Parametro::new("b", Tipo::Int32),
        ],
        Tipo::Int32,
        vec![
            Operacao::Divide(Operando::Parametro(0), Operando::Parametro(1)),
            Operacao::Retorna(Operando::Instrucao(0)),
        ],
    )
    .expect("construção");
    verificar(&funcao).expect("verificação");

    let mut jit = CompiladorJit::new().expect("motor JIT");
    let compilada = jit.compilar(&funcao).expect("compilação");

    let dividir = |a: i32, b: i32| {
        match jit
            .chamar(&compilada, &[Valor::Int32(a), Valor::Int32(b)])
            .expect("chamada da divisão")
        {
            Valor::Int32(n) => n,
            outro => panic!("divisão devolveu {:?}", outro),
        }
    };

    // i32::MIN / -1 estoura o quociente: wraparound, sem trap.
    assert_eq!(dividir(i32::MIN, -1), i32::MIN);
    // Divisão com sinal trunca em direção a zero.
    assert_eq!(dividir(7, 2), 3);
    assert_eq!(dividir(-7, 2), -3);
    assert_eq!(dividir(7, -2), -3);
    assert_eq!(dividir(i32::MIN, 1), i32::MIN);
}

#[test]
fn teste_divisao_float_por_zero_produz_infinito() {
    // Divisão IEEE-754: sem erro, resultado ±inf.
    let funcao = ConstrutorFuncao::construir(
        "divide",
        vec![
            Parametro::new("a", Tipo::Float64),
            Parametro::new("b", Tipo::Float64),
        ],
        Tipo::Float64,
        vec![
            Operacao::Divide(Operando::Parametro(0), Operando::Parametro(1)),
            Operacao::Retorna(Operando::Instrucao(0)),
        ],
    )
    .expect("construção");
    verificar(&funcao).expect("verificação");

    let mut jit = CompiladorJit::new().expect("motor JIT");
    let compilada = jit.compilar(&funcao).expect("compilação");
    let resultado = jit
        .chamar(&compilada, &[Valor::Float64(1.0), Valor::Float64(0.0)])
        .expect("chamada");
    assert_eq!(resultado, Valor::Float64(f64::INFINITY));
}

#[test]
fn teste_tipos_mistos_nao_constroem() {
    // int32 + float64 sem Converte: erro de construção, nenhuma Funcao sai.
    let resultado = ConstrutorFuncao::construir(
        "mista",
        vec![
            Parametro::new("n", Tipo::Int32),
            Parametro::new("x", Tipo::Float64),
        ],
        Tipo::Float64,
        vec![
            Operacao::Soma(Operando::Parametro(0), Operando::Parametro(1)),
            Operacao::Retorna(Operando::Instrucao(0)),
        ],
    );
    assert!(matches!(
        resultado,
        Err(ErroConstrucao::TiposIncompativeis(_))
    ));
}

#[test]
fn teste_compilacao_duas_vezes_da_o_mesmo_resultado() {
    let funcao = construir_soma();
    verificar(&funcao).expect("verificação");

    let mut jit = CompiladorJit::new().expect("motor JIT");
    let primeira = jit.compilar(&funcao).expect("primeira compilação");
    let segunda = jit.compilar(&funcao).expect("segunda compilação");

    for (a, b) in [(200, -300), (i32::MAX, 1), (7, 35)] {
        assert_eq!(
            chamar_soma(&jit, &primeira, a, b),
            chamar_soma(&jit, &segunda, a, b)
        );
    }
}

#[test]
fn teste_fronteira_de_chamada_rejeita_contrato_violado() {
    let funcao = construir_soma();
    verificar(&funcao).expect("verificação");

    let mut jit = CompiladorJit::new().expect("motor JIT");
    let compilada = jit.compilar(&funcao).expect("compilação");

    // Aridade errada
    assert!(matches!(
        jit.chamar(&compilada, &[Valor::Int32(1)]),
        Err(ErroJit::AridadeOuTipoInvalido(_))
    ));
    // Tipo errado
    assert!(matches!(
        jit.chamar(&compilada, &[Valor::Float64(1.0), Valor::Int32(2)]),
        Err(ErroJit::AridadeOuTipoInvalido(_))
    ));
}

#[test]
fn teste_subtracao_e_multiplicacao_int32() {
    let funcao = ConstrutorFuncao::construir(
        "conta",
        vec![
            Parametro::new("a", Tipo::Int32),
            Parametro::new("b", Tipo::Int32),
        ],
        Tipo::Int32,
        vec![
            // (a - b) * b
            Operacao::Subtrai(Operando::Parametro(0), Operando::Parametro(1)),
            Operacao::Multiplica(Operando::Instrucao(0), Operando::Parametro(1)),
            Operacao::Retorna(Operando::Instrucao(1)),
        ],
    )
    .expect("construção");
    verificar(&funcao).expect("verificação");

    let mut jit = CompiladorJit::new().expect("motor JIT");
    let compilada = jit.compilar(&funcao).expect("compilação");
    let resultado = jit
        .chamar(&compilada, &[Valor::Int32(10), Valor::Int32(3)])
        .expect("chamada");
    assert_eq!(resultado, Valor::Int32(21));

    // Multiplicação também com wraparound
    let resultado = jit
        .chamar(&compilada, &[Valor::Int32(i32::MAX), Valor::Int32(2)])
        .expect("chamada");
    assert_eq!(
        resultado,
        Valor::Int32(i32::MAX.wrapping_sub(2).wrapping_mul(2))
    );
}
