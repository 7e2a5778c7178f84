// Motor JIT com Cranelift: rebaixa uma `Funcao` verificada para código de
// máquina do host e expõe o ponto de entrada como função chamável.
//
// A memória executável pertence ao `JITModule` do motor; um
// `FuncaoCompilada` só é utilizável através do `CompiladorJit` que o criou
// e é liberado junto com ele.

use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::{
    types, AbiParam, Function, InstBuilder, Signature, Type, UserFuncName, Value,
};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{Linkage, Module};

use super::ErroJit;
use crate::ir::{Funcao, Operacao, Operando, Tipo, Valor};

/// Limite de parâmetros que `chamar` consegue despachar: o transmute para a
/// assinatura `extern "C"` concreta exige enumerar as formas possíveis.
const MAX_PARAMETROS: usize = 3;

/// Artefato executável de uma função compilada: ponto de entrada nativo mais
/// a assinatura usada na checagem de fronteira de `chamar`.
pub struct FuncaoCompilada {
    ptr: *const u8,
    parametros: Vec<Tipo>,
    retorno: Tipo,
}

pub struct CompiladorJit {
    module: JITModule,
    ctx: cranelift_codegen::Context,
    builder_ctx: FunctionBuilderContext,
    proximo_simbolo: u32,
}

impl CompiladorJit {
    /// Cria um motor para a ISA do host. Não há inicialização global de
    /// alvo: cada instância constrói sua própria ISA.
    pub fn new() -> Result<Self, ErroJit> {
        let mut flag_builder = settings::builder();
        flag_builder.set("opt_level", "speed").ok();
        let flags = settings::Flags::new(flag_builder);
        let isa = cranelift_native::builder()
            .map_err(|e| ErroJit::Compilacao(e.to_string()))?
            .finish(flags)
            .map_err(|e| ErroJit::Compilacao(e.to_string()))?;
        let jit_builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
        let module = JITModule::new(jit_builder);
        Ok(Self {
            module,
            ctx: cranelift_codegen::Context::new(),
            builder_ctx: FunctionBuilderContext::new(),
            proximo_simbolo: 0,
        })
    }

    /// Compila uma `Funcao` verificada para código nativo.
    ///
    /// Semântica preservada da IR: aritmética int32 com wraparound
    /// (iadd/isub/imul e divisão com sinal, onde i32::MIN / -1 devolve
    /// i32::MIN sem trap), aritmética float64 IEEE-754 (divisão por zero
    /// produz ±inf/NaN) e conversão int32 → float64 com arredondamento
    /// padrão. Divisão inteira por zero trapa em tempo de execução, como
    /// no hardware.
    ///
    /// Cada chamada declara um símbolo novo, então compilar a mesma `Funcao`
    /// duas vezes produz dois pontos de entrada independentes.
    pub fn compilar(&mut self, funcao: &Funcao) -> Result<FuncaoCompilada, ErroJit> {
        if funcao.parametros.len() > MAX_PARAMETROS {
            return Err(ErroJit::Compilacao(format!(
                "função '{}' tem {} parâmetros, o despacho de chamada suporta no máximo {}",
                funcao.nome,
                funcao.parametros.len(),
                MAX_PARAMETROS
            )));
        }

        let mut sig = Signature::new(self.module.isa().default_call_conv());
        for parametro in &funcao.parametros {
            sig.params.push(AbiParam::new(tipo_nativo(parametro.tipo)));
        }
        sig.returns.push(AbiParam::new(tipo_nativo(funcao.retorno)));

        let simbolo = format!("{}__{}", funcao.nome, self.proximo_simbolo);
        self.proximo_simbolo += 1;

        let func_id = self
            .module
            .declare_function(&simbolo, Linkage::Local, &sig)
            .map_err(|e| ErroJit::Compilacao(e.to_string()))?;

        self.ctx.func =
            Function::with_name_signature(UserFuncName::user(0, func_id.as_u32()), sig);

        {
            let mut builder = FunctionBuilder::new(&mut self.ctx.func, &mut self.builder_ctx);
            let bloco = builder.create_block();
            builder.append_block_params_for_function_params(bloco);
            builder.switch_to_block(bloco);
            builder.seal_block(bloco);

            let parametros: Vec<Value> = builder.block_params(bloco).to_vec();
            // resultado de cada instrução já rebaixada (None para Retorna)
            let mut resultados: Vec<Option<Value>> =
                Vec::with_capacity(funcao.bloco.instrucoes.len());

            for instrucao in &funcao.bloco.instrucoes {
                let resultado = match &instrucao.operacao {
                    Operacao::Soma(a, b) => {
                        let va = traduzir(&mut builder, &parametros, &resultados, a)?;
                        let vb = traduzir(&mut builder, &parametros, &resultados, b)?;
                        Some(match instrucao.tipo {
                            Tipo::Int32 => builder.ins().iadd(va, vb),
                            Tipo::Float64 => builder.ins().fadd(va, vb),
                        })
                    }
                    Operacao::Subtrai(a, b) => {
                        let va = traduzir(&mut builder, &parametros, &resultados, a)?;
                        let vb = traduzir(&mut builder, &parametros, &resultados, b)?;
                        Some(match instrucao.tipo {
                            Tipo::Int32 => builder.ins().isub(va, vb),
                            Tipo::Float64 => builder.ins().fsub(va, vb),
                        })
                    }
                    Operacao::Multiplica(a, b) => {
                        let va = traduzir(&mut builder, &parametros, &resultados, a)?;
                        let vb = traduzir(&mut builder, &parametros, &resultados, b)?;
                        Some(match instrucao.tipo {
                            Tipo::Int32 => builder.ins().imul(va, vb),
                            Tipo::Float64 => builder.ins().fmul(va, vb),
                        })
                    }
                    Operacao::Divide(a, b) => {
                        let va = traduzir(&mut builder, &parametros, &resultados, a)?;
                        let vb = traduzir(&mut builder, &parametros, &resultados, b)?;
                        Some(match instrucao.tipo {
                            Tipo::Int32 => {
                                // A semântica da IR é wraparound: i32::MIN / -1
                                // devolve i32::MIN, mas o sdiv do Cranelift
                                // trapa nesse caso. Desvia o divisor para 1 e
                                // seleciona o quociente correto depois.
                                let e_min = builder.ins().icmp_imm(
                                    IntCC::Equal,
                                    va,
                                    i64::from(i32::MIN),
                                );
                                let e_menos_um = builder.ins().icmp_imm(IntCC::Equal, vb, -1);
                                let estoura = builder.ins().band(e_min, e_menos_um);
                                let um = builder.ins().iconst(types::I32, 1);
                                let divisor = builder.ins().select(estoura, um, vb);
                                let quociente = builder.ins().sdiv(va, divisor);
                                // iconst de I32 exige o imediato com extensão de
                                // zeros; o padrão de bits continua i32::MIN.
                                let minimo = builder
                                    .ins()
                                    .iconst(types::I32, i64::from(i32::MIN as u32));
                                builder.ins().select(estoura, minimo, quociente)
                            }
                            Tipo::Float64 => builder.ins().fdiv(va, vb),
                        })
                    }
                    Operacao::Converte(a) => {
                        let va = traduzir(&mut builder, &parametros, &resultados, a)?;
                        Some(builder.ins().fcvt_from_sint(types::F64, va))
                    }
                    Operacao::Retorna(a) => {
                        let va = traduzir(&mut builder, &parametros, &resultados, a)?;
                        builder.ins().return_(&[va]);
                        None
                    }
                };
                resultados.push(resultado);
            }

            builder.finalize();
        }

        self.module
            .define_function(func_id, &mut self.ctx)
            .map_err(|e| ErroJit::Compilacao(e.to_string()))?;
        self.module.clear_context(&mut self.ctx);
        self.module
            .finalize_definitions()
            .map_err(|e| ErroJit::Compilacao(e.to_string()))?;

        Ok(FuncaoCompilada {
            ptr: self.module.get_finalized_function(func_id),
            parametros: funcao.parametros.iter().map(|p| p.tipo).collect(),
            retorno: funcao.retorno,
        })
    }

    /// Chama uma função compilada com os argumentos dados.
    ///
    /// A quantidade e os tipos dos argumentos são checados contra a
    /// assinatura compilada antes de qualquer execução nativa; a chamada em
    /// si não tem rede de proteção de tipos.
    pub fn chamar(
        &self,
        funcao: &FuncaoCompilada,
        argumentos: &[Valor],
    ) -> Result<Valor, ErroJit> {
        if argumentos.len() != funcao.parametros.len() {
            return Err(ErroJit::AridadeOuTipoInvalido(format!(
                "esperados {} argumentos, recebidos {}",
                funcao.parametros.len(),
                argumentos.len()
            )));
        }
        for (posicao, (argumento, tipo)) in
            argumentos.iter().zip(&funcao.parametros).enumerate()
        {
            if argumento.tipo() != *tipo {
                return Err(ErroJit::AridadeOuTipoInvalido(format!(
                    "argumento {} deveria ser {}, recebido {}",
                    posicao,
                    tipo,
                    argumento.tipo()
                )));
            }
        }

        // Transmuta o ponteiro de entrada para a assinatura `extern "C"`
        // concreta correspondente e invoca. A checagem acima garante que os
        // argumentos casam com a forma escolhida; o ponteiro é válido
        // enquanto este motor existir.
        macro_rules! despacha {
            ($ptr:expr, [$($arg:expr => $t:ty),*], Int32) => {{
                let f: extern "C" fn($($t),*) -> i32 = unsafe { std::mem::transmute($ptr) };
                Valor::Int32(f($($arg),*))
            }};
            ($ptr:expr, [$($arg:expr => $t:ty),*], Float64) => {{
                let f: extern "C" fn($($t),*) -> f64 = unsafe { std::mem::transmute($ptr) };
                Valor::Float64(f($($arg),*))
            }};
        }

        use Tipo::{Float64 as F, Int32 as I};
        let p = funcao.ptr;
        let a = argumentos;
        let resultado = match (funcao.parametros.as_slice(), funcao.retorno) {
            ([], I) => despacha!(p, [], Int32),
            ([], F) => despacha!(p, [], Float64),

            ([I], I) => despacha!(p, [como_i32(&a[0])? => i32], Int32),
            ([I], F) => despacha!(p, [como_i32(&a[0])? => i32], Float64),
            ([F], I) => despacha!(p, [como_f64(&a[0])? => f64], Int32),
            ([F], F) => despacha!(p, [como_f64(&a[0])? => f64], Float64),

            ([I, I], I) => despacha!(p, [como_i32(&a[0])? => i32, como_i32(&a[1])? => i32], Int32),
            ([I, I], F) => despacha!(p, [como_i32(&a[0])? => i32, como_i32(&a[1])? => i32], Float64),
            ([I, F], I) => despacha!(p, [como_i32(&a[0])? => i32, como_f64(&a[1])? => f64], Int32),
            ([I, F], F) => despacha!(p, [como_i32(&a[0])? => i32, como_f64(&a[1])? => f64], Float64),
            ([F, I], I) => despacha!(p, [como_f64(&a[0])? => f64, como_i32(&a[1])? => i32], Int32),
            ([F, I], F) => despacha!(p, [como_f64(&a[0])? => f64, como_i32(&a[1])? => i32], Float64),
            ([F, F], I) => despacha!(p, [como_f64(&a[0])? => f64, como_f64(&a[1])? => f64], Int32),
            ([F, F], F) => despacha!(p, [como_f64(&a[0])? => f64, como_f64(&a[1])? => f64], Float64),

            ([I, I, I], I) => {
                despacha!(p, [como_i32(&a[0])? => i32, como_i32(&a[1])? => i32, como_i32(&a[2])? => i32], Int32)
            }
            ([I, I, I], F) => {
                despacha!(p, [como_i32(&a[0])? => i32, como_i32(&a[1])? => i32, como_i32(&a[2])? => i32], Float64)
            }
            ([I, I, F], I) => {
                despacha!(p, [como_i32(&a[0])? => i32, como_i32(&a[1])? => i32, como_f64(&a[2])? => f64], Int32)
            }
            ([I, I, F], F) => {
                despacha!(p, [como_i32(&a[0])? => i32, como_i32(&a[1])? => i32, como_f64(&a[2])? => f64], Float64)
            }
            ([I, F, I], I) => {
                despacha!(p, [como_i32(&a[0])? => i32, como_f64(&a[1])? => f64, como_i32(&a[2])? => i32], Int32)
            }
            ([I, F, I], F) => {
                despacha!(p, [como_i32(&a[0])? => i32, como_f64(&a[1])? => f64, como_i32(&a[2])? => i32], Float64)
            }
            ([I, F, F], I) => {
                despacha!(p, [como_i32(&a[0])? => i32, como_f64(&a[1])? => f64, como_f64(&a[2])? => f64], Int32)
            }
            ([I, F, F], F) => {
                despacha!(p, [como_i32(&a[0])? => i32, como_f64(&a[1])? => f64, como_f64(&a[2])? => f64], Float64)
            }
            ([F, I, I], I) => {
                despacha!(p, [como_f64(&a[0])? => f64, como_i32(&a[1])? => i32, como_i32(&a[2])? => i32], Int32)
            }
            ([F, I, I], F) => {
                despacha!(p, [como_f64(&a[0])? => f64, como_i32(&a[1])? => i32, como_i32(&a[2])? => i32], Float64)
            }
            ([F, I, F], I) => {
                despacha!(p, [como_f64(&a[0])? => f64, como_i32(&a[1])? => i32, como_f64(&a[2])? => f64], Int32)
            }
            ([F, I, F], F) => {
                despacha!(p, [como_f64(&a[0])? => f64, como_i32(&a[1])? => i32, como_f64(&a[2])? => f64], Float64)
            }
            ([F, F, I], I) => {
                despacha!(p, [como_f64(&a[0])? => f64, como_f64(&a[1])? => f64, como_i32(&a[2])? => i32], Int32)
            }
            ([F, F, I], F) => {
                despacha!(p, [como_f64(&a[0])? => f64, como_f64(&a[1])? => f64, como_i32(&a[2])? => i32], Float64)
            }
            ([F, F, F], I) => {
                despacha!(p, [como_f64(&a[0])? => f64, como_f64(&a[1])? => f64, como_f64(&a[2])? => f64], Int32)
            }
            ([F, F, F], F) => {
                despacha!(p, [como_f64(&a[0])? => f64, como_f64(&a[1])? => f64, como_f64(&a[2])? => f64], Float64)
            }

            (outros, _) => {
                return Err(ErroJit::AridadeOuTipoInvalido(format!(
                    "assinatura com {} parâmetros não suportada",
                    outros.len()
                )))
            }
        };

        Ok(resultado)
    }
}

fn tipo_nativo(tipo: Tipo) -> Type {
    match tipo {
        Tipo::Int32 => types::I32,
        Tipo::Float64 => types::F64,
    }
}

/// Traduz um operando da IR para o valor Cranelift correspondente no bloco
/// corrente. Referências que não resolvem só ocorrem em funções não
/// verificadas e viram `ErroJit::Compilacao`.
fn traduzir(
    builder: &mut FunctionBuilder<'_>,
    parametros: &[Value],
    resultados: &[Option<Value>],
    operando: &Operando,
) -> Result<Value, ErroJit> {
    match operando {
        Operando::Parametro(i) => parametros.get(*i).copied().ok_or_else(|| {
            ErroJit::Compilacao(format!("parâmetro {} fora do intervalo", i))
        }),
        Operando::Constante(Valor::Int32(n)) => {
            Ok(builder.ins().iconst(types::I32, i64::from(*n)))
        }
        Operando::Constante(Valor::Float64(x)) => Ok(builder.ins().f64const(*x)),
        Operando::Instrucao(i) => resultados.get(*i).copied().flatten().ok_or_else(|| {
            ErroJit::Compilacao(format!("referência à instrução {} não resolve", i))
        }),
    }
}

// Extração estrita de argumentos para o despacho: o tipo já foi checado na
// fronteira, então um variante diferente do esperado é violação de contrato.
fn como_i32(valor: &Valor) -> Result<i32, ErroJit> {
    match valor {
        Valor::Int32(n) => Ok(*n),
        Valor::Float64(_) => Err(ErroJit::AridadeOuTipoInvalido(
            "argumento float64 onde a assinatura pede int32".to_string(),
        )),
    }
}

fn como_f64(valor: &Valor) -> Result<f64, ErroJit> {
    match valor {
        Valor::Float64(x) => Ok(*x),
        Valor::Int32(_) => Err(ErroJit::AridadeOuTipoInvalido(
            "argumento int32 onde a assinatura pede float64".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construtor::ConstrutorFuncao;
    use crate::ir::Parametro;

    fn soma_i32() -> Funcao {
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
        .expect("construção válida")
    }

    #[test]
    fn teste_compila_e_chama_soma() {
        let mut jit = CompiladorJit::new().expect("motor JIT");
        let compilada = jit.compilar(&soma_i32()).expect("compilação");
        let resultado = jit
            .chamar(&compilada, &[Valor::Int32(200), Valor::Int32(-300)])
            .expect("chamada");
        assert_eq!(resultado, Valor::Int32(-100));
    }

    #[test]
    fn teste_conversao_int_para_float() {
        let funcao = ConstrutorFuncao::construir(
            "converte",
            vec![Parametro::new("n", Tipo::Int32)],
            Tipo::Float64,
            vec![
                Operacao::Converte(Operando::Parametro(0)),
                Operacao::Retorna(Operando::Instrucao(0)),
            ],
        )
        .expect("construção válida");

        let mut jit = CompiladorJit::new().expect("motor JIT");
        let compilada = jit.compilar(&funcao).expect("compilação");
        let resultado = jit
            .chamar(&compilada, &[Valor::Int32(-7)])
            .expect("chamada");
        assert_eq!(resultado, Valor::Float64(-7.0));
    }

    #[test]
    fn teste_aridade_errada_na_chamada() {
        let mut jit = CompiladorJit::new().expect("motor JIT");
        let compilada = jit.compilar(&soma_i32()).expect("compilação");
        let resultado = jit.chamar(&compilada, &[Valor::Int32(1)]);
        assert!(matches!(
            resultado,
            Err(ErroJit::AridadeOuTipoInvalido(_))
        ));
    }

    #[test]
    fn teste_tipo_de_argumento_errado() {
        let mut jit = CompiladorJit::new().expect("motor JIT");
        let compilada = jit.compilar(&soma_i32()).expect("compilação");
        let resultado = jit.chamar(&compilada, &[Valor::Int32(1), Valor::Float64(2.0)]);
        assert!(matches!(
            resultado,
            Err(ErroJit::AridadeOuTipoInvalido(_))
        ));
    }

    #[test]
    fn teste_divisao_int32_no_limite_nao_trapa() {
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
        .expect("construção válida");

        let mut jit = CompiladorJit::new().expect("motor JIT");
        let compilada = jit.compilar(&funcao).expect("compilação");

        // O único quociente que estoura int32: wraparound, sem trap.
        let resultado = jit
            .chamar(&compilada, &[Valor::Int32(i32::MIN), Valor::Int32(-1)])
            .expect("chamada");
        assert_eq!(resultado, Valor::Int32(i32::MIN));
    }

    #[test]
    fn teste_extracao_estrita_de_argumentos() {
        assert!(matches!(
            como_i32(&Valor::Float64(1.5)),
            Err(ErroJit::AridadeOuTipoInvalido(_))
        ));
        assert!(matches!(
            como_f64(&Valor::Int32(1)),
            Err(ErroJit::AridadeOuTipoInvalido(_))
        ));
        assert!(matches!(como_i32(&Valor::Int32(7)), Ok(7)));
        assert!(matches!(como_f64(&Valor::Float64(2.5)), Ok(x) if x == 2.5));
    }

    #[test]
    fn teste_limite_de_parametros() {
        let parametros = (0..4)
            .map(|i| Parametro::new(&format!("p{}", i), Tipo::Int32))
            .collect();
        let funcao = ConstrutorFuncao::construir(
            "larga",
            parametros,
            Tipo::Int32,
            vec![
                Operacao::Soma(Operando::Parametro(0), Operando::Parametro(3)),
                Operacao::Retorna(Operando::Instrucao(0)),
            ],
        )
        .expect("construção válida");

        let mut jit = CompiladorJit::new().expect("motor JIT");
        assert!(matches!(
            jit.compilar(&funcao),
            Err(ErroJit::Compilacao(_))
        ));
    }
}
