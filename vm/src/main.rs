use std::process;

use ast::build::*;
use ast::CodeBlock;
use clap::{Parser, ValueEnum};

use object::HeapSettings;
use vm::disassemble::disassemble;
use vm::{special, Error, VmSettings, VM};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Demo programs to run in order (all of them if none are given)
    #[arg(value_enum)]
    demos: Vec<Demo>,

    /// Print the bytecode of each demo instead of running it
    #[arg(long)]
    dump_bytecode: bool,

    /// Slots pre-allocated per object kind
    #[arg(long, default_value_t = HeapSettings::default().initial_capacity)]
    pool_capacity: usize,

    /// Every n-th collection triggered by a kind is a full one
    #[arg(long, default_value_t = HeapSettings::default().full_cycle_interval)]
    full_gc_interval: u32,

    /// Nested activations allowed before a stack overflow
    #[arg(long, default_value_t = VmSettings::default().max_depth)]
    max_depth: usize,

    /// Print collector statistics after the demos
    #[arg(long)]
    gc_stats: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Demo {
    /// (3 + 4) * 2
    Arith,
    /// A closure capturing a local
    Closure,
    /// Several messages to one Transcript
    Cascade,
    /// A self-recursive countdown far deeper than --max-depth
    Tail,
    /// Enough garbage to force collections
    Gc,
}

impl Demo {
    /// Globals the demo expects, installed before compiling its unit.
    fn setup(self, vm: &mut VM) -> Result<(), Error> {
        match self {
            Demo::Tail | Demo::Gc => {
                if vm.global("Counter").is_some() {
                    return Ok(());
                }
                let counter = vm.define_object("Counter");
                // down: n  ^ n = 0 ifTrue: [0] ifFalse: [self down: n - 1]
                vm.define_method(
                    counter,
                    &signature("down:", &["n"]),
                    &block(vec![keyword(
                        binary(symbol("n"), "=", number("0")),
                        "ifTrue:ifFalse:",
                        vec![
                            closure(&[], vec![number("0")]),
                            closure(
                                &[],
                                vec![keyword(
                                    symbol("self"),
                                    "down:",
                                    vec![binary(symbol("n"), "-", number("1"))],
                                )],
                            ),
                        ],
                    )]),
                )?;
                // churn: n  allocates an array per step
                vm.define_method(
                    counter,
                    &signature("churn:", &["n"]),
                    &block(vec![keyword(
                        binary(symbol("n"), "=", number("0")),
                        "ifTrue:ifFalse:",
                        vec![
                            closure(&[], vec![number("0")]),
                            closure(
                                &[],
                                vec![
                                    statement(unary(
                                        array(vec![symbol("n"), symbol("n")]),
                                        "size",
                                    )),
                                    keyword(
                                        symbol("self"),
                                        "churn:",
                                        vec![binary(symbol("n"), "-", number("1"))],
                                    ),
                                ],
                            ),
                        ],
                    )]),
                )?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn unit(self) -> CodeBlock {
        match self {
            Demo::Arith => block(vec![binary(
                binary(number("3"), "+", number("4")),
                "*",
                number("2"),
            )]),
            Demo::Closure => block(vec![
                assign("base", number("41")),
                assign(
                    "adder",
                    closure(&["x"], vec![binary(symbol("x"), "+", symbol("base"))]),
                ),
                keyword(symbol("adder"), "value:", vec![number("1")]),
            ]),
            Demo::Cascade => block(vec![cascade(
                symbol("Transcript"),
                vec![
                    ("print:", vec![string("hello")]),
                    ("print:", vec![string(", world")]),
                    ("endl", vec![]),
                ],
            )]),
            Demo::Tail => block(vec![keyword(
                symbol("Counter"),
                "down:",
                vec![number("100000")],
            )]),
            Demo::Gc => block(vec![
                assign("kept", array(vec![number("1"), number("2"), number("3")])),
                statement(keyword(symbol("Counter"), "churn:", vec![number("20000")])),
                unary(symbol("kept"), "size"),
            ]),
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let settings = VmSettings {
        heap: HeapSettings {
            initial_capacity: cli.pool_capacity,
            full_cycle_interval: cli.full_gc_interval,
            ..Default::default()
        },
        max_depth: cli.max_depth,
    };
    let mut vm = match special::bootstrap(settings) {
        Ok(vm) => vm,
        Err(err) => {
            eprintln!("Error starting VM: {err}");
            process::exit(1);
        }
    };

    let demos = if cli.demos.is_empty() {
        Demo::value_variants().to_vec()
    } else {
        cli.demos.clone()
    };

    let mut failed = false;
    for demo in demos {
        let name = demo
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default();
        match run_demo(&mut vm, demo, cli.dump_bytecode) {
            Ok(Some(text)) => println!("{name}: {text}"),
            Ok(None) => {}
            Err(err) => {
                eprintln!("{name}: {err}");
                failed = true;
            }
        }
    }

    if cli.gc_stats {
        print_gc_stats(&vm);
    }
    if failed {
        process::exit(1);
    }
}

/// Answers the printed result, or `None` when only the bytecode was dumped.
fn run_demo(vm: &mut VM, demo: Demo, dump: bool) -> Result<Option<String>, Error> {
    demo.setup(vm)?;
    let method = vm.compile(&demo.unit())?;

    if dump {
        let listing = vm
            .heap
            .get(method)
            .map(|m| disassemble(m.compiled(), &vm.constants))
            .unwrap_or_default();
        println!("== {demo:?} ==");
        print!("{listing}");
        return Ok(None);
    }

    let result = vm.eval(method);
    let value = vm.pop();
    result?;
    Ok(value.map(|v| vm.display(v)))
}

fn print_gc_stats(vm: &VM) {
    let stats = vm.heap.stats();
    println!(
        "gc: {} cycles ({} full), {} released, {} promoted, {} pool growths",
        stats.cycles, stats.full_cycles, stats.released, stats.promoted, stats.grown
    );
    for kind in object::ObjectKind::ALL {
        println!(
            "  {kind:<14} capacity {:>8}  live {:>8}",
            vm.heap.capacity(kind),
            vm.heap.live(kind)
        );
    }
}
