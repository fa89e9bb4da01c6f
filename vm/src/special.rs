use ast::build::{block, primitive, signature, symbol, unary};
use ast::CodeBlock;
use object::{Handle, Map, ObjectKind};

use crate::{Error, VmSettings, VM};

/// Selector, parameter names and the primitive behind it.
type PrimitiveMethod = (&'static str, &'static [&'static str], &'static str);

const COMPARISONS: &[PrimitiveMethod] = &[
    ("=", &["other"], "equals"),
    ("<", &["other"], "less"),
    (">", &["other"], "greater"),
    ("<=", &["other"], "lessOrEqual"),
    (">=", &["other"], "greaterOrEqual"),
];

const IDENTITY: &[PrimitiveMethod] = &[("==", &["other"], "isIdenticalTo")];

const NUMBER: &[PrimitiveMethod] = &[
    ("+", &["other"], "plus"),
    ("-", &["other"], "minus"),
    ("*", &["other"], "multiply"),
    ("/", &["other"], "divide"),
    ("sqrt", &[], "sqrt"),
    ("random", &[], "random"),
];

const STRING: &[PrimitiveMethod] = &[(",", &["other"], "stringConcat")];

const ARRAY: &[PrimitiveMethod] = &[
    ("at:", &["index"], "arrayAt"),
    ("push:", &["value"], "arrayPush"),
    ("take:", &["count"], "arrayTake"),
    ("drop:", &["count"], "arrayDrop"),
    ("size", &[], "arraySize"),
    ("formatString:", &["template"], "arrayFormatString"),
    ("transient", &[], "arrayTransient"),
];

const ARRAY_TRANSIENT: &[PrimitiveMethod] = &[
    ("push:", &["value"], "arrayTransientPush"),
    ("persist", &[], "arrayTransientPersist"),
];

const MAP: &[PrimitiveMethod] = &[
    ("at:", &["key"], "mapAt"),
    ("at:put:", &["key", "value"], "mapAtPut"),
    ("transient", &[], "mapTransient"),
    ("=", &["other"], "equals"),
];

const MAP_TRANSIENT: &[PrimitiveMethod] = &[
    ("at:put:", &["key", "value"], "mapTransientAtPut"),
    ("persist", &[], "mapTransientPersist"),
];

const METHOD: &[PrimitiveMethod] = &[
    ("value", &[], "eval0"),
    ("value:", &["a"], "eval1"),
    ("value:value:", &["a", "b"], "eval2"),
    ("value:value:value:", &["a", "b", "c"], "eval3"),
    ("printBytecode", &[], "printBytecode"),
];

const TRANSCRIPT: &[PrimitiveMethod] =
    &[("print:", &["value"], "print"), ("endl", &[], "endl")];

/// Build a VM whose world has every prototype, `true`, `false` and
/// `Transcript` populated.
pub fn bootstrap(settings: VmSettings) -> Result<VM, Error> {
    let mut vm = VM::new(settings)?;

    let prototypes: [(ObjectKind, &[&[PrimitiveMethod]]); 7] = [
        (ObjectKind::Number, &[NUMBER, COMPARISONS, IDENTITY]),
        (ObjectKind::String, &[STRING, COMPARISONS, IDENTITY]),
        (ObjectKind::Array, &[ARRAY, COMPARISONS, IDENTITY]),
        (ObjectKind::ArrayTransient, &[ARRAY_TRANSIENT, IDENTITY]),
        (ObjectKind::Map, &[MAP, IDENTITY]),
        (ObjectKind::MapTransient, &[MAP_TRANSIENT, IDENTITY]),
        (ObjectKind::Method, &[METHOD, IDENTITY]),
    ];
    for (kind, groups) in prototypes {
        let prototype = vm.world.prototype(kind);
        for methods in groups {
            install_primitives(&mut vm, prototype, methods)?;
        }
    }

    if let Some(transcript) = vm.world.transcript.as_map() {
        install_primitives(&mut vm, transcript, TRANSCRIPT)?;
    }
    install_booleans(&mut vm)?;

    let globals = vm.heap.get(vm.world.globals).map_or(0, Map::len);
    log::info!(
        "bootstrapped {globals} globals, {} prototypes",
        vm.world.prototype_count()
    );
    Ok(vm)
}

fn install_primitives(
    vm: &mut VM,
    holder: Handle<Map>,
    methods: &[PrimitiveMethod],
) -> Result<(), Error> {
    for (selector, parameters, name) in methods {
        vm.define_method(holder, &signature(selector, parameters), &primitive(name))?;
    }
    Ok(())
}

/// `true` and `false` answer conditionals with ordinary bytecode, so a
/// generic `ifTrue:` send agrees with the inlined form.
fn install_booleans(vm: &mut VM) -> Result<(), Error> {
    let run = |name: &str| block(vec![unary(symbol(name), "value")]);
    let answer = |name: &str| block(vec![symbol(name)]);

    let cases: [(bool, [(&str, &[&str], CodeBlock); 5]); 2] = [
        (
            true,
            [
                ("ifTrue:", &["block"], run("block")),
                ("ifFalse:", &["block"], answer("nil")),
                ("ifTrue:ifFalse:", &["yes", "no"], run("yes")),
                ("ifFalse:ifTrue:", &["no", "yes"], run("yes")),
                ("not", &[], answer("false")),
            ],
        ),
        (
            false,
            [
                ("ifTrue:", &["block"], answer("nil")),
                ("ifFalse:", &["block"], run("block")),
                ("ifTrue:ifFalse:", &["yes", "no"], run("no")),
                ("ifFalse:ifTrue:", &["no", "yes"], run("no")),
                ("not", &[], answer("true")),
            ],
        ),
    ];

    for (value, methods) in cases {
        let Some(holder) = vm.world.boolean(value).as_map() else {
            continue;
        };
        for (selector, parameters, body) in &methods {
            vm.define_method(holder, &signature(selector, parameters), body)?;
        }
        install_primitives(vm, holder, IDENTITY)?;
    }
    Ok(())
}
