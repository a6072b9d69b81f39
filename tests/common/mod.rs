//! A tiny interpreter for the IR subset the generator emits.

use std::collections::HashMap;

const STEP_LIMIT: usize = 1_000_000;

#[derive(Debug, Clone, Default)]
struct Function {
    params: Vec<String>,
    entry: String,
    blocks: HashMap<String, Vec<String>>,
}

struct Machine {
    functions: HashMap<String, Function>,
    memory: Vec<u8>,
    output: Vec<i32>,
    steps: usize,
}

/// Runs `@main` and returns every printed integer.
pub fn run(ir: &str) -> Vec<i32> {
    let mut machine = Machine {
        functions: parse_module(ir),
        // address 0 stays unused
        memory: vec![0; 8],
        output: Vec::new(),
        steps: 0,
    };

    machine.call("main", Vec::new());
    machine.output
}

fn parse_module(ir: &str) -> HashMap<String, Function> {
    let mut functions = HashMap::new();
    let mut current: Option<(String, Function)> = None;
    let mut block = String::new();

    for line in ir.lines() {
        let line = line.trim();

        if let Some(header) = line.strip_prefix("define ") {
            let at = header.find('@').expect("function name");
            let open = header[at..].find('(').expect("parameter list") + at;
            let close = header.rfind(')').expect("parameter list end");

            let params = header[open + 1..close]
                .split(", ")
                .filter(|param| !param.is_empty())
                .map(|param| {
                    let (_, name) = param.rsplit_once(' ').expect("typed parameter");
                    name.trim_start_matches('%').to_string()
                })
                .collect();

            current = Some((
                header[at + 1..open].to_string(),
                Function {
                    params,
                    ..Function::default()
                },
            ));
            continue;
        }

        let Some((_, function)) = current.as_mut() else {
            continue;
        };

        if line == "}" {
            let (name, function) = current.take().expect("open function");
            functions.insert(name, function);
        } else if line.is_empty() || line.starts_with(';') {
            continue;
        } else if let Some(label) = line.strip_suffix(':') {
            if function.entry.is_empty() {
                function.entry = label.to_string();
            }
            block = label.to_string();
            function.blocks.insert(block.clone(), Vec::new());
        } else {
            function
                .blocks
                .get_mut(&block)
                .expect("instruction outside a block")
                .push(line.to_string());
        }
    }

    functions
}

fn size_of(ty: &str) -> usize {
    match ty {
        "i1" | "i8" => 1,
        "i32" => 4,
        "i64" => 8,
        ty if ty.ends_with('*') => 8,
        ty => panic!("unknown type {ty}"),
    }
}

fn normalize(ty: &str, value: i64) -> i64 {
    match ty {
        "i1" => value & 1,
        "i8" => value & 0xff,
        "i32" => value as i32 as i64,
        _ => value,
    }
}

fn last_token(text: &str) -> &str {
    text.rsplit(' ').next().expect("token")
}

fn call_args(text: &str) -> (&str, &str) {
    let at = text.find('@').expect("callee");
    let open = text[at..].find('(').expect("argument list") + at;
    let close = text.rfind(')').expect("argument list end");

    (&text[at + 1..open], &text[open + 1..close])
}

impl Machine {
    fn alloc(&mut self, size: usize) -> i64 {
        let address = self.memory.len();
        self.memory.resize(address + size.max(1), 0);

        address as i64
    }

    fn read(&self, address: i64, ty: &str) -> i64 {
        let address = address as usize;
        let size = size_of(ty);
        let mut bytes = [0u8; 8];
        bytes[..size].copy_from_slice(&self.memory[address..address + size]);

        normalize(ty, i64::from_le_bytes(bytes))
    }

    fn write(&mut self, address: i64, ty: &str, value: i64) {
        let address = address as usize;
        let size = size_of(ty);
        self.memory[address..address + size].copy_from_slice(&value.to_le_bytes()[..size]);
    }

    fn call(&mut self, name: &str, args: Vec<i64>) -> i64 {
        let function = self
            .functions
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("unknown function {name}"));

        let mut env: HashMap<String, i64> = function.params.iter().cloned().zip(args).collect();
        let mut block = function.entry.clone();
        let mut previous = String::new();

        'blocks: loop {
            for inst in function.blocks[&block].iter() {
                self.steps += 1;
                assert!(self.steps < STEP_LIMIT, "program does not terminate");

                let value = |operand: &str, env: &HashMap<String, i64>| -> i64 {
                    match operand {
                        "true" => 1,
                        "false" => 0,
                        register if register.starts_with('%') => *env
                            .get(&register[1..])
                            .unwrap_or_else(|| panic!("undefined register {register}")),
                        literal => literal.parse().expect("integer operand"),
                    }
                };

                if let Some(target) = inst.strip_prefix("br label %") {
                    previous = std::mem::replace(&mut block, target.to_string());
                    continue 'blocks;
                }

                if let Some(rest) = inst.strip_prefix("br i1 ") {
                    let parts: Vec<_> = rest.split(", ").collect();
                    let target = if value(parts[0], &env) != 0 { parts[1] } else { parts[2] };
                    let target = target.trim_start_matches("label %").to_string();

                    previous = std::mem::replace(&mut block, target);
                    continue 'blocks;
                }

                if let Some(rest) = inst.strip_prefix("ret ") {
                    if rest == "void" {
                        return 0;
                    }
                    return value(last_token(rest), &env);
                }

                if let Some(rest) = inst.strip_prefix("store ") {
                    let (stored, pointer) = rest.split_once(", ").expect("store operands");
                    let (ty, operand) = stored.split_once(' ').expect("typed operand");
                    let address = value(last_token(pointer), &env);
                    let stored = normalize(ty, value(operand, &env));

                    self.write(address, ty, stored);
                    continue;
                }

                let (dest, rhs) = inst.split_once(" = ").expect("assignment");
                let (op, rest) = rhs.split_once(' ').expect("opcode");

                let result = match op {
                    "alloca" => self.alloc(size_of(rest)),
                    "load" => {
                        let (ty, pointer) = rest.split_once(", ").expect("load operands");
                        self.read(value(last_token(pointer), &env), ty)
                    }
                    "add" | "sub" | "mul" | "xor" | "and" => {
                        let (ty, operands) = rest.split_once(' ').expect("typed operands");
                        let (lhs, rhs) = operands.split_once(", ").expect("two operands");
                        let (lhs, rhs) = (value(lhs, &env), value(rhs, &env));

                        let raw = match op {
                            "add" => lhs.wrapping_add(rhs),
                            "sub" => lhs.wrapping_sub(rhs),
                            "mul" => lhs.wrapping_mul(rhs),
                            "xor" => lhs ^ rhs,
                            _ => lhs & rhs,
                        };
                        normalize(ty, raw)
                    }
                    "icmp" => {
                        let operands = rest.strip_prefix("slt i32 ").expect("signed less than");
                        let (lhs, rhs) = operands.split_once(", ").expect("two operands");

                        ((value(lhs, &env) as i32) < (value(rhs, &env) as i32)) as i64
                    }
                    "trunc" | "zext" | "sext" | "bitcast" => {
                        let tokens: Vec<_> = rest.split(' ').collect();
                        let operand = value(tokens[1], &env);

                        match op {
                            "trunc" => normalize(tokens[3], operand),
                            "zext" => normalize(tokens[0], operand),
                            "sext" => operand as i32 as i64,
                            _ => operand,
                        }
                    }
                    "getelementptr" => {
                        let parts: Vec<_> = rest
                            .trim_start_matches("inbounds ")
                            .split(", ")
                            .collect();
                        let base = value(last_token(parts[1]), &env);
                        let index = value(last_token(parts[2]), &env);

                        base + index * size_of(parts[0]) as i64
                    }
                    "phi" => rest
                        .split('[')
                        .skip(1)
                        .find_map(|incoming| {
                            let incoming = incoming.split(']').next()?.trim();
                            let (operand, label) = incoming.split_once(", ")?;
                            (label.trim_start_matches('%') == previous)
                                .then(|| value(operand, &env))
                        })
                        .expect("phi without matching predecessor"),
                    "call" if rest.contains("@printf(") => {
                        let (_, printed) = rest.rsplit_once("i32 ").expect("printed value");
                        let printed = value(printed.trim_end_matches(')'), &env);
                        self.output.push(printed as i32);
                        0
                    }
                    "call" if rest.contains("@calloc(") => {
                        let (_, args) = call_args(rest);
                        let (count, size) = args.split_once(", ").expect("calloc arguments");
                        let bytes = value(last_token(count), &env) * value(last_token(size), &env);

                        self.alloc(bytes as usize)
                    }
                    "call" => {
                        let (callee, args) = call_args(rest);
                        let args = args
                            .split(", ")
                            .filter(|arg| !arg.is_empty())
                            .map(|arg| value(last_token(arg), &env))
                            .collect();

                        self.call(callee, args)
                    }
                    op => panic!("unsupported instruction {op}"),
                };

                env.insert(dest.trim_start_matches('%').to_string(), result);
            }

            panic!("block {block} falls through");
        }
    }
}
