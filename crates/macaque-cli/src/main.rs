//! Command line driver: run a Monkey script, dump its bytecode, or start an
//! interactive REPL.

use std::env;
use std::fs;
use std::process;

use macaque::compiler::Bytecode;
use macaque::{Constant, Executor, MonkeyObject, Session, StdPrint};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut input_file = None;
    let mut dump_bytecode = false;

    for arg in &args[1..] {
        match arg.as_str() {
            "--bytecode" => dump_bytecode = true,
            "--help" | "-h" => {
                usage();
                return;
            }
            _ => {
                if arg.starts_with('-') {
                    eprintln!("Unknown option: {arg}");
                    usage();
                    process::exit(2);
                }
                input_file = Some(arg.clone());
            }
        }
    }

    match input_file {
        Some(path) => run_file(&path, dump_bytecode),
        None => repl(),
    }
}

fn usage() {
    eprintln!("Usage: macaque [options] [file.mk]");
    eprintln!("Options:");
    eprintln!("  --bytecode  Print the compiled bytecode instead of running");
    eprintln!();
    eprintln!("With no file, starts an interactive REPL.");
}

fn run_file(path: &str, dump_bytecode: bool) {
    let source = fs::read_to_string(path).unwrap_or_else(|err| {
        eprintln!("Error reading {path}: {err}");
        process::exit(1);
    });

    let executor = Executor::new(&source).unwrap_or_else(|err| {
        eprintln!("{err}");
        process::exit(1);
    });

    if dump_bytecode {
        dump(executor.bytecode());
        return;
    }

    if let Err(err) = executor.run_with_writer(&mut StdPrint) {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn dump(bytecode: &Bytecode) {
    print!("{}", bytecode.instructions);
    for (index, constant) in bytecode.constants.iter().enumerate() {
        match constant {
            Constant::Int(value) => println!("const {index}: {value}"),
            Constant::Str(value) => println!("const {index}: {value:?}"),
            Constant::Function(func) => {
                println!(
                    "const {index}: fn ({} parameters, {} locals)",
                    func.num_parameters, func.num_locals
                );
                for line in func.instructions.disassemble().lines() {
                    println!("  {line}");
                }
            }
        }
    }
}

fn repl() {
    println!("macaque {} — Monkey bytecode REPL", env!("CARGO_PKG_VERSION"));

    let mut editor = DefaultEditor::new().unwrap_or_else(|err| {
        eprintln!("Failed to start line editor: {err}");
        process::exit(1);
    });
    let mut session = Session::new();

    loop {
        match editor.readline(">> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                match session.eval(&line, &mut StdPrint) {
                    Ok(MonkeyObject::Null) => {}
                    Ok(result) => println!("{result}"),
                    Err(err) => eprintln!("{err}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{err}");
                break;
            }
        }
    }
}
