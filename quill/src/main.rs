use quill::{compile, Backend, CompileOptions, GeneratedProgram, CODEGEN_EXIT_CODE};
use std::io::{self, Read};
use std::{env, fs, process};

const USAGE: &str = "usage: quill [-T|--tokens] [-A|--ast] [-B|--bytecode] [file]";

fn main() {
    let mut options = CompileOptions::default();
    let mut path = None;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-T" | "--tokens" => options.dump_tokens = true,
            "-A" | "--ast" => options.dump_ast = true,
            "-B" | "--bytecode" => {
                options.backend = Backend::Register;
                options.dump_chunk = true;
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                return;
            }
            flag if flag.starts_with('-') || path.is_some() => {
                eprintln!("{}", USAGE);
                process::exit(CODEGEN_EXIT_CODE);
            }
            file => path = Some(file.to_string()),
        }
    }

    let content = match &path {
        Some(path) => {
            options.filename = path.clone();
            fs::read_to_string(path)
        }
        None => {
            let mut content = String::new();
            io::stdin().read_to_string(&mut content).map(|_| content)
        }
    };
    let content = match content {
        Ok(content) => content,
        Err(err) => {
            eprintln!("quill: cannot read {}: {}", options.filename, err);
            process::exit(CODEGEN_EXIT_CODE);
        }
    };

    match compile(&content, &options) {
        Ok(GeneratedProgram::Text(text)) => print!("{}", text),
        Ok(GeneratedProgram::Bytecode(_)) => {}
        Err(err) => {
            eprintln!("{}", err);
            process::exit(err.exit_code());
        }
    }
}
