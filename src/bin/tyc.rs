use std::{
    env, fs,
    io::{self, Read, Write},
    process::ExitCode,
};

use log::debug;
use tyc::{
    compile, lexer, parser,
    util::{fmt::tree, intern::Interner},
};

static USAGE: &str = r#"
usage: tyc CMD [FILE]

commands:
    tokens  Print the token stream of the source
    parse   Print the parsed syntax tree of the source
    emit    Compile the source and print the generated code

FILE may be `-` (or absent) to read from standard input.

examples:
    tyc emit program.ty
    echo 'export(f) f = @() -> {1 + 2}' | tyc emit
"#;

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    let Some(cmd) = parse_args() else {
        print!("{USAGE}");
        // FreeBSD EX_USAGE (64)
        return ExitCode::from(64);
    };

    match run(&cmd) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

struct Cmd {
    mode: Mode,
    source: Source,
}

enum Mode {
    Tokens,
    Parse,
    Emit,
}

enum Source {
    Stdin,
    File(String),
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    let mode = match args.next()?.as_str() {
        "tokens" => Mode::Tokens,
        "parse" => Mode::Parse,
        "emit" => Mode::Emit,
        _ => return None,
    };
    let source = match args.next().as_deref() {
        None | Some("-") => Source::Stdin,
        Some(path) => Source::File(path.into()),
    };
    Some(Cmd { mode, source })
}

/// Runs the selected mode, returning a rendered message on failure.
fn run(cmd: &Cmd) -> Result<(), String> {
    let src = read_source(&cmd.source).map_err(|e| format!("failed to read input: {e}"))?;
    let mut idents = Interner::with_capacity(128);

    match cmd.mode {
        Mode::Tokens => {
            let tokens = lexer::lex_in_new(&src)
                .map_err(|e| compile::render_error(&src, &idents, &compile::Error::Lex(e)))?;
            debug!("lexed {} tokens", tokens.len());
            for token in &tokens {
                println!("{token:?}");
            }
        }
        Mode::Parse => {
            let tokens = lexer::lex_in_new(&src)
                .map_err(|e| compile::render_error(&src, &idents, &compile::Error::Lex(e)))?;
            let ast = parser::parse(&src, &tokens, &mut idents)
                .map_err(|e| compile::render_error(&src, &idents, &compile::Error::Parse(e)))?;
            print!("{}", tree::print_ast_string(&idents, &ast));
        }
        Mode::Emit => {
            let mut sink = io::BufWriter::new(io::stdout().lock());
            compile::compile(&src, &mut idents, &mut sink)
                .map_err(|e| compile::render_error(&src, &idents, &e))?;
            sink.flush()
                .map_err(|e| format!("failed to write output: {e}"))?;
        }
    }
    Ok(())
}

fn read_source(source: &Source) -> io::Result<String> {
    match source {
        Source::Stdin => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Source::File(path) => fs::read_to_string(path),
    }
}
