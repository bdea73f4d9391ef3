use std::{
    env,
    io::{self, BufRead},
    process::ExitCode,
};

use itertools::Itertools;
use kobraille::{
    equation::{
        normalize::normalize,
        parser::parse,
        scanner::{tokenize, TokenKind},
    },
    translate, Braille, DotNumbers, Options,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let options = Options::default();
    let input = env::args().skip(1).join(" ");

    let sources = if input.is_empty() {
        match io::stdin().lock().lines().collect::<Result<Vec<_>, _>>() {
            Ok(lines) => lines,
            Err(error) => {
                eprintln!("failed to read input: {error}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        vec![input]
    };

    let mut failed = false;
    for source in sources.iter().filter(|line| !line.trim().is_empty()) {
        failed |= !show(source, &options);
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Prints every stage of the translation of `source`.
fn show(source: &str, options: &Options) -> bool {
    println!("input:     {source}");

    match tokenize(source) {
        Ok(tokens) => {
            let shown = tokens
                .iter()
                .filter(|token| token.kind != TokenKind::Eof)
                .join(" ");
            println!("tokens:    {shown}");
            if let Ok(expr) = parse(&tokens) {
                println!("parsed:    {expr}");
                if let Ok(normalized) = normalize(expr, options) {
                    print!("structure:\n{}", normalized.expr.tree());
                }
            }
        }
        Err(_) => println!("tokens:    -"),
    }

    let result = match translate(source, options) {
        Ok(translation) => {
            println!("braille:   {}", Braille(&translation.cells));
            println!("dots:      {}", DotNumbers(&translation.cells));
            for warning in &translation.warnings {
                println!("warning:   {warning}");
            }
            true
        }
        Err(error) => {
            println!("error:     {error}");
            println!("           {source}");
            println!("           {}^", " ".repeat(error.position()));
            false
        }
    };
    println!();
    result
}
