use std::io::{stdin, stdout, Read, Write};
use std::path::Path;

use clap::Parser;

use hocon::{parse_file, parse_str, ParseOptions, RenderOptions, ResolveOptions, Syntax};
use hocon_lexing::{tokenize, DebugTokenExt, Origin};

/// Parses, resolves and re-renders HOCON, JSON and properties config files
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Force the input syntax instead of guessing from the file extension
    #[arg(short, long, value_parser = parse_syntax)]
    syntax: Option<Syntax>,

    /// Skip substitution resolution
    #[arg(long, default_value_t = false)]
    no_resolve: bool,

    /// Don't consult environment variables during resolution
    #[arg(long, default_value_t = false)]
    no_env: bool,

    /// Render on a single line
    #[arg(short, long, default_value_t = false)]
    compact: bool,

    /// Render HOCON instead of JSON
    #[arg(long, default_value_t = false)]
    hocon: bool,

    /// (debugging) Show raw lexer output rather than rendering
    #[arg(long, default_value_t = false)]
    lex: bool,

    /// (debugging) Show the parsed value tree without resolving
    #[arg(long, default_value_t = false)]
    tree: bool,

    /// Path of the file to read (leave empty or use "-" for STDIN)
    file_path: Option<String>,
}

fn parse_syntax(value: &str) -> Result<Syntax, String> {
    match value {
        "conf" | "hocon" => Ok(Syntax::Conf),
        "json" => Ok(Syntax::Json),
        "properties" => Ok(Syntax::Properties),
        other => Err(format!(
            "unknown syntax {:?} (expected conf, json or properties)",
            other
        )),
    }
}

fn main() {
    let args = Args::parse();

    let from_stdin = args.file_path.as_deref().map_or(true, |path| path == "-");
    let options = ParseOptions::defaults().with_syntax(args.syntax);

    if args.lex {
        let input = read_input(&args);
        let origin = Origin::new(if from_stdin { "STDIN" } else { "file" });
        let mut stdout = stdout().lock();
        for token in tokenize(&origin, &input, args.syntax != Some(Syntax::Json)) {
            write!(stdout, "{}", token.human_readable_string())
                .or_error("Failed to write to STDOUT");
        }
        return;
    }

    let config = if from_stdin {
        let input = read_input(&args);
        parse_str(&input, &options)
    } else {
        parse_file(Path::new(args.file_path.as_ref().unwrap()), &options)
    };

    let config = match config {
        Ok(config) => config,
        Err(error) => exit_with_error(error),
    };

    let render_options = if args.hocon {
        RenderOptions::conf()
    } else {
        RenderOptions::defaults()
    }
    .with_formatted(!args.compact);

    if args.tree {
        print!(
            "{}",
            ensure_newline(config.render(&render_options))
        );
        return;
    }

    let config = if args.no_resolve {
        config
    } else {
        let resolve_options = if args.no_env {
            ResolveOptions::no_system()
        } else {
            ResolveOptions::defaults()
        };
        match config.resolve(&resolve_options) {
            Ok(config) => config,
            Err(error) => exit_with_error(error),
        }
    };

    print!("{}", ensure_newline(config.render(&render_options)));
}

fn ensure_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn read_input(args: &Args) -> String {
    let mut buffer = String::new();

    match args.file_path.as_deref() {
        Some("-") | None => {
            if let Err(error) = stdin().read_to_string(&mut buffer) {
                exit_with_error(format!("Failed to read from STDIN: {}", error));
            }
        }
        Some(file_path) => match std::fs::read_to_string(file_path) {
            Ok(text) => buffer = text,
            Err(error) => exit_with_error(format!("Failed to read input file: {}", error)),
        },
    }

    buffer
}

fn exit_with_error<T: std::fmt::Display>(msg: T) -> ! {
    eprintln!("Error: {}", msg);
    std::process::exit(1);
}

trait OrError<T> {
    /// Return the success result or exit the process with an error message
    fn or_error(self, msg: &str) -> T;
}

impl<T, E> OrError<T> for Result<T, E> {
    fn or_error(self, msg: &str) -> T {
        match self {
            Ok(result) => result,
            Err(_) => {
                exit_with_error(msg);
            }
        }
    }
}
