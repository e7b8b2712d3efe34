use std::io::{IsTerminal, Read};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use se::diagnostic::{Diagnostic, ansi::AnsiRenderer, json, registry};
use se::lexer::{Options, Reader, read_statement};
use se::{Context, ExceptionRecord};

/// se evaluates expression scripts: numbers, names, arrays, calls and
/// assignments, one `;`-separated statement at a time.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Script text. Several sources run in order in one context.
    sources: Vec<String>,

    /// Read the script from a file, after any inline sources.
    #[arg(short, long)]
    file: Option<std::path::PathBuf>,

    /// Print the output of a compile stage for every statement instead of running.
    #[arg(long, value_enum)]
    emit: Option<Stage>,

    /// Report errors as one-line JSON.
    #[arg(long)]
    json: bool,

    /// Explain an error code, e.g. SE-T001.
    #[arg(long, value_name = "CODE")]
    explain: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stage {
    Tokens,
    Rpn,
    Stream,
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    // only when asked for
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn report(e: &ExceptionRecord, ctx: &Context, as_json: bool) {
    let d = Diagnostic::from_record(e, ctx.script()).with_tab_width(ctx.options().tab_width);
    if as_json {
        eprintln!("{}", json::render(&d));
    } else {
        let renderer = AnsiRenderer { use_color: std::io::stderr().is_terminal() };
        eprint!("{}", renderer.render(&d));
    }
}

/// Read every script source into one context, in order.
fn load_sources(args: &Args, ctx: &mut Context) -> Result<(), String> {
    for source in &args.sources {
        ctx.load(source);
    }
    if let Some(path) = &args.file {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("error reading {}: {e}", path.display()))?;
        ctx.load(&text);
    }
    if args.sources.is_empty() && args.file.is_none() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("error reading stdin: {e}"))?;
        ctx.load(&text);
    }
    Ok(())
}

fn emit_statement(stage: Stage, tokens: &[se::lexer::Token], script: &str) -> se::Result<String> {
    let json = match stage {
        Stage::Tokens => serde_json::to_string(tokens),
        Stage::Rpn => {
            let units = se::parser::to_rpn(tokens)?;
            serde_json::to_string(&serde_json::json!({
                "rpn": se::unit::render_units(&units, script),
                "units": units,
            }))
        }
        Stage::Stream => {
            let stream = se::verify::to_stream(se::parser::to_rpn(tokens)?)?;
            serde_json::to_string(&stream)
        }
    };
    Ok(json.unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#)))
}

fn emit(stage: Stage, script: &str) -> se::Result<()> {
    let mut reader = Reader::new(script, Options::default());
    while let Some(tokens) = read_statement(&mut reader)? {
        if tokens.is_empty() {
            continue;
        }
        println!("{}", emit_statement(stage, &tokens, script)?);
    }
    Ok(())
}

fn run(ctx: &mut Context) -> se::Result<Option<se::Value>> {
    while ctx.forward()? {
        ctx.parse()?;
        ctx.execute()?;
    }
    Ok(ctx.value())
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    if let Some(code) = &args.explain {
        return match registry::lookup(code) {
            Some(entry) => {
                print!("{}", entry.long);
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("unknown error code '{code}'");
                ExitCode::FAILURE
            }
        };
    }

    let mut ctx = Context::new();
    if let Err(message) = load_sources(&args, &mut ctx) {
        eprintln!("{message}");
        return ExitCode::FAILURE;
    }

    let outcome = match args.emit {
        Some(stage) => emit(stage, ctx.script()),
        None => run(&mut ctx).map(|value| {
            if let Some(value) = value {
                println!("{value}");
            }
        }),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e, &ctx, args.json);
            ExitCode::FAILURE
        }
    }
}
