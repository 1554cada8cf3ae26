pub mod cli;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use csslike_core::{lex, CompileCache, CompileError, CompileOptions, ConfigError, LexError};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind};
use tracing::Level;

use crate::cli::{Cli, Command, CompileArgs};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to encode tokens: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Build(args) => build(&args.compile),
        Command::Watch(args) => watch(&args.compile, Duration::from_millis(args.debounce_ms)),
        Command::Tokens(args) => tokens(&args.input),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

/// Config file values first, then command line flags on top.
fn options(args: &CompileArgs) -> Result<CompileOptions, CliError> {
    let options = match &args.config {
        Some(path) => CompileOptions::load(path)?,
        None => CompileOptions::default(),
    };
    Ok(if args.minify { options.with_minify(true) } else { options })
}

fn build(args: &CompileArgs) -> Result<(), CliError> {
    let options = options(args)?;
    let css = csslike_core::compile_file(&args.input, &options)?;
    write_output(args.output.as_deref(), css.as_bytes())?;
    tracing::info!(input = %args.input.display(), bytes = css.len(), "compiled");
    Ok(())
}

/// Rebuild whenever the input changes on disk. Watches the input's
/// directory and filters events down to the input itself. Compile errors
/// are logged and watching continues.
fn watch(args: &CompileArgs, debounce: Duration) -> Result<(), CliError> {
    let options = options(args)?;
    let input = args.input.canonicalize().map_err(|source| CliError::Read {
        path: args.input.clone(),
        source,
    })?;
    let directory = input.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(debounce, tx)?;
    debouncer
        .watcher()
        .watch(&directory, RecursiveMode::NonRecursive)?;
    tracing::info!(input = %input.display(), ?debounce, "watching stylesheet");

    let mut cache = CompileCache::new();
    rebuild(&mut cache, &input, args.output.as_deref(), &options)?;

    for result in rx {
        match result {
            Ok(events) if touches(&events, &input) => {
                if input.exists() {
                    rebuild(&mut cache, &input, args.output.as_deref(), &options)?;
                } else {
                    cache.invalidate(&input);
                    tracing::warn!(input = %input.display(), "stylesheet removed");
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "file watcher error"),
        }
    }

    tracing::error!("file watcher disconnected");
    Ok(())
}

fn touches(events: &[DebouncedEvent], input: &Path) -> bool {
    events
        .iter()
        .any(|event| event.kind == DebouncedEventKind::Any && event.path == input)
}

/// Compile through the cache and write the result. Only output failures
/// are returned.
fn rebuild(
    cache: &mut CompileCache,
    input: &Path,
    output: Option<&Path>,
    options: &CompileOptions,
) -> Result<(), CliError> {
    match cache.load(input, options) {
        Ok(style) => {
            write_output(output, style.bytes())?;
            tracing::info!(input = %input.display(), bytes = style.len(), "rebuilt");
        }
        Err(e) => tracing::error!(input = %input.display(), error = %e, "compile failed"),
    }
    Ok(())
}

fn tokens(input: &Path) -> Result<(), CliError> {
    let source = fs::read_to_string(input).map_err(|source| CliError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let tokens = lex(&source)?;
    tracing::debug!(count = tokens.len(), "lexed");
    let json = serde_json::to_string_pretty(&tokens)?;
    write_output(None, json.as_bytes())
}

fn write_output(output: Option<&Path>, bytes: &[u8]) -> Result<(), CliError> {
    match output {
        Some(path) => fs::write(path, bytes).map_err(|source| CliError::Write {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(bytes)
                .and_then(|()| stdout.write_all(b"\n"))
                .map_err(|source| CliError::Write {
                    path: PathBuf::from("<stdout>"),
                    source,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_args(input: PathBuf) -> CompileArgs {
        CompileArgs {
            input,
            output: None,
            minify: false,
            config: None,
        }
    }

    #[test]
    fn flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("csslike.json");
        fs::write(&config, r#"{ "minify": false }"#).unwrap();

        let mut args = compile_args(dir.path().join("site.css"));
        args.config = Some(config);
        args.minify = true;
        assert!(options(&args).unwrap().minify);
    }

    #[test]
    fn build_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("site.css");
        let output = dir.path().join("site.out.css");
        fs::write(&input, "@var $c red;\na { b { color: $c } }").unwrap();

        let mut args = compile_args(input);
        args.output = Some(output.clone());
        build(&args).unwrap();
        assert_eq!(fs::read_to_string(output).unwrap(), "a {\n}\na b {\n  color: red;\n}");
    }

    #[test]
    fn rebuild_logs_compile_errors_and_keeps_going() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("site.css");
        let output = dir.path().join("site.out.css");
        let options = CompileOptions::default();
        let mut cache = CompileCache::new();

        fs::write(&input, "a { color: $missing }").unwrap();
        rebuild(&mut cache, &input, Some(&output), &options).unwrap();
        assert!(!output.exists());

        fs::write(&input, "a { color: red }").unwrap();
        rebuild(&mut cache, &input, Some(&output), &options).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "a {\n  color: red;\n}");
    }

    #[test]
    fn only_events_for_the_input_trigger_rebuilds() {
        let input = PathBuf::from("/styles/site.css");
        let event = |path: &str| DebouncedEvent {
            path: PathBuf::from(path),
            kind: DebouncedEventKind::Any,
        };

        assert!(touches(&[event("/styles/other.css"), event("/styles/site.css")], &input));
        assert!(!touches(&[event("/styles/other.css")], &input));
        assert!(!touches(&[], &input));
    }

    #[test]
    fn build_reports_compile_errors() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("site.css");
        fs::write(&input, "a { color: $missing }").unwrap();

        let err = build(&compile_args(input)).unwrap_err();
        assert!(matches!(
            err,
            CliError::Compile(CompileError::UndeclaredVariable { .. })
        ));
    }
}
