//! jex CLI: argument parsing, stdin plumbing, and exit-code mapping.
//!
//! Usage:
//!   cat data.json | jex '.items.map(x => x.name)'
//!   jex --input.limit 10 '.items.slice(0, limit)'
//!   jex --fn.ls 'ls {}' 'ls(".")'
//!   jex --list

pub mod format;

use std::io::Read;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use jex_kernel::{
    kernel, parse_lenient, session_file, FnDescriptor, NodeEngine, RunOptions, Session,
};

use format::{detect_context, format_value};

/// The parsed command line: either one of the standalone modes or a run.
#[derive(Debug, PartialEq)]
pub enum Cli {
    Help,
    Version,
    /// Enumerate the cached values and functions.
    List,
    /// Remove the session file.
    ClearCache,
    /// Hidden bridge mode: the expression engine re-invokes jex with a
    /// function template and JSON-encoded arguments.
    Call { template: String, args: Vec<Value> },
    Run(RunOptions),
}

/// Parse command-line arguments (without the program name).
pub fn parse_args(args: &[String]) -> Result<Cli> {
    let mut opts = RunOptions::default();
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--help" | "-h" => return Ok(Cli::Help),
            "--version" | "-V" => return Ok(Cli::Version),
            "--list" | "-l" => return Ok(Cli::List),
            "--clear-cache" => return Ok(Cli::ClearCache),

            "--call" => {
                let template = args
                    .get(i + 1)
                    .context("--call requires a command template")?
                    .clone();
                let call_args = args[i + 2..]
                    .iter()
                    .map(|a| {
                        serde_json::from_str(a)
                            .with_context(|| format!("--call argument is not JSON: {a}"))
                    })
                    .collect::<Result<Vec<Value>>>()?;
                return Ok(Cli::Call { template, args: call_args });
            }

            "--no-cache" | "-n" => {
                opts.no_cache = true;
                i += 1;
            }

            "--alias" | "-a" => {
                let name = option_value(args, i, "--alias")?;
                opts.alias = Some(identifier(name, "--alias")?);
                i += 2;
            }

            "--save" | "-s" => {
                let name = option_value(args, i, "--save")?;
                opts.save_as = Some(identifier(name, "--save")?);
                i += 2;
            }

            _ if arg.starts_with("--input.") => {
                let name = identifier(&arg["--input.".len()..], "--input")?;
                let text = option_value(args, i, arg)?;
                opts.inputs.push((name, parse_lenient(text)));
                i += 2;
            }

            _ if arg.starts_with("--fn.") => {
                let name = identifier(&arg["--fn.".len()..], "--fn")?;
                let template = option_value(args, i, arg)?;
                opts.fns.push((name, template.to_string()));
                i += 2;
            }

            _ if arg.starts_with('-') && arg.len() > 1 => {
                bail!("unknown option: {arg} (run 'jex --help' for usage)");
            }

            _ => {
                if opts.expression.is_some() {
                    bail!("unexpected extra argument: {arg}");
                }
                opts.expression = Some(arg.to_string());
                i += 1;
            }
        }
    }

    Ok(Cli::Run(opts))
}

fn option_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{flag} requires a value"))
}

/// Names become JavaScript bindings, so they must be plain identifiers.
fn identifier(name: &str, flag: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if !valid {
        bail!("{flag}: `{name}` is not a valid binding name");
    }
    Ok(name.to_string())
}

/// Dispatch the parsed command line.
pub fn run(args: &[String]) -> Result<ExitCode> {
    match parse_args(args)? {
        Cli::Help => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }
        Cli::Version => {
            println!(
                "jex {} ({} {})",
                env!("CARGO_PKG_VERSION"),
                env!("JEX_GIT_HASH"),
                env!("JEX_BUILD_DATE")
            );
            Ok(ExitCode::SUCCESS)
        }
        Cli::List => run_list(),
        Cli::ClearCache => {
            Session::clear(&session_file())?;
            Ok(ExitCode::SUCCESS)
        }
        Cli::Call { template, args } => run_call(&template, &args),
        Cli::Run(opts) => run_expression(opts),
    }
}

/// The bridge mode invoked by the expression engine. Output is a single
/// JSON document on stdout, which the engine parses back.
fn run_call(template: &str, args: &[Value]) -> Result<ExitCode> {
    let descriptor = FnDescriptor::new("call", template);
    let value = descriptor.invoke(args)?;
    println!("{}", serde_json::to_string(&value)?);
    Ok(ExitCode::SUCCESS)
}

/// Enumerate what the session remembers.
fn run_list() -> Result<ExitCode> {
    let session = Session::load(&session_file());
    if session.values.is_empty() && session.fns.is_empty() && session.last_input.is_none() {
        println!("session is empty");
        return Ok(ExitCode::SUCCESS);
    }
    for (name, value) in &session.values {
        println!("value  {name} = {value}");
    }
    for (name, template) in &session.fns {
        println!("fn     {name} = {template}");
    }
    if session.last_input.is_some() {
        println!("in     (remembered input)");
    }
    if session.last_output.is_some() {
        println!("out    (last result)");
    }
    Ok(ExitCode::SUCCESS)
}

/// The main mode: resolve input, run the kernel, format, persist.
fn run_expression(opts: RunOptions) -> Result<ExitCode> {
    let session_path = session_file();
    let mut session = if opts.no_cache {
        Session::default()
    } else {
        Session::load(&session_path)
    };

    let piped = read_stdin()?;
    let mut engine = NodeEngine::new()?;
    let result = kernel::run(&opts, piped.as_deref(), &mut session, &mut engine);

    // Whatever the run accumulated is saved even when evaluation failed,
    // unless caching is off or the expression's exit asked to skip it.
    let skip_save = matches!(
        &result,
        Ok(outcome) if outcome.exit.is_some_and(|e| e.skip_save)
    );
    if !opts.no_cache && !skip_save {
        if let Err(e) = session.save(&session_path) {
            tracing::warn!(error = %e, "could not persist session");
        }
    }

    let outcome = result?;
    print!("{}", outcome.output);
    if !outcome.printed {
        println!("{}", format_value(&outcome.value, detect_context()));
    }

    match outcome.exit {
        Some(exit) => Ok(ExitCode::from(exit.code.clamp(0, 255) as u8)),
        None => Ok(ExitCode::SUCCESS),
    }
}

/// Read all of stdin, unless it is a terminal (no piped input). An
/// interrupted read ends the input: whatever arrived is the whole input.
fn read_stdin() -> Result<Option<String>> {
    use std::io::IsTerminal;

    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match stdin.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => break,
            Err(e) => return Err(e).context("reading stdin"),
        }
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

fn print_help() {
    println!(
        r#"jex v{}: query piped JSON with JavaScript expressions

Usage:
  cat data.json | jex [OPTIONS] [EXPRESSION]

Leading dots refer to the piped input: `.items[0].name` means
`input.items[0].name`. With no expression, jex echoes the (remembered)
input. Inputs and functions are cached between invocations.

Options:
  -a, --alias <NAME>      Extra name for the main input
      --input.<NAME> <V>  Bind a named input (JSON, or raw text)
      --fn.<NAME> <CMD>   Bind a shell command as a function;
                          {{}} and {{0}}, {{1}}, ... are argument slots
  -s, --save <NAME>       Remember the result under NAME
  -n, --no-cache          Neither load nor save the session
  -l, --list              Show cached values and functions
      --clear-cache       Forget the session
  -h, --help              Show this help
  -V, --version           Show version

Examples:
  curl -s api/users | jex '.filter(u => u.active).length'
  jex --fn.ls 'ls {{}}' 'ls(".").split("\n")'
  jex --input.limit 10 '.slice(0, limit)' < data.json
"#,
        env!("CARGO_PKG_VERSION")
    );
}
