// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

/// fixdecoder command-line entry point and CLI orchestration.
///
/// The binary ties together the schema-driven FIX codec in `src/decoder`
/// with three user-facing operations: dumping an expanded schema as XML
/// (`spec`), assembling a wire message from field values (`generate`),
/// and scanning a byte stream for embedded FIX messages and tracing each
/// one against the schema (`trace`). This file is intentionally light on
/// protocol logic; it wires user input into `decoder` and `fix`.
mod decoder;
mod fix;

use anyhow::{Context, Result, anyhow};
use atty::Stream;
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use decoder::{
    MessageGenerator, SchemaLoader, SpecCatalog, SpecExpander, disable_colours, render_expanded_spec,
    render_generated, render_message_trace, scan, trailer_tag_set,
};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::sync::{Arc, OnceLock};

/// Build-time version information, baked in by CI where available.
const VERSION: &str = match option_env!("FIXDECODER_VERSION") {
    Some(tag) => tag,
    None => env!("CARGO_PKG_VERSION"),
};

fn branch() -> &'static str {
    option_env!("FIXDECODER_BRANCH").unwrap_or("main")
}

fn sha() -> &'static str {
    option_env!("FIXDECODER_COMMIT").unwrap_or("0000000")
}

fn rust_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

fn version_string() -> String {
    format!(
        "fixdecoder {VERSION} (branch:{}, commit:{}) [rust:{}]",
        branch(),
        sha(),
        rust_version()
    )
}

fn version_str() -> &'static str {
    static VERSION_STR: OnceLock<String> = OnceLock::new();
    VERSION_STR.get_or_init(version_string).as_str()
}

fn main() {
    std::process::exit(match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    });
}

fn run() -> Result<i32> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();

    println!("{}", version_string());

    let args = normalize_args(std::env::args().collect());
    let matches = match build_cli().try_get_matches_from(args) {
        Ok(m) => m,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                return Ok(0);
            }
            _ => err.exit(),
        },
    };

    match matches.subcommand() {
        Some(("spec", sub)) => handle_spec(sub).map(|()| 0),
        Some(("generate", sub)) => handle_generate(sub).map(|()| 0),
        Some(("trace", sub)) => handle_trace(sub),
        _ => unreachable!("normalize_args always inserts a subcommand"),
    }
}

/// Insert the implicit `trace` subcommand when the user invoked the
/// binary without naming one, matching `fixtr`'s behaviour of reading
/// stdin directly. A leading `-h`/`--help`/`-V`/`--version` is left
/// alone so clap's own handling still fires.
fn normalize_args(args: Vec<String>) -> Vec<String> {
    const SUBCOMMANDS: [&str; 4] = ["spec", "generate", "trace", "help"];
    const GLOBAL_FLAGS: [&str; 4] = ["-h", "--help", "-V", "--version"];

    if args.len() < 2 {
        let mut out = args;
        out.push("trace".to_string());
        return out;
    }

    let first = args[1].as_str();
    if GLOBAL_FLAGS.contains(&first) || SUBCOMMANDS.contains(&first) {
        return args;
    }

    let mut out = Vec::with_capacity(args.len() + 1);
    out.push(args[0].clone());
    out.push("trace".to_string());
    out.extend(args.into_iter().skip(1));
    out
}

fn build_cli() -> Command {
    Command::new("fixdecoder")
        .about("Schema-driven FIX protocol codec, generator and validator")
        .version(version_str())
        .subcommand_required(true)
        .subcommand(
            Command::new("spec")
                .about("Print the expanded schema for a message type, header or trailer as XML")
                .arg(
                    Arg::new("target")
                        .required(true)
                        .value_name("MSGTYPE|header|trailer")
                        .help("Message type code, or 'header'/'trailer'"),
                )
                .arg(dir_arg())
                .arg(fix_version_arg())
                .arg(
                    Arg::new("enums")
                        .long("enums")
                        .short('E')
                        .action(ArgAction::SetTrue)
                        .help("Inline enum value descriptions"),
                ),
        )
        .subcommand(
            Command::new("generate")
                .about("Assemble a well-formed FIX message from field values")
                .arg(Arg::new("msgtype").required(true).value_name("MSGTYPE"))
                .arg(dir_arg())
                .arg(fix_version_arg())
                .arg(
                    Arg::new("field")
                        .long("field")
                        .value_name("NAME=VALUE")
                        .action(ArgAction::Append)
                        .help("A field name=value pair (repeatable)"),
                )
                .arg(
                    Arg::new("sender")
                        .long("sender")
                        .required(true)
                        .value_name("ID")
                        .help("SenderCompID"),
                )
                .arg(
                    Arg::new("target")
                        .long("target")
                        .required(true)
                        .value_name("ID")
                        .help("TargetCompID"),
                ),
        )
        .subcommand(
            Command::new("trace")
                .about("Scan stdin or files for embedded FIX messages and trace each one")
                .arg(dir_arg())
                .arg(fix_version_arg())
                .arg(
                    Arg::new("secret")
                        .long("secret")
                        .action(ArgAction::SetTrue)
                        .help("Obfuscate sensitive FIX tag values (Password, Account, ...)"),
                )
                .arg(
                    Arg::new("colour")
                        .long("colour")
                        .value_name("yes|no")
                        .help("Force coloured output on or off"),
                )
                .arg(
                    Arg::new("files")
                        .value_name("FILE")
                        .num_args(0..)
                        .action(ArgAction::Append)
                        .help("Files to scan (default: stdin)"),
                ),
        )
}

fn dir_arg() -> Arg {
    Arg::new("dir")
        .long("dir")
        .required(true)
        .value_name("DIR")
        .help("Directory holding FIX<version>.xml schema files")
}

fn fix_version_arg() -> Arg {
    Arg::new("fix")
        .long("fix")
        .value_name("VER")
        .default_value("44")
        .help("FIX schema version, e.g. 44 or T11")
}

/// Load and index the schema for `<dir>/FIX<version>.xml`.
fn load_catalog(dir: &str, version: &str) -> Result<SpecCatalog> {
    let path = format!("{dir}/FIX{version}.xml");
    let xml = fs::read_to_string(&path).with_context(|| format!("failed to read FIX schema file {path}"))?;
    let root = SchemaLoader::load_str(&xml).with_context(|| format!("failed to parse FIX schema file {path}"))?;
    SpecCatalog::build(root).with_context(|| format!("failed to index FIX schema file {path}"))
}

fn handle_spec(matches: &ArgMatches) -> Result<()> {
    let dir = matches.get_one::<String>("dir").expect("required");
    let version = matches.get_one::<String>("fix").expect("has default");
    let target = matches.get_one::<String>("target").expect("required");
    let enums = matches.get_flag("enums");

    let catalog = load_catalog(dir, version)?;
    let mut scope = match target.as_str() {
        "header" => SpecExpander::expand_scope(&catalog.header, &catalog)?,
        "trailer" => SpecExpander::expand_scope(&catalog.trailer, &catalog)?,
        other => {
            let message = catalog
                .messages
                .get(other)
                .ok_or_else(|| anyhow!("unknown message type: {other}"))?;
            SpecExpander::expand_scope(message, &catalog)?
        }
    };
    if enums {
        SpecExpander::inline_enums(&mut scope, &catalog);
    }
    print!("{}", render_expanded_spec(&scope));
    Ok(())
}

fn handle_generate(matches: &ArgMatches) -> Result<()> {
    let dir = matches.get_one::<String>("dir").expect("required");
    let version = matches.get_one::<String>("fix").expect("has default");
    let msgtype = matches.get_one::<String>("msgtype").expect("required");
    let sender = matches.get_one::<String>("sender").expect("required");
    let target = matches.get_one::<String>("target").expect("required");

    let mut fields = HashMap::new();
    if let Some(values) = matches.get_many::<String>("field") {
        for raw in values {
            let (name, value) = raw
                .split_once('=')
                .ok_or_else(|| anyhow!("--field must be NAME=VALUE, got {raw:?}"))?;
            fields.insert(name.to_string(), value.to_string());
        }
    }

    let catalog = Arc::new(load_catalog(dir, version)?);
    let mut generator = MessageGenerator::new(catalog);
    let message = generator.generate(msgtype, &fields, sender, target)?;
    println!("{}", render_generated(&message));
    Ok(())
}

fn handle_trace(matches: &ArgMatches) -> Result<i32> {
    let dir = matches.get_one::<String>("dir").expect("required");
    let version = matches.get_one::<String>("fix").expect("has default");
    let secret = matches.get_flag("secret");
    let colour_override = matches.get_one::<String>("colour");

    let catalog = load_catalog(dir, version)?;
    let trailer_tags = trailer_tag_set(&catalog)?;
    let obfuscator = fix::create_obfuscator(secret);

    let colour_enabled = match colour_override.map(String::as_str) {
        Some("yes") => true,
        Some("no") => false,
        _ => atty::is(Stream::Stdout),
    };
    if !colour_enabled {
        disable_colours();
    }

    let files: Vec<String> = matches
        .get_many::<String>("files")
        .map(|vals| vals.map(|v| v.to_string()).collect())
        .unwrap_or_default();
    let inputs = if files.is_empty() { vec!["-".to_string()] } else { files };

    for path in &inputs {
        obfuscator.reset();
        let bytes = if path == "-" {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            buf
        } else {
            fs::read(path).with_context(|| format!("failed to read {path}"))?
        };

        let traces = scan(&bytes, &catalog, &trailer_tags);
        for trace in &traces {
            print!("{}", render_message_trace(trace, &obfuscator, colour_enabled));
        }
    }

    Ok(0)
}
