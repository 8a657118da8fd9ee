//! `trellis-inspect`: print the cascaded style of one element.
//!
//! ```text
//! trellis-inspect [--config PATH] [--json] [--style DECLS] [--pseudo NAME] <stylesheet.css> <element-path>
//! ```
//!
//! The element path describes the queried element and its ancestors, e.g.
//! `ul/li/ul/li.done#last`. The engine config comes from `--config`, then
//! the `TRELLIS_CONFIG` environment variable, then built-in defaults.

mod path;
mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use trellis_style::{PseudoElement, StyleSheetStore, parse_declarations, resolve, resolve_pseudo};
use trellis_types::EngineConfig;

const USAGE: &str = "usage: trellis-inspect [--config PATH] [--json] [--style DECLS] \
                     [--pseudo NAME] <stylesheet.css> <element-path>";

#[derive(Debug, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    json: bool,
    style: Option<String>,
    pseudo: Option<PseudoElement>,
    stylesheet: PathBuf,
    element_path: String,
}

fn value_for(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("{flag} needs a value\n{USAGE}"))
}

/// Parse command-line arguments (without the program name). `None` means
/// help was requested.
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<Args>> {
    let mut config = None;
    let mut json = false;
    let mut style = None;
    let mut pseudo = None;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--json" => json = true,
            "--config" => config = Some(PathBuf::from(value_for(&mut args, "--config")?)),
            "--style" => style = Some(value_for(&mut args, "--style")?),
            "--pseudo" => {
                let name = value_for(&mut args, "--pseudo")?;
                let parsed = PseudoElement::parse(&name)
                    .with_context(|| format!("unknown pseudo-element {name:?}"))?;
                pseudo = Some(parsed);
            },
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
            _ => positional.push(arg),
        }
    }

    let [stylesheet, element_path] = <[String; 2]>::try_from(positional)
        .map_err(|got| anyhow!("expected 2 arguments, got {}\n{USAGE}", got.len()))?;

    Ok(Some(Args {
        config,
        json,
        style,
        pseudo,
        stylesheet: PathBuf::from(stylesheet),
        element_path,
    }))
}

fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("TRELLIS_CONFIG").map(PathBuf::from));
    match path {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(args) = parse_args(std::env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };

    let config = load_config(args.config.as_deref())?;
    let css = std::fs::read_to_string(&args.stylesheet)
        .with_context(|| format!("failed to read {}", args.stylesheet.display()))?;

    let mut store = StyleSheetStore::with_config(config);
    let added = store.add_stylesheet(&css);
    log::info!("Loaded {added} rules from {}", args.stylesheet.display());

    let (doc, target) = path::build_document(&args.element_path)?;

    let style = match args.pseudo {
        Some(pseudo) => {
            if args.style.is_some() {
                log::warn!("--style is ignored for ::{}", pseudo.name());
            }
            resolve_pseudo(&doc, target, pseudo, &store)
        },
        None => {
            let inline = args
                .style
                .as_deref()
                .map(parse_declarations)
                .unwrap_or_default();
            resolve(&doc, target, &store, &inline)
        },
    };

    if args.json {
        println!("{}", report::render_json(&style)?);
    } else {
        print!("{}", report::render_table(&style));
    }
    Ok(())
}
