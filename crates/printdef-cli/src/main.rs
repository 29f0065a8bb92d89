use std::fs;
use std::process::ExitCode;

use clap::Parser;

use printdef_core::value::json;
use printdef_core::{Diagnostics, Value};

/// Loads an inheriting printer definition, resolves every setting, and
/// writes the fully-evaluated settings bundle as JSON.
#[derive(Parser, Debug)]
#[command(name = "printdef", version, about)]
struct Args {
    /// Printer definition name (resolved against `--search`).
    printer: String,

    /// Directories to search for inherited definitions, in order.
    #[arg(short = 's', long = "search", value_name = "DIR")]
    search: Vec<String>,

    /// Optional JSON file of `{scope: {setting: value}}` hard overrides.
    #[arg(short = 'o', long = "overrides", value_name = "FILE")]
    overrides: Option<String>,

    /// Where to write the resolved bundle; stdout if omitted.
    #[arg(short = 'w', long = "out", value_name = "FILE")]
    out: Option<String>,

    /// Pretty-print the JSON output.
    #[arg(short, long)]
    pretty: bool,
}

fn read_overrides(path: &str) -> Result<Value, String> {
    let text = fs::read_to_string(path).map_err(|err| format!("{path}: {err}"))?;
    let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|err| format!("{path}: {err}"))?;
    Ok(json::from_serde(parsed))
}

fn report_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        eprintln!("warning: {diagnostic}");
    }
}

fn run(args: Args) -> Result<(), String> {
    let mut diagnostics = Diagnostics::new();

    let printer = printdef_core::load(&args.printer, &args.search, &mut diagnostics).map_err(|err| err.to_string())?;
    report_diagnostics(&diagnostics);

    let overrides = match &args.overrides {
        Some(path) => read_overrides(path)?,
        None => printdef_core::blank(&printer),
    };

    let mut eval_diagnostics = Diagnostics::new();
    let resolved = printdef_core::eval_all(&printer, &overrides, &mut eval_diagnostics).map_err(|err| err.to_string())?;
    report_diagnostics(&eval_diagnostics);

    let rendered = json::to_string(&resolved, args.pretty);
    match &args.out {
        Some(path) => fs::write(path, rendered).map_err(|err| format!("{path}: {err}"))?,
        None => println!("{rendered}"),
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
