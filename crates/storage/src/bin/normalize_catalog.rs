use std::fmt;
use std::path::PathBuf;

use dex_core::model::CatalogFile;

#[derive(Debug, Clone)]
struct Args {
    file: PathBuf,
    check: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFile,
    UnknownArg(String),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFile => write!(f, "no catalog file given (--file or DOGGYDEX_CATALOG)"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut file = std::env::var("DOGGYDEX_CATALOG").ok().map(PathBuf::from);
        let mut check = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--file" => {
                    file = Some(PathBuf::from(require_value(&mut args, "--file")?));
                }
                "--check" => check = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            file: file.ok_or(ArgsError::MissingFile)?,
            check,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin normalize_catalog -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --file <path>             Breed catalog JSON to normalize in place");
    eprintln!("  --check                   Report only; exit 1 if the file would change");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  DOGGYDEX_CATALOG");
}

fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let raw = std::fs::read_to_string(&args.file)?;
    let mut catalog = CatalogFile::from_json(&raw)?;
    let report = catalog.normalize();
    // Validate the result before touching the file.
    catalog.clone().into_catalog()?;
    let normalized = catalog.to_json_pretty()?;
    let changed = normalized != raw;

    if !args.check && changed {
        std::fs::write(&args.file, &normalized)?;
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    if args.check && changed {
        eprintln!("{} is not normalized", args.file.display());
        std::process::exit(1);
    }
    Ok(changed)
}

fn main() {
    match run() {
        Ok(true) => eprintln!("catalog normalized"),
        Ok(false) => {}
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    }
}
