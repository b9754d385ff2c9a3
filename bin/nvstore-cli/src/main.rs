use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::info;
use nvstore_mem::BLANK_BYTE;
use nvstore_store::{
    FileStore, Location, MemoryRegion, RawMemory, Storage, StorageBackend, StoreConfig,
    WriteOutcome, DEFAULT_NAME,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    /// Emulated EEPROM kept in an image file.
    Eeprom,
    /// One file per record under --root.
    File,
}

#[derive(Parser)]
#[command(name = "nvstore", about = "Inspect and edit CRC-protected record stores")]
struct Cli {
    #[arg(long, value_enum, default_value = "eeprom")] backend: BackendArg,
    #[arg(long, default_value = "eeprom.img")] image: PathBuf,
    #[arg(long, default_value_t = 512)] size: usize,
    #[arg(long, default_value = ".")] root: PathBuf,
    #[arg(long, default_value = DEFAULT_NAME)] name: String,
    #[arg(long)] debug: bool,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Store a u32 record.
    Save { location: String, value: u32 },
    /// Load and validate a u32 record.
    Load { location: String },
    /// Factory reset.
    Clear,
    /// Hex view of raw EEPROM cells.
    Dump { addr: usize, len: usize },
}

/// Integers are addresses; anything else is a key.
fn parse_location(raw: &str) -> Location {
    match raw.parse::<u32>() {
        Ok(addr) => Location::Addr(addr),
        Err(_) => Location::from(raw),
    }
}

fn open_image(path: &Path, size: usize) -> anyhow::Result<MemoryRegion> {
    if !path.exists() {
        info!("Creating blank {}-byte image at {}", size, path.display());
        return Ok(MemoryRegion::new(size));
    }
    let image = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if image.len() != size {
        bail!("{} holds {} bytes, expected {}", path.display(), image.len(), size);
    }
    Ok(MemoryRegion::from_image(image))
}

fn hex_dump(bytes: &[u8], base: usize) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let cells: Vec<String> = chunk
            .iter()
            .map(|b| if *b == BLANK_BYTE { "..".to_string() } else { format!("{:02x}", b) })
            .collect();
        out.push_str(&format!("{:06x}  {}\n", base + row * 16, cells.join(" ")));
    }
    out
}

fn execute<B: StorageBackend>(store: &mut Storage<B>, cmd: &Cmd) -> anyhow::Result<String> {
    match cmd {
        Cmd::Save { location, value } => {
            let loc = parse_location(location);
            let outcome = store.save(loc.clone(), value).with_context(|| format!("saving {}", loc))?;
            Ok(match outcome {
                WriteOutcome::Written => format!("{} {} = {}", "SAVED".green(), loc, value),
                WriteOutcome::Skipped => format!("{} {} = {} (unchanged)", "SKIPPED".yellow(), loc, value),
            })
        }
        Cmd::Load { location } => {
            let loc = parse_location(location);
            match store.load::<u32>(loc.clone()) {
                Ok(value) => Ok(format!("{} {} = {}", "VALID".green(), loc, value)),
                Err(e) => Ok(format!("{} {}: {}", "INVALID".red(), loc, e)),
            }
        }
        Cmd::Clear => {
            store.clear()?;
            Ok(format!("{} all records erased", "CLEARED".green()))
        }
        Cmd::Dump { .. } => bail!("dump needs raw cells, not a record store"),
    }
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let config = StoreConfig::new(&cli.name, cli.debug);
    match cli.backend {
        BackendArg::Eeprom => {
            let region = open_image(&cli.image, cli.size)?;
            if let Cmd::Dump { addr, len } = &cli.command {
                let bytes = region.peek(*addr, *len).context("span outside the image")?;
                return Ok(hex_dump(&bytes, *addr));
            }

            let mut store = Storage::new(RawMemory::new(region.clone()));
            store.begin(config)?;
            let before = region.write_ops();
            let report = execute(&mut store, &cli.command)?;

            if region.write_ops() != before || !cli.image.exists() {
                fs::write(&cli.image, region.image())
                    .with_context(|| format!("writing {}", cli.image.display()))?;
            }
            Ok(report)
        }
        BackendArg::File => {
            if matches!(cli.command, Cmd::Dump { .. }) {
                bail!("dump is only available for the eeprom backend");
            }
            let mut store = Storage::new(FileStore::new(&cli.root));
            store.begin(config)?;
            execute(&mut store, &cli.command)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    info!("Backend: {:?} ('{}')", cli.backend, cli.name);
    let report = run(&cli)?;
    println!("{}", report.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(dir: &Path, args: &[&str]) -> Cli {
        let image = dir.join("eeprom.img");
        let mut argv = vec!["nvstore", "--image", image.to_str().unwrap(), "--size", "64"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_location_parsing() {
        assert_eq!(parse_location("12"), Location::Addr(12));
        assert_eq!(parse_location("ssid"), Location::from("ssid"));
        assert_eq!(parse_location("-1"), Location::from("-1"));
    }

    #[test]
    fn test_eeprom_image_persists_between_runs() {
        colored::control::set_override(false);
        let dir = TempDir::new().unwrap();

        let saved = run(&cli(dir.path(), &["save", "0", "42"])).unwrap();
        assert!(saved.starts_with("SAVED"));
        assert_eq!(fs::read(dir.path().join("eeprom.img")).unwrap().len(), 64);

        let again = run(&cli(dir.path(), &["save", "0", "42"])).unwrap();
        assert!(again.starts_with("SKIPPED"));

        let loaded = run(&cli(dir.path(), &["load", "0"])).unwrap();
        assert_eq!(loaded, "VALID addr 0 = 42");

        let dump = run(&cli(dir.path(), &["dump", "0", "16"])).unwrap();
        assert!(dump.starts_with("000000  49 03"));

        run(&cli(dir.path(), &["clear"])).unwrap();
        let gone = run(&cli(dir.path(), &["load", "0"])).unwrap();
        assert!(gone.starts_with("INVALID"));
    }

    #[test]
    fn test_image_size_mismatch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("eeprom.img"), [0xFFu8; 10]).unwrap();
        assert!(run(&cli(dir.path(), &["load", "0"])).is_err());
    }

    #[test]
    fn test_file_backend_rejects_dump() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        let args = ["nvstore", "--backend", "file", "--root", root, "dump", "0", "4"];
        assert!(run(&Cli::parse_from(args)).is_err());
        // A rejected command leaves the root untouched.
        assert!(!dir.path().join(DEFAULT_NAME).exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
