use clap::{Parser, Subcommand};
use ruf::batch::{run_batch, BatchOptions, Outcome};
use ruf::container::Container;
use ruf::header::HEADER_SIZE;
use ruf::registry::ModelRegistry;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ruf", about = "Decrypt and unpack RUF firmware-update containers")]
struct Cli {
    /// JSON file with additional model profiles
    #[arg(long, global = true)]
    profiles: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every partition image of one or more containers
    Extract {
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Write into DIR/<input stem>/ instead of next to each input
        #[arg(short = 'C', long)]
        output_dir: Option<PathBuf>,
        /// Decode and validate only; write nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Write the whole container with its body decrypted
    Decrypt {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show header fields
    Info {
        input: PathBuf,
        /// Print the header as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the subfile table
    List {
        input: PathBuf,
    },
    /// List known device models
    Models,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let registry = load_registry(cli.profiles.as_deref())?;

    match cli.command {

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir, dry_run } => {
            let opts = BatchOptions { output_root: output_dir, dry_run };
            let report = run_batch(&input, &registry, &opts);
            for r in &report.inputs {
                match &r.outcome {
                    Outcome::Extracted { files } => {
                        println!("{} → {}", r.input.display(), r.output_dir.display());
                        for f in files {
                            println!("  wrote  {}", f.display());
                        }
                    }
                    Outcome::Checked { parts } => {
                        println!("{}: ok, {} part(s)", r.input.display(), parts);
                    }
                    Outcome::Failed { error } => {
                        eprintln!("failed: {}: {}", r.input.display(), error);
                    }
                }
            }
            if !report.all_succeeded() {
                std::process::exit(1);
            }
        }

        // ── Decrypt ──────────────────────────────────────────────────────────
        Commands::Decrypt { input, output } => {
            let fw = Container::open(&input, &registry)?;
            fw.write_plaintext(&output)?;
            println!("Decrypted {} body bytes → {}", fw.header().encrypted_size, output.display());
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, json } => {
            let header = parse_header(&input, &registry)?;
            let m = ruf::manifest::Manifest::from_header(&header);
            if json {
                println!("{}", m.to_json()?);
                return Ok(());
            }
            println!("── RUF container ────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  File type      {}", m.file_type);
            println!("  Byte order     {}", m.byte_order);
            println!("  Date           {}", m.firmware_date);
            println!("  Manufacturer   {}", m.manufacturer);
            println!("  Model          {}", m.model);
            println!("  Key            {}", header.profile.key_hex());
            println!("  Body           {:#x}..{:#x} ({} B)",
                     HEADER_SIZE, header.body_range().end, m.encrypted_size);
            println!("  Trailer        {} B", m.trailer_len);
            println!("  Container      {} B", m.container_len);
            println!("  Subfiles       {}", m.subfile_count);
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let header = parse_header(&input, &registry)?;
            println!("{:<4} {:<20} {:>12} {:>10}  Slot", "No.", "Name", "Size", "Checksum");
            for e in &header.subfiles {
                let checksum = e.checksum
                    .map(|c| format!("{c:08x}"))
                    .unwrap_or_else(|| "-".into());
                println!("{:<4} {:<20} {:>12} {:>10}  {}",
                    format!("{:02}", e.ordinal), e.name().unwrap_or("unknown"), e.size, checksum, e.slot);
            }
        }

        // ── Models ───────────────────────────────────────────────────────────
        Commands::Models => {
            for model in registry.models() {
                println!("{model}");
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn load_registry(profiles: Option<&Path>) -> ruf::Result<ModelRegistry> {
    match profiles {
        Some(path) => ModelRegistry::from_json_file(path),
        None       => Ok(ModelRegistry::builtin()),
    }
}

fn parse_header(path: &Path, registry: &ModelRegistry) -> ruf::Result<ruf::ContainerHeader> {
    let mut f = std::fs::File::open(path)?;
    ruf::ContainerHeader::parse(&mut f, registry)
}
