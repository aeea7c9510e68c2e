use clap::Parser as ClapParser;
use std::{
    fs,
    io::{self, Write},
    process,
};

use heap::MemorySettings;
use vm::{Vm, VmCreateInfo, VmError};

const DEMO: &str = include_str!("../demos/demo.claus");

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Assembly source to run
    #[arg(help = "The .claus file to run; runs the built-in demo if omitted")]
    file: Option<String>,

    #[arg(long, default_value_t = MemorySettings::default().heap_size, help = "Heap size in bytes, split into two semi-spaces")]
    heap_size: usize,

    #[arg(long, default_value_t = MemorySettings::default().stack_size, help = "Stack size in bytes")]
    stack_size: usize,

    #[arg(long, default_value_t = MemorySettings::default().code_size, help = "Code arena size in bytes")]
    code_size: usize,

    #[arg(long, default_value_t = 8, help = "Locals reserved in the entry frame")]
    locals: u32,

    #[arg(long, help = "Print a disassembly of the program instead of running it")]
    dump_code: bool,

    #[arg(long, help = "Hex dump the active semi-space after the run")]
    dump_heap: bool,

    #[arg(short, long, help = "Log allocations and collections")]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let source = match &cli.file {
        Some(filename) => match fs::read_to_string(filename) {
            Ok(content) => content,
            Err(err) => {
                eprintln!("Error reading file '{}': {}", filename, err);
                process::exit(1);
            }
        },
        None => DEMO.to_string(),
    };

    if let Err(err) = execute(&cli, &source) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn execute(cli: &Cli, source: &str) -> Result<(), VmError> {
    let mut vm = Vm::new(VmCreateInfo {
        memory: MemorySettings {
            heap_size: cli.heap_size,
            stack_size: cli.stack_size,
            code_size: cli.code_size,
        },
        ..VmCreateInfo::default()
    })?;
    let entry = vm.assemble(source)?;

    if cli.dump_code {
        let base = entry.address() as usize;
        let listing = bytecode::disassemble(&vm.mm.code()[base..], base)?;
        let mut out = io::stdout().lock();
        out.write_all(listing.as_bytes())?;
        return Ok(());
    }

    let result = vm.run(entry, cli.locals);
    vm.output.flush()?;

    let stats = vm.mm.gc_stats();
    log::info!(
        "{} collections, {} bytes reclaimed, {} bytes live, {} bytes free",
        stats.cycles,
        stats.total_reclaimed_bytes,
        vm.mm.heap_used(),
        vm.mm.heap_free()
    );

    if cli.dump_heap {
        vm.mm.dump(&mut io::stdout().lock())?;
    }
    result
}
