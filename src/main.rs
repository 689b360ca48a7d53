use anyhow::{Context, bail};
use clap::Parser;
use clap::builder::RangedU64ValueParser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use stackvm::bytecode::disasm::print_code;
use stackvm::bytecode::verify::check_code;
use stackvm::demos::{self, DEMOS};
use stackvm::{Interpreter, Outcome, VmConfig};

/// Upper bound for the capacity flags.
const MAX_CAPACITY: u64 = 1 << 20;

/// Run one of the built-in bytecode demos.
#[derive(Parser, Debug)]
#[command(name = "stackvm", version)]
struct Args {
    /// Demo to run (see --list)
    #[arg(default_value = "add")]
    demo: String,

    /// List the built-in demos and exit
    #[arg(long)]
    list: bool,

    /// Print the disassembly before running
    #[arg(long = "disasm")]
    disasm: bool,

    /// Reject the program if the static check fails
    #[arg(long)]
    verify: bool,

    /// Print the final machine state after the run
    #[arg(long)]
    snapshot: bool,

    #[arg(
        long,
        default_value_t = VmConfig::default().stack_capacity,
        value_parser = RangedU64ValueParser::<usize>::new().range(..=MAX_CAPACITY)
    )]
    stack_capacity: usize,

    #[arg(
        long,
        default_value_t = VmConfig::default().call_stack_capacity,
        value_parser = RangedU64ValueParser::<usize>::new().range(..=MAX_CAPACITY)
    )]
    call_stack_capacity: usize,

    #[arg(
        long,
        default_value_t = VmConfig::default().memory_size,
        value_parser = RangedU64ValueParser::<usize>::new().range(..=MAX_CAPACITY)
    )]
    memory_size: usize,
}

impl Args {
    fn config(&self) -> VmConfig {
        VmConfig {
            stack_capacity: self.stack_capacity,
            call_stack_capacity: self.call_stack_capacity,
            memory_size: self.memory_size,
        }
    }
}

/// Use `RUST_LOG` to override the default `warn` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    if args.list {
        for demo in DEMOS {
            println!("{:<10} {}", demo.name, demo.about);
        }
        return Ok(());
    }

    let Some(demo) = demos::find(&args.demo) else {
        bail!("unknown demo '{}' (try --list)", args.demo);
    };
    let code = (demo.build)().with_context(|| format!("building demo '{}'", demo.name))?;

    if args.disasm {
        print_code(&code);
    }
    if args.verify {
        check_code(&code).context("static check failed")?;
    }

    let config = args.config();
    info!(demo = demo.name, ?config, "running");
    let mut vm = Interpreter::with_config(&code, config);
    let outcome = vm.run();

    if args.snapshot {
        let snap = vm.snapshot();
        println!("{:#?}", snap);
        let bytes = snap.to_bytes().context("encoding snapshot")?;
        println!("snapshot: {} bytes (postcard)", bytes.len());
    }

    match outcome {
        Outcome::Normal => Ok(()),
        Outcome::Fault(fault) => bail!("{} at offset {}: {}", fault.kind(), vm.ip(), fault),
    }
}
