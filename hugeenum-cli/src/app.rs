use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// hugeenum - generate JVM enum class files with tens of thousands of elements
#[derive(Debug, Parser)]
#[command(name = "hugeenum", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate an enum class file.
    #[command(
        after_help = "Example:\n    hugeenum generate -d ./bin -c 2020 com.example.HugeEnum2020"
    )]
    Generate {
        /// Enum class name, may contain a package (e.g., com.example.Huge).
        #[arg(value_name = "ENUM NAME")]
        name: String,

        /// Output directory, must exist. Current working directory by default.
        #[arg(short, long, value_name = "DIRECTORY")]
        dir: Option<PathBuf>,

        /// UTF-8 text file with one element name per line.
        #[arg(short, long, value_name = "ITEM LIST FILE", conflicts_with = "count")]
        elements: Option<PathBuf>,

        /// Number of autogenerated element names. Default depends on the algorithm.
        #[arg(short, long)]
        count: Option<usize>,

        /// Generation algorithm, see `hugeenum list`.
        #[arg(short, long, default_value = "ExtractMethod")]
        algorithm: String,
    },

    /// List supported generation algorithms and their limits.
    List,

    /// Summarize a class file: version, constant pool, fields and methods.
    Inspect {
        /// Path to the .class file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Disassemble method bodies.
        #[arg(long)]
        disasm: bool,

        /// Restrict disassembly to methods with this name.
        #[arg(long, value_name = "NAME", requires = "disasm")]
        method: Option<String>,
    },
}
