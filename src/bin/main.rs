use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use jclassgen::ast::samples;
use jclassgen::codegen::defs::access_flags;
use jclassgen::codegen::descriptor;
use jclassgen::rt::{self, Interpreter, Value};
use jclassgen::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jclassgen")]
#[command(about = "Typed-AST to JVM class file generator")]
#[command(version)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a built-in sample program
    Demo {
        /// Sample to generate: max, loop or hello
        #[arg(value_name = "NAME")]
        name: String,

        /// Output directory for the .class file
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Print the sample's AST before generating it
        #[arg(long)]
        show_ast: bool,
    },

    /// Print the constant pool and disassembled methods of a .class file
    Dump {
        /// Input .class file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Run a method of a .class file in the reference interpreter
    Run {
        /// Input .class file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Method to run
        #[arg(value_name = "METHOD")]
        method: String,

        /// Integer (or string) arguments, matched against the method descriptor
        #[arg(value_name = "ARGS", allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match &cli.command {
        Commands::Demo { name, output, show_ast } => demo(name, output.as_ref(), *show_ast),
        Commands::Dump { input } => dump(input),
        Commands::Run { input, method, args } => run(input, method, args),
    }
}

fn demo(name: &str, output: Option<&PathBuf>, show_ast: bool) -> Result<()> {
    let program = samples::by_name(name).ok_or_else(|| anyhow!("unknown sample '{}' (expected max, loop or hello)", name))?;
    if show_ast {
        println!("{}", program);
    }
    let default_output = PathBuf::from(".");
    let output_dir = output.unwrap_or(&default_output);
    let path = jclassgen::compile2file(&program, output_dir, &Config::from_env())?;
    println!("{}", path.display());
    Ok(())
}

fn dump(input: &PathBuf) -> Result<()> {
    let class = rt::read_class_file(input).with_context(|| format!("reading {}", input.display()))?;
    print!("{}", rt::disasm(&class));
    Ok(())
}

fn run(input: &PathBuf, method: &str, raw_args: &[String]) -> Result<()> {
    let class = rt::read_class_file(input).with_context(|| format!("reading {}", input.display()))?;
    let info = class.method(method).ok_or_else(|| anyhow!("no method '{}' in {}", method, input.display()))?;
    let desc = class
        .constant_pool
        .utf8(info.descriptor_index)
        .ok_or_else(|| anyhow!("method '{}' has no descriptor", method))?;
    let params = descriptor::split_parameters(desc).ok_or_else(|| anyhow!("malformed descriptor {}", desc))?;

    let mut args = Vec::with_capacity(params.len());
    let mut raw = raw_args.iter();
    for param in &params {
        let value = match *param {
            // the entry point's argument array is not modelled
            "[Ljava/lang/String;" => Value::Null,
            "Ljava/lang/String;" => Value::str(raw.next().map(String::as_str).unwrap_or_default()),
            _ => {
                let text = raw.next().ok_or_else(|| anyhow!("{} expects {} argument(s)", method, params.len()))?;
                let n: i64 = text.parse().with_context(|| format!("'{}' is not an integer", text))?;
                match *param {
                    "J" => Value::Long(n),
                    "I" | "S" | "B" | "C" | "Z" => Value::Int(n as i32),
                    other => bail!("cannot pass an argument of type {}", other),
                }
            }
        };
        args.push(value);
    }

    let mut interpreter = Interpreter::new(&class);
    let this = if info.access_flags & access_flags::ACC_STATIC == 0 {
        let this = interpreter.new_instance();
        interpreter.invoke("<init>", "()V", Some(this.clone()), &[])?;
        Some(this)
    } else {
        None
    };
    let result = interpreter.invoke(method, desc, this, &args)?;
    print!("{}", interpreter.output());
    if let Some(value) = result {
        println!("=> {}", value);
    }
    log::debug!("{} instructions executed", interpreter.steps());
    Ok(())
}
