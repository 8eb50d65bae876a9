use anyhow::Result;
use clap::Parser;
use onnx_aircraft::{checkpoint, config::Config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "inspect-checkpoint")]
#[command(about = "List the parameter names stored in a checkpoint file")]
struct Args {
    /// Checkpoint file (PyTorch .pth, safetensors or ONNX)
    #[arg(env = "AIRCRAFT_CHECKPOINT")]
    checkpoint: PathBuf,

    /// Also print dtype and shape for each parameter
    #[arg(long)]
    verbose: bool,

    /// Print the contents as JSON
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    onnx_aircraft::init_tracing(&args.log_level);

    if let Err(e) = run(&args) {
        e.log();
        return Err(e.into());
    }

    Ok(())
}

fn run(args: &Args) -> onnx_aircraft::Result<()> {
    // 只需要单线程会话读取图结构
    let config = Config::new(Some(1))?;
    let contents = checkpoint::inspect(&args.checkpoint, &config.onnx_config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&contents)?);
    } else {
        for line in contents.render_lines(args.verbose) {
            println!("{}", line);
        }
    }

    Ok(())
}
