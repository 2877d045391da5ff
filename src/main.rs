// src/main.rs

use bugger::{cli, logging, process, run};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("bugger error: {err:?}");
            1
        }
    };
    std::process::exit(code);
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    if let Err(e) = process::become_subreaper() {
        tracing::warn!(error = %e, "leftover processes will not be adopted");
    }
    Ok(run(args).await?)
}
