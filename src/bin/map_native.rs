use anyhow::{Context, Result};
use article_image_set_mapper::mapper::ImageSetMapper;
use article_image_set_mapper::relay::now_timestamp;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

#[derive(Debug, Parser)]
#[command(about = "Map a native CMS envelope to image-sets and print them as JSON.")]
struct Args {
    /// Envelope file; reads stdin when omitted
    input: Option<PathBuf>,

    /// Transaction id recorded as publishReference
    #[arg(long, default_value = "tid_map_native")]
    tid: String,

    /// lastModified to stamp on every image-set (defaults to now)
    #[arg(long)]
    last_modified: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let source = match &args.input {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("failed to read stdin")?;
            buf
        }
    };

    let last_modified = args.last_modified.unwrap_or_else(now_timestamp);
    let image_sets = ImageSetMapper::new().transform(&source, &last_modified, &args.tid)?;
    println!("{}", serde_json::to_string_pretty(&image_sets)?);
    Ok(())
}
