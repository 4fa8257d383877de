use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use sociogram::config::EngineConfig;
use sociogram::engine::Sociogram;
use sociogram::graph::Roster;
use sociogram::render::render_svg;
use sociogram::serve::{ServeArgs, run_serve};

#[derive(Debug, Parser)]
#[command(
    name = "sociogram",
    about = "Render classroom relationship graphs and keep hand-tuned layouts."
)]
struct RenderArgs {
    /// Path to the input roster JSON. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Path to the output SVG. Use '-' to write to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Background color for the rendered graph.
    #[arg(short = 'b', long = "background-color", default_value = "white")]
    background_color: String,

    /// Logical viewport width.
    #[arg(long, default_value_t = 960.0)]
    width: f32,

    /// Logical viewport height.
    #[arg(long, default_value_t = 600.0)]
    height: f32,

    /// Launch the interactive sync server instead of rendering once.
    #[arg(
        long = "serve",
        action = ArgAction::SetTrue,
        conflicts_with = "output",
        requires = "input"
    )]
    serve: bool,

    /// Override the host binding when using --serve.
    #[arg(long = "serve-host", requires = "serve")]
    serve_host: Option<String>,

    /// Override the port binding when using --serve.
    #[arg(long = "serve-port", requires = "serve")]
    serve_port: Option<u16>,

    /// Sqlite database for persisted coordinates when using --serve.
    #[arg(long = "db", requires = "serve")]
    db: Option<PathBuf>,

    /// Static frontend directory to serve alongside the API.
    #[arg(long = "ui", requires = "serve")]
    ui: Option<PathBuf>,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = RenderArgs::parse();

    if args.serve {
        let Some(input) = args.input.as_deref() else {
            bail!("--serve requires an input roster");
        };
        let serve_args = ServeArgs {
            input: PathBuf::from(input),
            db: args
                .db
                .clone()
                .unwrap_or_else(|| PathBuf::from("sociogram.db")),
            host: args
                .serve_host
                .clone()
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: args.serve_port.unwrap_or(5252),
            background_color: args.background_color.clone(),
            width: args.width,
            height: args.height,
        };
        return run_serve(serve_args, args.ui.clone()).await;
    }

    render_once(&args)
}

fn render_once(args: &RenderArgs) -> Result<()> {
    let source = match args.input.as_deref() {
        None | Some("-") => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read roster from stdin")?;
            buffer
        }
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read '{path}'"))?
        }
    };

    let roster = Roster::from_json(&source).context("failed to parse the input roster")?;

    let mut engine = Sociogram::new(EngineConfig::default(), args.width, args.height);
    engine.refresh(&roster.nodes, &roster.edges);
    engine.tick(16.0);
    engine.fit_now();

    let svg = render_svg(&engine.frame(), &args.background_color)?;

    match args.output.as_deref() {
        None | Some("-") => {
            io::stdout()
                .write_all(svg.as_bytes())
                .context("failed to write SVG to stdout")?;
        }
        Some(path) => {
            fs::write(path, svg.as_bytes())
                .with_context(|| format!("failed to write '{path}'"))?;
            if !args.quiet {
                println!("Wrote graph to {path}");
            }
        }
    }

    Ok(())
}
