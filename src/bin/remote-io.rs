use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use fs_remote_io::{
    copy, open_read_binary, open_read_text, open_write_binary, using, Config,
    Context,
};

#[derive(Parser, Debug)]
#[clap(name = "remote-io")]
#[clap(
    about = "Read, write and copy files addressed by URI",
    long_about = None
)]
struct Cli {
    /// JSON configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// Buffer size in bytes, overriding the configured default
    #[clap(long)]
    buffer_size: Option<usize>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a file to stdout
    Cat {
        uri: String,

        /// Copy raw bytes instead of decoding lines as ISO-8859-1
        #[clap(long)]
        binary: bool,
    },

    /// Write stdin to a file, replacing its content
    Put { uri: String },

    /// Copy a file, letting the backend do the transfer when it can
    Cp { src: String, dest: String },

    /// Print the effective configuration as JSON
    Config,
}

fn cat(
    ctx: &Context,
    uri: &str,
    buffer_size: usize,
    binary: bool,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if binary {
        let reader = open_read_binary(ctx, uri, buffer_size)?;
        using(reader, |r| Ok(io::copy(r, &mut out)?))?;
    } else {
        let reader = open_read_text(ctx, uri, buffer_size)?;
        using(reader, |r| {
            for line in r.lines() {
                out.write_all(line?.as_bytes())?;
            }
            Ok(())
        })?;
    }
    out.flush()?;
    Ok(())
}

fn put(ctx: &Context, uri: &str, buffer_size: usize) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let writer = open_write_binary(ctx, uri, buffer_size)?;
    let written = using(writer, |w| {
        let mut total = 0u64;
        loop {
            let chunk = input.fill_buf()?;
            if chunk.is_empty() {
                return Ok(total);
            }
            let n = chunk.len();
            w.write_all(chunk)?;
            input.consume(n);
            total += n as u64;
        }
    })?;
    log::info!("{} bytes written to {}", written, uri);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| {
            format!("Couldn't load configuration from {}", path.display())
        })?,
        None => Config::default(),
    };
    if let Some(buffer_size) = args.buffer_size {
        config.default_buffer_size = buffer_size;
        config.validate()?;
    }
    let ctx = Context::new(config);
    let buffer_size = ctx.buffer_size();

    match &args.command {
        Command::Cat { uri, binary } => cat(&ctx, uri, buffer_size, *binary)
            .with_context(|| format!("Couldn't read {}", uri)),
        Command::Put { uri } => put(&ctx, uri, buffer_size)
            .with_context(|| format!("Couldn't write {}", uri)),
        Command::Cp { src, dest } => copy(&ctx, src, dest)
            .with_context(|| format!("Couldn't copy {} to {}", src, dest)),
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(ctx.config())?);
            Ok(())
        }
    }
}

