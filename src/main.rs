//! remfs interactive client
//!
//! Connects to a `remfsd` server, prints the server's directory after every
//! command and keeps going until `exit` or end of input.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use remfs::cli::{init_tracing, ClientOpts};
use remfs::url::parse_endpoint;
use remfs::{Client, ClientConfig, Reply};

const PROMPT: &str = "Enter the command and argument: ";

fn main() -> Result<()> {
    let opts = ClientOpts::parse();
    init_tracing(opts.log_format, "warn")?;

    let endpoint = parse_endpoint(&opts.remote)
        .with_context(|| format!("invalid server address: {}", opts.remote))?;
    let local_dir = match opts.local_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot read current directory")?,
    };
    let cfg = ClientConfig {
        local_dir,
        buffer_size: opts.buffer_size,
        scan_mode: opts.scan_mode,
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let (mut client, initial) = rt
        .block_on(Client::connect(&endpoint, &cfg))
        .with_context(|| format!("cannot connect to {endpoint}"))?;
    println!(
        "Connected to server at IP: {} and Port: {}",
        endpoint.host, endpoint.port
    );
    println!("Handshake Done. EOF is: {}", client.delimiter());
    println!("Current working directory: {initial}");
    tracing::debug!(local_dir = %client.local_dir().display(), "transfers use local directory");

    let mut editor = DefaultEditor::new().context("cannot start line editor")?;
    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                rt.block_on(client.exit())?;
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.as_str());
        }

        match rt.block_on(client.execute(&line))? {
            Reply::Snapshot(text) => println!("{text}"),
            Reply::Download {
                path,
                bytes,
                saved,
                snapshot,
            } => {
                if let Err(e) = saved {
                    eprintln!("{} cannot write {}: {}", "[X]".red(), path.display(), e);
                } else {
                    tracing::debug!(path = %path.display(), bytes, "downloaded");
                }
                println!("{snapshot}");
            }
            Reply::Rejected(msg) => eprintln!("{} {}", "[!]".yellow(), msg),
            Reply::Closed => break,
        }
    }

    println!("Exiting the application.");
    Ok(())
}
