//! One-shot sentiment snapshot.
//!
//! Usage: snapshot [--csv] [--format html|xml] [FILE]
//!
//! Classifies a saved calendar page or XML export, or fetches the
//! configured live feed once when no FILE is given.

use chrono::Utc;
use std::env;
use std::fs;

use fxsentiment::config::Config;
use fxsentiment::feed::{FeedFormat, FeedSource, HttpFeed, StaticFeed};
use fxsentiment::logging::{set_console, Console};
use fxsentiment::pipeline::snapshot;
use fxsentiment::render::{render_csv, render_text};

struct Args {
    csv: bool,
    format: Option<FeedFormat>,
    file: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        csv: false,
        format: None,
        file: None,
    };
    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--csv" => args.csv = true,
            "--format" => {
                let value = it.next().ok_or("--format needs a value")?;
                args.format = Some(value.parse()?);
            }
            flag if flag.starts_with("--") => return Err(format!("unknown flag {}", flag)),
            path => args.file = Some(path.to_string()),
        }
    }
    Ok(args)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = match parse_args() {
        Ok(a) => a,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("usage: snapshot [--csv] [--format html|xml] [FILE]");
            std::process::exit(2);
        }
    };
    // stdout carries the rendering
    set_console(Console::Stderr);
    let cfg = Config::from_env();

    let format: FeedFormat;
    let source: Box<dyn FeedSource> = match &args.file {
        Some(path) => {
            let payload = match fs::read_to_string(path) {
                Ok(p) => p,
                Err(err) => {
                    eprintln!("cannot read {}: {}", path, err);
                    std::process::exit(1);
                }
            };
            format = args.format.unwrap_or_else(|| FeedFormat::infer(path));
            Box::new(StaticFeed::new(path.clone(), payload))
        }
        None => {
            format = args.format.unwrap_or(cfg.feed.format);
            match HttpFeed::new(&cfg.feed) {
                Ok(feed) => Box::new(feed),
                Err(err) => {
                    eprintln!("feed client: {}", err);
                    std::process::exit(1);
                }
            }
        }
    };

    let map = match snapshot(source.as_ref(), format).await {
        Ok(m) => m,
        Err(err) => {
            eprintln!("snapshot failed: {}", err);
            std::process::exit(1);
        }
    };

    if args.csv {
        match render_csv(&map) {
            Ok(body) => print!("{}", body),
            Err(err) => {
                eprintln!("csv render failed: {:#}", err);
                std::process::exit(1);
            }
        }
    } else {
        println!("{}", render_text(&map, Utc::now()));
    }
}
