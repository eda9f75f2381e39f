//! Print the documents a thread view would render, as JSON.

use anyhow::Result;
use std::path::PathBuf;

use threadview::config::Config;
use threadview::mail::client;
use threadview::mail::crypto::Unverified;
use threadview::render::document::{CodeFilter, MessageDocument};
use threadview::render::mime_tree::PlainText;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if args.is_empty() {
        eprintln!("usage: dump_thread <message file or maildir>...");
        std::process::exit(2);
    }

    let config = Config::load();
    let code_tags = config.thread_view.code_tags()?;

    let paths = client::collect_paths(&args);
    let messages = client::load_thread(&paths, &Unverified);

    let docs: Vec<MessageDocument> = messages
        .iter()
        .map(|m| match &code_tags {
            Some(tags) => MessageDocument::build(
                m,
                &CodeFilter {
                    tags,
                    inner: &PlainText,
                },
            ),
            None => MessageDocument::build(m, &PlainText),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&docs)?);
    Ok(())
}
