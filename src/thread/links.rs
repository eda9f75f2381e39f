use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Address to compose to.
    Mailto(String),
    /// Message id of another message or thread.
    MessageId(String),
    External(String),
    Unknown(String),
}

fn scheme(uri: &str) -> Option<&str> {
    let (scheme, _) = uri.split_once(':')?;
    let valid = !scheme.is_empty()
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

pub fn classify(uri: &str) -> LinkTarget {
    let Some(scheme) = scheme(uri) else {
        return LinkTarget::Unknown(uri.to_string());
    };
    let rest = &uri[scheme.len() + 1..];
    match scheme.to_ascii_lowercase().as_str() {
        "mailto" => {
            let to = urlencoding::decode(rest)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| rest.to_string());
            LinkTarget::Mailto(to.trim().to_string())
        }
        "id" | "mid" => {
            let mid = urlencoding::decode(rest)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| rest.to_string());
            let mid = mid.trim().trim_start_matches('<').trim_end_matches('>');
            LinkTarget::MessageId(mid.to_string())
        }
        "http" | "https" | "ftp" => LinkTarget::External(uri.to_string()),
        _ => LinkTarget::Unknown(uri.to_string()),
    }
}

/// Run `program uri` on a worker thread and log what it prints.
///
/// The result never reaches the view.
pub fn open_external(program: &str, uri: &str) -> Option<JoinHandle<()>> {
    let program = program.to_string();
    let uri = uri.to_string();
    let spawned = std::thread::Builder::new()
        .name("open-link".to_string())
        .spawn(move || run_open(&program, &uri));
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::error!("tv: could not start link worker: {}", e);
            None
        }
    }
}

fn run_open(program: &str, uri: &str) {
    log::info!("tv: opening: {}", uri);
    let child = Command::new(program)
        .arg(uri)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();
    let output = match child.and_then(|c| c.wait_with_output()) {
        Ok(output) => output,
        Err(e) => {
            log::error!("tv: could not run {}: {}", program, e);
            return;
        }
    };
    for line in BufReader::new(output.stdout.as_slice()).lines().map_while(Result::ok) {
        log::debug!("tv: {}: {}", program, line);
    }
    for line in BufReader::new(output.stderr.as_slice()).lines().map_while(Result::ok) {
        log::debug!("tv: {}: {}", program, line);
    }
    if !output.status.success() {
        log::error!("tv: {} exited with {}", program, output.status);
    }
}

/// Pipe `text` into the first clipboard program that accepts it.
pub fn copy_to_clipboard(text: &str) -> bool {
    let candidates: &[(&str, &[&str])] = &[
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
        ("pbcopy", &[]),
    ];
    for (program, args) in candidates {
        let mut child = match Command::new(program)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(_) => continue,
        };
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                log::debug!("tv: {}: {}", program, e);
                let _ = child.wait();
                continue;
            }
        }
        if child.wait().is_ok_and(|s| s.success()) {
            log::info!("tv: copied {} bytes with {}", text.len(), program);
            return true;
        }
    }
    false
}
