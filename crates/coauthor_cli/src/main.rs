//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `coauthor_core` linkage.
//! - Optionally replay a recorded agent response through the full
//!   decode → reconcile → persist path.
//!
//! Usage: `coauthor_cli [response.json]`. Set `COAUTHOR_LOG_DIR` to an
//! absolute path to enable file logging.

use coauthor_core::db::open_db_in_memory;
use coauthor_core::{CoauthorSession, CoreConfig, FrameDecoder, SqliteSnapshotStore};
use log::info;
use std::error::Error;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

const REPLAY_CHUNK_BYTES: usize = 48;

fn main() -> ExitCode {
    println!("coauthor_core ping={}", coauthor_core::ping());
    println!("coauthor_core version={}", coauthor_core::core_version());

    if let Ok(log_dir) = std::env::var("COAUTHOR_LOG_DIR") {
        if let Err(err) = coauthor_core::init_logging(coauthor_core::default_log_level(), &log_dir)
        {
            eprintln!("logging disabled: {err}");
        }
    }

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    match replay(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("replay failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn replay(path: &str) -> Result<(), Box<dyn Error>> {
    let raw = std::fs::read(path)?;
    info!(
        "event=cli_replay module=cli status=start bytes={}",
        raw.len()
    );

    let mut decoder = FrameDecoder::new();
    for (index, chunk) in raw.chunks(REPLAY_CHUNK_BYTES).enumerate() {
        let frame = decoder.push_bytes(chunk);
        println!(
            "chunk={} text_chars={} instructions={} preview={}",
            index,
            frame.text.chars().count(),
            frame.instructions.len(),
            frame.has_preview()
        );
    }
    let response = decoder.finish()?;

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64);
    let mut session = CoauthorSession::new("cli-replay", CoreConfig::default());
    let outcome = session.apply_response(response, now_ms);
    println!(
        "reconcile changed={} sections={} mode={}",
        outcome.changed,
        outcome.sections.len(),
        outcome.mode.as_str()
    );
    for section in session.sections() {
        println!(
            "section id={} title={:?} chars={}",
            section.id,
            section.title,
            section.content.chars().count()
        );
    }

    let conn = open_db_in_memory()?;
    let mut store = SqliteSnapshotStore::new(&conn);
    let persisted = session.persist(&mut store);
    println!(
        "persist persisted={} profile={} bytes={}",
        persisted.persisted,
        persisted.profile.as_str(),
        persisted.bytes_written
    );
    Ok(())
}
