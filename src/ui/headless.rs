use {
    crate::store::SharedStore,
    std::{io::Write, num::NonZeroUsize},
    tokio::sync::watch,
};

/// Print one JSON snapshot line per observed store revision
///
/// Bursts of ingests coalesce into a single line. Returns the number of lines
/// written once `stream_ended` flips to `true` (after a final snapshot) or
/// either watch sender goes away.
pub async fn run_headless<W: Write>(
    store: SharedStore,
    top_n: NonZeroUsize,
    mut stream_ended: watch::Receiver<bool>,
    mut out: W,
) -> Result<u64, Box<dyn std::error::Error>> {
    let mut changes = store.changes();
    let mut last_emitted = 0u64;
    let mut emitted = 0u64;

    loop {
        let closed = tokio::select! {
            changed = changes.changed() => changed.is_err(),
            ended = stream_ended.changed() => ended.is_err(),
        };
        let finished = closed || *stream_ended.borrow();

        let snapshot = store.snapshot(top_n);
        if snapshot.revision != last_emitted {
            serde_json::to_writer(&mut out, &snapshot)?;
            out.write_all(b"\n")?;
            out.flush()?;
            last_emitted = snapshot.revision;
            emitted += 1;
        }

        if finished {
            break;
        }
    }

    log::info!("Headless output finished ({} snapshots, revision {})", emitted, last_emitted);
    Ok(emitted)
}
