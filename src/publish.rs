use log::{debug, error};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::coordinator::BoardSnapshot;

pub const MESSAGE_FILE: &str = "message.txt";
pub const CODES_FILE: &str = "codes.txt";

/// Directory holding one board's published artifacts.
pub fn board_dir(root: &Path, id: &str) -> PathBuf {
    root.join(id)
}

/// Replace a file in one step so readers never see a partial write.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

/// Write the decoded text, code string and board image of a snapshot.
/// A snapshot with no grid yet writes nothing.
pub fn write_snapshot(dir: &Path, snapshot: &BoardSnapshot) -> io::Result<bool> {
    let (Some(codes), Some(image)) = (snapshot.character_codes(), snapshot.image.as_ref()) else {
        return Ok(false);
    };
    fs::create_dir_all(dir)?;
    write_atomic(&dir.join(MESSAGE_FILE), snapshot.message.as_bytes())?;
    write_atomic(&dir.join(CODES_FILE), codes.as_bytes())?;

    let ext = if image.content_type == "image/png" { "png" } else { "svg" };
    write_atomic(&dir.join(format!("board.{}", ext)), &image.bytes)?;
    Ok(true)
}

/// Write every snapshot change under `dir` until the coordinator goes away.
pub fn spawn_publisher(mut rx: watch::Receiver<BoardSnapshot>, dir: PathBuf) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            match write_snapshot(&dir, &snapshot) {
                Ok(true) => debug!("published {}", dir.display()),
                Ok(false) => {}
                Err(e) => error!("failed to publish {}: {}", dir.display(), e),
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
}
