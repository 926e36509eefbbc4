use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use image::RgbaImage;
use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{LoadTexture, NativeImage, TextureFailure, TextureOutcome};

// Decodes to RGBA8 and applies EXIF orientation when present, so reported
// dimensions match what the viewer sees.
fn decode_rgba8_apply_exif(path: &Path) -> Result<RgbaImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgba8();
    let orientation = read_orientation(path).unwrap_or(1);
    Ok(apply_orientation(img, orientation))
}

fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    match orientation {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    }
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = field.value.get_uint(0)? as u16;
    debug!(orientation = o, path = %path.display(), "exif orientation");
    Some(o)
}

async fn load_one(req: LoadTexture, timeout: Duration) -> TextureOutcome {
    let LoadTexture { request, id, path } = req;
    let decode = tokio::task::spawn_blocking({
        let path = path.clone();
        move || decode_rgba8_apply_exif(&path)
    });
    let result = match tokio::time::timeout(timeout, decode).await {
        Ok(Ok(Ok(rgba8))) => {
            let (width, height) = rgba8.dimensions();
            debug!(%id, width, height, path = %path.display(), "decoded texture");
            Ok(NativeImage {
                width,
                height,
                pixels: rgba8.into_raw(),
            })
        }
        Ok(Ok(Err(err))) => Err(TextureFailure::Decode(format!("{err:#}"))),
        Ok(Err(join)) => Err(TextureFailure::Decode(join.to_string())),
        Err(_) => Err(TextureFailure::TimedOut),
    };
    if let Err(failure) = &result {
        debug!(%id, path = %path.display(), %failure, "texture load failed");
    }
    TextureOutcome {
        request,
        id,
        result,
    }
}

/// Resolves texture requests off the UI task.
///
/// - At most `max_in_flight` decodes run at once; further requests wait in the channel.
/// - Every request yields exactly one `TextureOutcome`, success or failure.
/// - Staleness is not judged here; the session drops outcomes for dead planes.
pub async fn run(
    mut load_rx: Receiver<LoadTexture>,
    to_session: Sender<TextureOutcome>,
    cancel: CancellationToken,
    max_in_flight: usize,
    timeout: Duration,
) -> Result<()> {
    let mut tasks: JoinSet<TextureOutcome> = JoinSet::new();

    loop {
        select! {
            _ = cancel.cancelled() => break,

            Some(req) = load_rx.recv(), if tasks.len() < max_in_flight => {
                tasks.spawn(load_one(req, timeout));
            }

            Some(joined) = tasks.join_next() => match joined {
                Ok(outcome) => {
                    if to_session.send(outcome).await.is_err() {
                        warn!("session channel closed");
                        break;
                    }
                }
                Err(err) => warn!("texture task aborted: {err}"),
            },

            else => break,
        }
    }
    tasks.abort_all();
    info!("loader stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ImageId;
    use crate::events::RequestId;
    use base64::Engine;
    use std::path::PathBuf;
    use tokio::sync::mpsc;

    // JPEG 2x1 with EXIF orientation 6 (rotate 90 CW), base64 encoded
    const ORIENT6_JPEG: &str = concat!(
        "/9j/4AAQSkZJRgABAQAAAQABAAD/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAAAAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/",
        "2wBDAQkJCQwLDBgNDRgyIRwhMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjL/wAARCAABAAIDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwDi6KKK+ZP3E//Z"
    );

    fn request(n: u64, path: PathBuf) -> LoadTexture {
        LoadTexture {
            request: RequestId(n),
            id: ImageId(n),
            path,
        }
    }

    #[test]
    fn orientation_six_swaps_dimensions() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(ORIENT6_JPEG)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orient6.jpg");
        std::fs::write(&path, &bytes).unwrap();
        let img = decode_rgba8_apply_exif(&path).unwrap();
        assert_eq!(img.dimensions(), (1, 2));
    }

    #[tokio::test]
    async fn garbage_file_resolves_as_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let outcome = load_one(request(1, path), Duration::from_secs(5)).await;
        assert_eq!(outcome.request, RequestId(1));
        assert!(matches!(outcome.result, Err(TextureFailure::Decode(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_reports_one_outcome_per_request() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        RgbaImage::new(6, 3).save(&good).unwrap();
        let missing = dir.path().join("missing.png");

        let (load_tx, load_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(load_rx, out_tx, cancel.clone(), 1, Duration::from_secs(5)));

        load_tx.send(request(1, good)).await.unwrap();
        load_tx.send(request(2, missing)).await.unwrap();

        let mut outcomes = Vec::new();
        while outcomes.len() < 2 {
            let o = tokio::time::timeout(Duration::from_secs(5), out_rx.recv())
                .await
                .expect("timeout waiting for outcome")
                .expect("loader channel closed");
            outcomes.push(o);
        }
        outcomes.sort_by_key(|o| o.request);
        let first = outcomes[0].result.as_ref().unwrap();
        assert_eq!((first.width, first.height), (6, 3));
        assert_eq!(first.pixels.len(), 6 * 3 * 4);
        assert!(outcomes[1].result.is_err());

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
