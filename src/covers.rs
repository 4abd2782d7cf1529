use std::{
    fs,
    path::{Path, PathBuf},
    thread,
};

use eframe::egui::ColorImage;
use futures::channel::oneshot;
use image::RgbaImage;
use thiserror::Error;
use tracing::debug;

use crate::color::{average_color, ThemeSample};

#[derive(Debug, Error)]
pub enum CoverError {
    #[error("failed to read cover {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode cover {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("cover {0} has no pixels")]
    Empty(PathBuf),
    #[error("cover decoder exited without a result")]
    Abandoned,
}

#[derive(Clone)]
pub struct DecodedCover {
    pub image: ColorImage,
    pub sample: ThemeSample,
}

pub fn decode_cover_bytes(bytes: &[u8]) -> Result<RgbaImage, image::ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Reads and decodes a cover, then samples its average colour.
pub fn decode_cover(path: &Path) -> Result<DecodedCover, CoverError> {
    let bytes = fs::read(path).map_err(|source| CoverError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decode_cover_bytes(&bytes).map_err(|source| CoverError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let average = average_color(&image).ok_or_else(|| CoverError::Empty(path.to_path_buf()))?;

    let size = [image.width() as usize, image.height() as usize];
    let pixels = image.into_raw();
    Ok(DecodedCover {
        image: ColorImage::from_rgba_unmultiplied(size, &pixels),
        sample: ThemeSample::from_average(average),
    })
}

type CoverResult = Result<DecodedCover, CoverError>;

/// Completion handle for one cover being decoded off the UI thread.
pub struct CoverRequest {
    index: usize,
    rx: oneshot::Receiver<CoverResult>,
}

impl CoverRequest {
    pub fn channel(index: usize) -> (oneshot::Sender<CoverResult>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { index, rx })
    }

    pub fn spawn(index: usize, path: PathBuf) -> Self {
        let (tx, request) = Self::channel(index);
        thread::spawn(move || {
            let _ = tx.send(decode_cover(&path));
        });
        request
    }
}

/// A resolved cover. `image` is `None` when the fallback sample was used.
pub struct ResolvedCover {
    pub index: usize,
    pub sample: ThemeSample,
    pub image: Option<ColorImage>,
}

/// Polls outstanding cover decodes without blocking.
pub struct CoverLoader {
    pending: Vec<CoverRequest>,
}

impl CoverLoader {
    pub fn spawn<I>(covers: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let pending = covers
            .into_iter()
            .enumerate()
            .map(|(index, path)| CoverRequest::spawn(index, path))
            .collect();
        Self { pending }
    }

    pub fn from_requests(pending: Vec<CoverRequest>) -> Self {
        Self { pending }
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns every cover that finished since the last poll. A failed or
    /// abandoned decode resolves to the fallback sample.
    pub fn poll(&mut self) -> Vec<ResolvedCover> {
        let mut resolved = Vec::new();
        self.pending.retain_mut(|request| {
            let outcome = match request.rx.try_recv() {
                Ok(None) => return true,
                Ok(Some(result)) => result,
                Err(oneshot::Canceled) => Err(CoverError::Abandoned),
            };

            resolved.push(match outcome {
                Ok(cover) => ResolvedCover {
                    index: request.index,
                    sample: cover.sample,
                    image: Some(cover.image),
                },
                Err(err) => {
                    debug!(index = request.index, "using fallback colour: {err}");
                    ResolvedCover {
                        index: request.index,
                        sample: ThemeSample::fallback(),
                        image: None,
                    }
                }
            });
            false
        });
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Rgb, FALLBACK_GRAY};
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(4, 4, Rgba(color));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decode_fails_on_garbage_input() {
        assert!(decode_cover_bytes(&[0u8, 1, 2, 3]).is_err());
    }

    #[test]
    fn decoded_cover_carries_average() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.png");
        fs::write(&path, png_bytes([12, 34, 56, 255])).unwrap();

        let cover = decode_cover(&path).unwrap();
        assert_eq!(cover.sample.average, Rgb::new(12, 34, 56));
        assert_eq!(cover.image.size, [4, 4]);
    }

    #[test]
    fn missing_cover_is_a_read_error() {
        let err = decode_cover(Path::new("does/not/exist.jpg")).err().unwrap();
        assert!(matches!(err, CoverError::Read { .. }));
    }

    #[test]
    fn errors_resolve_to_fallback_gray() {
        let (tx, request) = CoverRequest::channel(3);
        let mut loader = CoverLoader::from_requests(vec![request]);
        assert!(loader.poll().is_empty());

        tx.send(Err(CoverError::Empty(PathBuf::from("x.png"))))
            .ok()
            .unwrap();
        let resolved = loader.poll();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].index, 3);
        assert_eq!(resolved[0].sample.average, FALLBACK_GRAY);
        assert!(resolved[0].image.is_none());
        assert!(loader.is_finished());
    }

    #[test]
    fn dropped_sender_resolves_to_fallback() {
        let (tx, request) = CoverRequest::channel(0);
        let mut loader = CoverLoader::from_requests(vec![request]);
        drop(tx);
        let resolved = loader.poll();
        assert_eq!(resolved[0].sample, ThemeSample::fallback());
    }

    #[test]
    fn spawned_loader_falls_back_for_missing_files() {
        let mut loader = CoverLoader::spawn(vec![PathBuf::from("no/such/cover.jpg")]);
        let mut resolved = Vec::new();
        for _ in 0..200 {
            resolved.extend(loader.poll());
            if loader.is_finished() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].sample.average, FALLBACK_GRAY);
    }
}
