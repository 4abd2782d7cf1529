use std::path::PathBuf;

use thiserror::Error;

/// Playback handle for one track's audio.
pub trait MediaClock {
    /// True once enough data is loaded to start playing.
    fn is_ready(&self) -> bool;
    fn is_paused(&self) -> bool;
    /// Total length reported by the decoder, if known.
    fn duration(&self) -> Option<f64>;
    fn current_time(&self) -> f64;
    fn has_ended(&self) -> bool;
    fn seek(&mut self, seconds: f64) -> Result<(), MediaError>;
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self);
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("audio output unavailable: {0}")]
    Output(String),
    #[error("seek failed: {0}")]
    Seek(String),
    #[error("audio support is not compiled in")]
    Unsupported,
}

pub enum MediaEvent {
    Loaded {
        index: usize,
        media: Box<dyn MediaClock>,
    },
    Failed {
        index: usize,
        path: PathBuf,
        error: MediaError,
    },
}

impl std::fmt::Debug for MediaEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaEvent::Loaded { index, media } => f
                .debug_struct("Loaded")
                .field("index", index)
                .field("duration", &media.duration())
                .finish(),
            MediaEvent::Failed { index, path, error } => f
                .debug_struct("Failed")
                .field("index", index)
                .field("path", path)
                .field("error", error)
                .finish(),
        }
    }
}

pub use backend::MediaLoader;

#[cfg(feature = "audio")]
mod backend {
    use std::{
        fs::File,
        io::BufReader,
        path::{Path, PathBuf},
        sync::mpsc::{self, Receiver, TryRecvError},
        thread,
        time::Duration,
    };

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
    use tracing::{debug, warn};

    use super::{MediaClock, MediaError, MediaEvent};

    type AudioSource = Decoder<BufReader<File>>;

    fn open_source(path: &Path) -> Result<AudioSource, MediaError> {
        let file = File::open(path).map_err(|source| MediaError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Decoder::new(BufReader::new(file)).map_err(|err| MediaError::Decode {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    struct DecodeMessage {
        index: usize,
        path: PathBuf,
        result: Result<AudioSource, MediaError>,
    }

    /// Decodes every track on worker threads and hands ready sinks back
    /// to the UI thread.
    pub struct MediaLoader {
        _stream: Option<OutputStream>,
        handle: Option<OutputStreamHandle>,
        rx: Option<Receiver<DecodeMessage>>,
        startup_error: Vec<MediaEvent>,
    }

    impl MediaLoader {
        pub fn start(paths: Vec<PathBuf>) -> Self {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(err) => {
                    warn!("No audio output device, using simulated progress: {err}");
                    let startup_error = paths
                        .into_iter()
                        .enumerate()
                        .map(|(index, path)| MediaEvent::Failed {
                            index,
                            path,
                            error: MediaError::Output(err.to_string()),
                        })
                        .collect();
                    return Self {
                        _stream: None,
                        handle: None,
                        rx: None,
                        startup_error,
                    };
                }
            };

            let (tx, rx) = mpsc::channel();
            for (index, path) in paths.into_iter().enumerate() {
                let tx = tx.clone();
                thread::spawn(move || {
                    let result = open_source(&path);
                    let _ = tx.send(DecodeMessage {
                        index,
                        path,
                        result,
                    });
                });
            }

            Self {
                _stream: Some(stream),
                handle: Some(handle),
                rx: Some(rx),
                startup_error: Vec::new(),
            }
        }

        pub fn poll(&mut self) -> Vec<MediaEvent> {
            let mut events = std::mem::take(&mut self.startup_error);
            let mut disconnected = false;

            if let Some(rx) = self.rx.as_ref() {
                loop {
                    match rx.try_recv() {
                        Ok(message) => events.push(self.attach(message)),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            disconnected = true;
                            break;
                        }
                    }
                }
            }

            if disconnected {
                self.rx = None;
            }
            events
        }

        pub fn is_finished(&self) -> bool {
            self.rx.is_none() && self.startup_error.is_empty()
        }

        fn attach(&self, message: DecodeMessage) -> MediaEvent {
            let DecodeMessage {
                index,
                path,
                result,
            } = message;

            let source = match result {
                Ok(source) => source,
                Err(error) => return MediaEvent::Failed { index, path, error },
            };

            let Some(handle) = self.handle.as_ref() else {
                return MediaEvent::Failed {
                    index,
                    path,
                    error: MediaError::Output("stream closed".into()),
                };
            };

            match Sink::try_new(handle) {
                Ok(sink) => {
                    let duration = source.total_duration().map(|d| d.as_secs_f64());
                    sink.pause();
                    sink.append(source);
                    debug!(index, ?duration, "audio track ready");
                    MediaEvent::Loaded {
                        index,
                        media: Box::new(AudioTrack {
                            sink,
                            path,
                            duration,
                            started: false,
                        }),
                    }
                }
                Err(err) => MediaEvent::Failed {
                    index,
                    path,
                    error: MediaError::Output(err.to_string()),
                },
            }
        }
    }

    struct AudioTrack {
        sink: Sink,
        path: PathBuf,
        duration: Option<f64>,
        started: bool,
    }

    impl AudioTrack {
        /// A sink drops its source once drained; decode it again so the
        /// track can be replayed.
        fn refill(&mut self) -> Result<(), MediaError> {
            if self.sink.empty() {
                let source = open_source(&self.path)?;
                self.sink.append(source);
                self.started = false;
            }
            Ok(())
        }
    }

    impl MediaClock for AudioTrack {
        fn is_ready(&self) -> bool {
            true
        }

        fn is_paused(&self) -> bool {
            self.sink.is_paused() || self.sink.empty()
        }

        fn duration(&self) -> Option<f64> {
            self.duration
        }

        fn current_time(&self) -> f64 {
            self.sink.get_pos().as_secs_f64()
        }

        fn has_ended(&self) -> bool {
            self.started && self.sink.empty()
        }

        fn seek(&mut self, seconds: f64) -> Result<(), MediaError> {
            self.refill()?;
            self.sink
                .try_seek(Duration::from_secs_f64(seconds.max(0.0)))
                .map_err(|err| MediaError::Seek(err.to_string()))
        }

        fn play(&mut self) -> Result<(), MediaError> {
            self.refill()?;
            self.sink.play();
            self.started = true;
            Ok(())
        }

        fn pause(&mut self) {
            self.sink.pause();
        }
    }
}

#[cfg(not(feature = "audio"))]
mod backend {
    use std::path::PathBuf;

    use super::{MediaError, MediaEvent};

    /// Without an audio backend every track reports a failed load once,
    /// which leaves playback on simulated progress.
    pub struct MediaLoader {
        pending: Vec<MediaEvent>,
    }

    impl MediaLoader {
        pub fn start(paths: Vec<PathBuf>) -> Self {
            let pending = paths
                .into_iter()
                .enumerate()
                .map(|(index, path)| MediaEvent::Failed {
                    index,
                    path,
                    error: MediaError::Unsupported,
                })
                .collect();
            Self { pending }
        }

        pub fn poll(&mut self) -> Vec<MediaEvent> {
            std::mem::take(&mut self.pending)
        }

        pub fn is_finished(&self) -> bool {
            self.pending.is_empty()
        }
    }
}


#[cfg(all(test, not(feature = "audio")))]
mod tests {
    use super::*;

    #[test]
    fn loader_without_backend_reports_each_track_once() {
        let mut loader = MediaLoader::start(vec![
            PathBuf::from("songs/song1.mp3"),
            PathBuf::from("songs/song2.mp3"),
        ]);
        let events = loader.poll();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            MediaEvent::Failed {
                index: 1,
                error: MediaError::Unsupported,
                ..
            }
        ));
        assert!(loader.poll().is_empty());
        assert!(loader.is_finished());
    }
}
