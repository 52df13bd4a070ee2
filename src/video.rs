//! Video reading and writing on background worker threads.
//!
//! Long-running decode and encode work stays off the caller's thread: a
//! request channel drives the reader, results come back over a bounded frame
//! channel, and cancellation is cooperative via a shared stop flag checked
//! once per frame. Seeks decode every intervening frame before the target is
//! delivered, since most codecs require sequential decode to an index.

use crate::constants::{DEFAULT_FPS, READER_CHANNEL_CAPACITY};
use crate::{Error, Result};
use opencv::core::{Mat, Size};
use opencv::imgproc;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, VideoWriter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// One decoded frame with its index
pub struct VideoFrame {
    /// 0-based frame index
    pub index: usize,
    /// BGR frame image
    pub image: Mat,
}

enum Request {
    Next,
    Seek(usize),
}

/// Worker-thread video reader
pub struct VideoReader {
    requests: Option<Sender<Request>>,
    frames: Receiver<Result<Option<VideoFrame>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    frame_count: usize,
    frame_size: (i32, i32),
    fps: f64,
}

impl VideoReader {
    /// Open a video file and start the reader thread
    ///
    /// # Errors
    ///
    /// Returns a `Video` error when the file cannot be opened.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path
            .as_ref()
            .to_str()
            .ok_or_else(|| Error::Video("non-UTF-8 video path".to_string()))?
            .to_string();
        let mut capture = VideoCapture::from_file(&path_str, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::Video(format!("cannot open video {path_str}")));
        }
        let frame_count = capture.get(videoio::CAP_PROP_FRAME_COUNT)?.max(0.0) as usize;
        let frame_size = (
            capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32,
            capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32,
        );
        let mut fps = capture.get(videoio::CAP_PROP_FPS)?;
        if fps <= 0.0 {
            fps = DEFAULT_FPS;
        }

        let (request_tx, request_rx) = std::sync::mpsc::channel::<Request>();
        let (frame_tx, frame_rx) = sync_channel::<Result<Option<VideoFrame>>>(READER_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            reader_loop(&mut capture, &request_rx, &frame_tx, &worker_stop);
        });

        Ok(Self {
            requests: Some(request_tx),
            frames: frame_rx,
            stop,
            handle: Some(handle),
            frame_count,
            frame_size,
            fps,
        })
    }

    /// Total number of frames reported by the container
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Frame width and height in pixels
    #[must_use]
    pub fn frame_size(&self) -> (i32, i32) {
        self.frame_size
    }

    /// Frames per second reported by the container
    #[must_use]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Read the next frame; `Ok(None)` signals the end of the stream
    ///
    /// # Errors
    ///
    /// Returns a `Video` error when the reader thread has shut down.
    pub fn next_frame(&self) -> Result<Option<VideoFrame>> {
        self.request(Request::Next)
    }

    /// Seek to `target` and return that frame, decoding every frame on the
    /// way; `Ok(None)` when the target lies past the end
    ///
    /// # Errors
    ///
    /// Returns a `Video` error when the reader thread has shut down.
    pub fn seek(&self, target: usize) -> Result<Option<VideoFrame>> {
        self.request(Request::Seek(target))
    }

    fn request(&self, request: Request) -> Result<Option<VideoFrame>> {
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| Error::Video("video reader stopped".to_string()))?;
        requests
            .send(request)
            .map_err(|_| Error::Video("video reader thread exited".to_string()))?;
        self.frames
            .recv()
            .map_err(|_| Error::Video("video reader thread exited".to_string()))?
    }

    /// Request cooperative shutdown and join the worker
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for VideoReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reader_loop(
    capture: &mut VideoCapture,
    requests: &Receiver<Request>,
    frames: &SyncSender<Result<Option<VideoFrame>>>,
    stop: &AtomicBool,
) {
    // index of the next frame the capture will decode
    let mut next_index = 0usize;
    while let Ok(request) = requests.recv() {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let result = match request {
            Request::Next => read_one(capture, &mut next_index),
            Request::Seek(target) => seek_to(capture, &mut next_index, target, stop),
        };
        if frames.send(result).is_err() {
            break;
        }
    }
}

fn read_one(capture: &mut VideoCapture, next_index: &mut usize) -> Result<Option<VideoFrame>> {
    let mut image = Mat::default();
    if !capture.read(&mut image)? || image.empty() {
        return Ok(None);
    }
    let frame = VideoFrame {
        index: *next_index,
        image,
    };
    *next_index += 1;
    Ok(Some(frame))
}

fn seek_to(capture: &mut VideoCapture, next_index: &mut usize, target: usize, stop: &AtomicBool) -> Result<Option<VideoFrame>> {
    if target < *next_index {
        // rewind and decode forward again
        capture.set(videoio::CAP_PROP_POS_FRAMES, 0.0)?;
        *next_index = 0;
    }
    while *next_index < target {
        if stop.load(Ordering::Relaxed) {
            return Ok(None);
        }
        let mut discard = Mat::default();
        if !capture.read(&mut discard)? || discard.empty() {
            return Ok(None);
        }
        *next_index += 1;
    }
    read_one(capture, next_index)
}

/// Worker-thread writer for the annotated analysis video
pub struct VideoRecorder {
    frames: Option<Sender<Mat>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl VideoRecorder {
    /// Create an output video and start the writer thread
    ///
    /// Frames handed to [`write`](Self::write) are resized to `frame_size`
    /// before encoding.
    ///
    /// # Errors
    ///
    /// Returns a `Video` error when the output file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, fps: f64, frame_size: (i32, i32)) -> Result<Self> {
        let path_str = path
            .as_ref()
            .to_str()
            .ok_or_else(|| Error::Video("non-UTF-8 video path".to_string()))?
            .to_string();
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let size = Size::new(frame_size.0, frame_size.1);
        let mut writer = VideoWriter::new(&path_str, fourcc, fps, size, true)?;
        if !writer.is_opened()? {
            return Err(Error::Video(format!("cannot create video {path_str}")));
        }

        let (frame_tx, frame_rx) = std::sync::mpsc::channel::<Mat>();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);

        let handle = std::thread::spawn(move || -> Result<()> {
            for frame in frame_rx {
                if worker_stop.load(Ordering::Relaxed) {
                    break;
                }
                let mut resized = Mat::default();
                imgproc::resize(&frame, &mut resized, size, 0.0, 0.0, imgproc::INTER_LINEAR)?;
                writer.write(&resized)?;
            }
            writer.release()?;
            Ok(())
        });

        Ok(Self {
            frames: Some(frame_tx),
            stop,
            handle: Some(handle),
        })
    }

    /// Queue one frame for encoding
    ///
    /// # Errors
    ///
    /// Returns a `Video` error when the writer thread has shut down.
    pub fn write(&self, frame: Mat) -> Result<()> {
        let frames = self
            .frames
            .as_ref()
            .ok_or_else(|| Error::Video("video recorder finished".to_string()))?;
        frames
            .send(frame)
            .map_err(|_| Error::Video("video writer thread exited".to_string()))
    }

    /// Flush pending frames and finalize the file
    ///
    /// # Errors
    ///
    /// Propagates any encoding error from the writer thread.
    pub fn finish(mut self) -> Result<()> {
        self.frames.take();
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::Video("video writer thread panicked".to_string()))?,
            None => Ok(()),
        }
    }

    /// Abandon pending frames and stop as soon as possible
    pub fn cancel(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.frames.take();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for VideoRecorder {
    fn drop(&mut self) {
        self.cancel();
    }
}
