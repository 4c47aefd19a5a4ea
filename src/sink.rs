use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::frame::Frame;

/// Destination for composited frames (display, network publisher, disk).
pub trait Sink: Send {
    fn publish(&mut self, frame: &Frame) -> Result<()>;

    /// Release any owned handle. Called once when the synchronizer stops.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Adapts a closure into a [`Sink`].
pub struct FnSink<F>(pub F);

impl<F> Sink for FnSink<F>
where
    F: FnMut(&Frame) -> Result<()> + Send,
{
    fn publish(&mut self, frame: &Frame) -> Result<()> {
        (self.0)(frame)
    }
}

/// Writes each published frame as `<prefix>_<index>.png` into a directory.
pub struct PngSequenceSink {
    dir: PathBuf,
    prefix: String,
    next_index: u64,
}

impl PngSequenceSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(PngSequenceSink {
            dir,
            prefix: "overlay".to_string(),
            next_index: 0,
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Number of frames written so far.
    pub fn written(&self) -> u64 {
        self.next_index
    }

    fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{}_{:06}.png", self.prefix, index))
    }
}

impl Sink for PngSequenceSink {
    fn publish(&mut self, frame: &Frame) -> Result<()> {
        let img = frame
            .to_rgb_image()
            .context("Failed to create image buffer from composited frame")?;
        let path = self.path_for(self.next_index);
        img.save(&path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        self.next_index += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_sink_forwards() {
        let mut seen = Vec::new();
        {
            let mut sink = FnSink(|frame: &Frame| -> Result<()> {
                seen.push(frame.dimensions());
                Ok(())
            });
            sink.publish(&Frame::filled(3, 2, [0, 0, 0]).unwrap()).unwrap();
            sink.close().unwrap();
        }
        assert_eq!(seen, vec![(3, 2)]);
    }

    #[test]
    fn test_png_sequence_writes_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngSequenceSink::new(dir.path().join("out")).unwrap().with_prefix("thermal");

        sink.publish(&Frame::filled(4, 3, [255, 0, 0]).unwrap()).unwrap();
        sink.publish(&Frame::filled(4, 3, [0, 255, 0]).unwrap()).unwrap();
        assert_eq!(sink.written(), 2);

        let second = dir.path().join("out").join("thermal_000001.png");
        let img = image::open(&second).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.get_pixel(0, 0).0, [0, 255, 0]);
    }
}
