//! Image-sequence helpers: locating the image of a frame in an existing
//! sequence, and naming the files of a movie-to-sequence conversion.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Number of digits in a sequence frame number.
pub const FRAME_DIGITS: usize = 5;

/// Prefix of converted sequence files.
pub const CAPTURE_PREFIX: &str = "capture";

/// Path of `frame`'s image in the sequence that `clip_path` belongs to.
///
/// The base is everything before the first `'0'` in `clip_path`, followed by
/// the frame number zero-padded to five digits and the clip's extension.
/// `"/shots/take_00001.png"` at frame 42 gives `"/shots/take_00042.png"`.
pub fn sequence_frame_path(clip_path: &str, frame: i64) -> Result<String> {
    if frame < 0 {
        return Err(Error::InvalidConfig(format!(
            "sequence frame must be non-negative, got {}",
            frame
        )));
    }

    let base_end = clip_path.find('0').ok_or_else(|| {
        Error::InvalidConfig(format!("no frame number in sequence path '{}'", clip_path))
    })?;
    let ext_start = clip_path.rfind('.').ok_or_else(|| {
        Error::InvalidConfig(format!("no extension in sequence path '{}'", clip_path))
    })?;
    if ext_start < base_end {
        return Err(Error::InvalidConfig(format!(
            "extension precedes frame number in '{}'",
            clip_path
        )));
    }

    Ok(format!(
        "{}{:0width$}{}",
        &clip_path[..base_end],
        frame,
        &clip_path[ext_start..],
        width = FRAME_DIGITS
    ))
}

/// One output file of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionStep {
    /// Source clip frame.
    pub frame: i64,
    /// File the frame is rendered to.
    pub path: PathBuf,
}

/// Output naming for converting frames `start..=end` of a movie into an
/// image sequence.
///
/// Files are numbered from `capture00001.png` whatever the start frame is,
/// with the same five-digit padding as [`sequence_frame_path`].
#[derive(Debug, Clone)]
pub struct ConversionPlan {
    dir: PathBuf,
    start: i64,
    end: i64,
}

impl ConversionPlan {
    pub fn new<P: AsRef<Path>>(dir: P, start: i64, end: i64) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidConfig(format!(
                "conversion range is empty: {}..={}",
                start, end
            )));
        }
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            start,
            end,
        })
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Output file for the `index`-th converted frame (0-based).
    pub fn output_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!(
            "{}{:0width$}.png",
            CAPTURE_PREFIX,
            index + 1,
            width = FRAME_DIGITS
        ))
    }

    /// Every step, in frame order.
    pub fn steps(&self) -> impl Iterator<Item = ConversionStep> + '_ {
        (self.start..=self.end)
            .enumerate()
            .map(move |(i, frame)| ConversionStep {
                frame,
                path: self.output_path(i),
            })
    }

    /// Fraction done after `completed` steps.
    pub fn progress(&self, completed: usize) -> f64 {
        completed.min(self.len()) as f64 / self.len() as f64
    }
}
