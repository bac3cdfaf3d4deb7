//! Animation project data model
//!
//! A project is the payload the editor autosaves: an ordered list of frames,
//! each holding the strokes drawn on it. Drawing logic lives elsewhere; this
//! module only describes what gets persisted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default playback rate for new projects
pub const DEFAULT_FPS: u32 = 12;

/// Errors raised by project mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectError {
    #[error("frame {index} out of range (project has {len} frames)")]
    FrameOutOfRange { index: usize, len: usize },

    #[error("a project must keep at least one frame")]
    LastFrame,

    #[error("fps must be between 1 and 120, got {0}")]
    InvalidFps(u32),
}

/// A multi-frame animation project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Display name
    pub name: String,
    /// Playback rate in frames per second
    pub fps: u32,
    /// Frames in playback order
    pub frames: Vec<Frame>,
}

/// A single frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub strokes: Vec<Stroke>,
}

/// A freehand stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// `#rrggbb`
    pub color: String,
    pub width: f32,
    pub points: Vec<(f32, f32)>,
}

impl Stroke {
    pub fn new(points: Vec<(f32, f32)>) -> Self {
        Self {
            color: "#000000".to_string(),
            width: 2.0,
            points,
        }
    }
}

impl Project {
    /// Create a project with one empty frame
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fps: DEFAULT_FPS,
            frames: vec![Frame::default()],
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Result<Self, ProjectError> {
        self.set_fps(fps)?;
        Ok(self)
    }

    pub fn set_fps(&mut self, fps: u32) -> Result<(), ProjectError> {
        if !(1..=120).contains(&fps) {
            return Err(ProjectError::InvalidFps(fps));
        }
        self.fps = fps;
        Ok(())
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total strokes across all frames
    pub fn stroke_count(&self) -> usize {
        self.frames.iter().map(|f| f.strokes.len()).sum()
    }

    /// Append an empty frame, returning its index
    pub fn add_frame(&mut self) -> usize {
        self.frames.push(Frame::default());
        self.frames.len() - 1
    }

    /// Remove the frame at `index`
    pub fn remove_frame(&mut self, index: usize) -> Result<Frame, ProjectError> {
        let len = self.frames.len();
        if index >= len {
            return Err(ProjectError::FrameOutOfRange { index, len });
        }
        if len == 1 {
            return Err(ProjectError::LastFrame);
        }
        Ok(self.frames.remove(index))
    }

    /// Add a stroke to the frame at `index`
    pub fn push_stroke(&mut self, index: usize, stroke: Stroke) -> Result<(), ProjectError> {
        let len = self.frames.len();
        let frame = self
            .frames
            .get_mut(index)
            .ok_or(ProjectError::FrameOutOfRange { index, len })?;
        frame.strokes.push(stroke);
        Ok(())
    }
}
