//! Frame clock: tracks the last stepped frame and pause state.

use crate::{
    error::{SimError, SimResult},
    types::{Frame, RunId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub run_id:     RunId,
    /// `None` until the first frame has been stepped.
    pub last_frame: Option<Frame>,
    pub paused:     bool,
}

impl SimClock {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            last_frame: None,
            paused: true,
        }
    }

    /// The frame `run_frames` steps next: 0 on a fresh clock.
    pub fn next_frame(&self) -> Frame {
        self.last_frame.map_or(0, |f| f + 1)
    }

    /// Record that `frame` is being stepped. Frames must strictly increase.
    pub fn observe(&mut self, frame: Frame) -> SimResult<()> {
        if let Some(last) = self.last_frame {
            if frame <= last {
                return Err(SimError::FrameOutOfOrder { last, actual: frame });
            }
        }
        self.last_frame = Some(frame);
        Ok(())
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }
}
