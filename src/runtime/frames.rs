use crate::runtime::{
    environment::Environment,
    error::{RuntimeError, RuntimeResult},
};

/// An active closure call.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Scope the closure body runs in.
    pub env: Environment,
}

#[derive(Debug)]
pub struct CallStack {
    frames: Vec<Frame>,
    limit: usize,
}

impl CallStack {
    pub fn new(limit: usize) -> Self {
        Self {
            frames: Vec::new(),
            limit,
        }
    }

    pub fn push(&mut self, frame: Frame) -> RuntimeResult<()> {
        if self.frames.len() >= self.limit {
            return Err(RuntimeError::StackOverflow { limit: self.limit });
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// 1-based number of the innermost frame running in `env`, or 0 when `env`
    /// is not a frame scope (top level).
    pub fn frame_number(&self, env: &Environment) -> usize {
        self.frames
            .iter()
            .rposition(|frame| frame.env.ptr_eq(env))
            .map_or(0, |index| index + 1)
    }

    pub fn frame(&self, number: usize) -> Option<&Frame> {
        number.checked_sub(1).and_then(|index| self.frames.get(index))
    }

    /// Resolves a `sys.frame(which)` request issued from the frame numbered
    /// `current`. Non-positive `which` counts back from `current`; frame 0 is
    /// the global scope.
    pub fn sys_frame(
        &self,
        which: i64,
        current: usize,
        global: &Environment,
    ) -> RuntimeResult<Environment> {
        let target = if which > 0 {
            which
        } else {
            current as i64 + which
        };
        if target == 0 {
            return Ok(global.clone());
        }
        usize::try_from(target)
            .ok()
            .and_then(|number| self.frame(number))
            .map(|frame| frame.env.clone())
            .ok_or(RuntimeError::FrameOutOfRange { which })
    }
}
