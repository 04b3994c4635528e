//! Pointer recentering handshake and the jitter filter that follows it.
//!
//! The client asks the server to warp the pointer to a fixed anchor and
//! captures nothing until `cursor_reset` arrives. After that, the first
//! movement is held as a candidate origin until the pointer has really
//! moved away from it, so OS-level settle jitter is not read as ink.

use crate::models::Point;

use super::session::Effect;

/// Holds back pointer samples until they leave a small radius around the
/// first one seen after a recenter.
#[derive(Debug, Clone, PartialEq)]
pub struct JitterFilter {
    threshold_px: f64,
    origin: Option<Point>,
    armed: bool,
}

impl JitterFilter {
    pub fn new(threshold_px: f64) -> Self {
        Self {
            threshold_px,
            origin: None,
            armed: true,
        }
    }

    /// Returns the samples to append to the stream, possibly none. The
    /// held origin is released ahead of the sample that passes the
    /// threshold; samples in between are discarded.
    pub fn feed(&mut self, point: Point) -> Vec<Point> {
        if !self.armed {
            return vec![point];
        }

        match self.origin {
            None => {
                self.origin = Some(point);
                Vec::new()
            }
            Some(origin) if origin.distance_to(&point) > self.threshold_px => {
                self.armed = false;
                self.origin = None;
                vec![origin, point]
            }
            Some(_) => Vec::new(),
        }
    }
}

/// Retry policy for the recenter request. Attempts are counted from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct RecenterCoordinator {
    anchor: (f64, f64),
    max_attempts: u32,
}

impl RecenterCoordinator {
    pub fn new(anchor: (f64, f64), max_attempts: u32) -> Self {
        Self {
            anchor,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Effects that put a recenter request on the wire and arm its timer.
    pub fn request(&self) -> Vec<Effect> {
        let (x, y) = self.anchor;
        vec![Effect::RequestRecenter { x, y }, Effect::ArmAckTimer]
    }

    /// Next attempt number after a timeout, or `None` once exhausted.
    pub fn next_attempt(&self, attempt: u32) -> Option<u32> {
        (attempt < self.max_attempts).then_some(attempt + 1)
    }

    pub fn exhausted_message(&self) -> String {
        format!(
            "Cursor reset was not acknowledged after {} attempt(s)",
            self.max_attempts
        )
    }
}
