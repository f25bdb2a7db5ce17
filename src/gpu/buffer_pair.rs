//! Ping-pong pairs.
//!
//! A stage that reads last frame's output and writes this frame's never gets
//! the same buffer for both: [`BufferPair::read_write`] hands out the two
//! halves by index, and [`BufferPair::swap`] flips which one is current.

/// Two interchangeable buffers with a current/previous role.
#[derive(Debug)]
pub struct BufferPair<T> {
    buffers: [T; 2],
    current: usize,
}

impl<T> BufferPair<T> {
    /// Create a pair. `front` starts out as the current buffer.
    pub fn new(front: T, back: T) -> Self {
        Self {
            buffers: [front, back],
            current: 0,
        }
    }

    /// Buffer holding the most recently completed output.
    #[inline]
    pub fn current(&self) -> &T {
        &self.buffers[self.current]
    }

    /// The other buffer: stale, and the next write target.
    #[inline]
    pub fn previous(&self) -> &T {
        &self.buffers[1 - self.current]
    }

    /// `(read, write)` for a pass that advances the pair. Call
    /// [`swap`](Self::swap) once the pass has been encoded.
    #[inline]
    pub fn read_write(&self) -> (&T, &T) {
        (self.current(), self.previous())
    }

    /// Make the previous buffer current.
    #[inline]
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    /// Both buffers, front first.
    pub fn both(&self) -> [&T; 2] {
        [&self.buffers[0], &self.buffers[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_starts_current() {
        let pair = BufferPair::new("a", "b");
        assert_eq!(*pair.current(), "a");
        assert_eq!(*pair.previous(), "b");
    }

    #[test]
    fn test_swap_alternates() {
        let mut pair = BufferPair::new(1, 2);
        pair.swap();
        assert_eq!((*pair.current(), *pair.previous()), (2, 1));
        pair.swap();
        assert_eq!((*pair.current(), *pair.previous()), (1, 2));
    }

    #[test]
    fn test_read_write_never_alias() {
        let mut pair = BufferPair::new(10, 20);
        for _ in 0..5 {
            let (read, write) = pair.read_write();
            assert!(!std::ptr::eq(read, write));
            pair.swap();
        }
    }

    #[test]
    fn test_written_buffer_becomes_current() {
        let mut pair = BufferPair::new(0, 0);
        let (_, write) = pair.read_write();
        let written = write as *const i32;
        pair.swap();
        assert!(std::ptr::eq(pair.current(), written));
    }
}
