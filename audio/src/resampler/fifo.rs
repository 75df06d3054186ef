//! Planar sample FIFO.

use std::collections::VecDeque;

/// Multi-channel FIFO of decoded samples.
///
/// Every channel always holds the same number of frames.
#[derive(Debug, Clone)]
pub(crate) struct SampleFifo {
    planes: Vec<VecDeque<f64>>,
}

impl SampleFifo {
    pub fn new(channels: usize) -> Self {
        Self {
            planes: vec![VecDeque::new(); channels],
        }
    }

    /// Number of buffered frames.
    pub fn len(&self) -> usize {
        self.planes.first().map_or(0, |p| p.len())
    }

    /// Appends the first `frames` samples of each channel slice.
    pub fn push<S: AsRef<[f64]>>(&mut self, src: &[S], frames: usize) {
        for (plane, samples) in self.planes.iter_mut().zip(src) {
            plane.extend(samples.as_ref()[..frames].iter().copied());
        }
    }

    pub fn push_silence(&mut self, frames: usize) {
        for plane in &mut self.planes {
            plane.extend(std::iter::repeat_n(0.0, frames));
        }
    }

    /// Removes up to `frames` frames from the front. Returns the number removed.
    pub fn discard(&mut self, frames: usize) -> usize {
        let n = frames.min(self.len());
        for plane in &mut self.planes {
            plane.drain(..n);
        }
        n
    }

    /// Removes up to `frames` frames from the front and returns them per channel.
    pub fn pop(&mut self, frames: usize) -> Vec<Vec<f64>> {
        let n = frames.min(self.len());
        self.planes
            .iter_mut()
            .map(|plane| plane.drain(..n).collect())
            .collect()
    }

    /// Moves up to `frames` frames from the front of `self` to the back of `dst`.
    pub fn move_to(&mut self, dst: &mut SampleFifo, frames: usize) -> usize {
        let n = frames.min(self.len());
        for (from, to) in self.planes.iter_mut().zip(dst.planes.iter_mut()) {
            to.extend(from.drain(..n));
        }
        n
    }

    pub fn clear(&mut self) {
        for plane in &mut self.planes {
            plane.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut fifo = SampleFifo::new(2);
        fifo.push(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]], 3);
        assert_eq!(fifo.len(), 3);

        let out = fifo.pop(2);
        assert_eq!(out, vec![vec![1.0, 2.0], vec![4.0, 5.0]]);
        assert_eq!(fifo.len(), 1);
    }

    #[test]
    fn test_push_prefix_only() {
        let mut fifo = SampleFifo::new(1);
        fifo.push(&[[1.0, 2.0, 3.0]], 2);
        assert_eq!(fifo.pop(10), vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn test_discard_is_bounded() {
        let mut fifo = SampleFifo::new(1);
        fifo.push_silence(5);
        assert_eq!(fifo.discard(3), 3);
        assert_eq!(fifo.discard(10), 2);
        assert_eq!(fifo.len(), 0);
    }

    #[test]
    fn test_move_to() {
        let mut a = SampleFifo::new(2);
        let mut b = SampleFifo::new(2);
        a.push(&[vec![1.0, 2.0], vec![3.0, 4.0]], 2);
        b.push_silence(1);
        assert_eq!(a.move_to(&mut b, 5), 2);
        assert_eq!(a.len(), 0);
        assert_eq!(b.pop(3), vec![vec![0.0, 1.0, 2.0], vec![0.0, 3.0, 4.0]]);
    }

    #[test]
    fn test_empty_fifo() {
        let mut fifo = SampleFifo::new(0);
        assert_eq!(fifo.len(), 0);
        assert!(fifo.pop(4).is_empty());
    }
}
