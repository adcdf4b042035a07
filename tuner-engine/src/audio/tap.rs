//! Analysis taps
//!
//! A tap carries samples from the real-time audio callback to the frame
//! loop without locking: the callback side pushes into a lock-free ring
//! buffer, the frame-loop side drains it into a fixed-size sliding window
//! holding the most recent samples. When the ring is full the callback
//! drops the batch rather than block the audio thread.

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};

/// Create a tap: a feed for the audio callback and a window for analysis
///
/// `window_size` is the number of samples the analysis window holds;
/// `ring_capacity` bounds how far the callback can run ahead of the frame
/// loop before batches are dropped.
pub fn analysis_tap(window_size: usize, ring_capacity: usize) -> (TapFeed, TapWindow) {
    let rb = HeapRb::<f32>::new(ring_capacity);
    let (producer, consumer) = rb.split();

    (
        TapFeed { producer },
        TapWindow {
            consumer,
            window: Vec::with_capacity(window_size),
            size: window_size,
        },
    )
}

/// Callback-side half of a tap
pub struct TapFeed {
    producer: ringbuf::HeapProd<f32>,
}

impl TapFeed {
    /// Push a batch of samples, dropping whatever does not fit
    ///
    /// Returns the number of samples actually written.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }

    /// Remaining space before pushes start dropping
    pub fn available_space(&self) -> usize {
        self.producer.vacant_len()
    }
}

/// Frame-loop-side half of a tap
///
/// Holds a sliding window of the most recent `size` samples; older samples
/// fall off the front as new ones arrive.
pub struct TapWindow {
    consumer: ringbuf::HeapCons<f32>,
    window: Vec<f32>,
    size: usize,
}

impl TapWindow {
    /// Pull everything the callback has produced into the window
    ///
    /// Returns the number of new samples consumed.
    pub fn drain(&mut self) -> usize {
        let mut chunk = [0.0f32; 512];
        let mut total = 0;

        loop {
            let n = self.consumer.pop_slice(&mut chunk);
            if n == 0 {
                break;
            }
            self.append(&chunk[..n]);
            total += n;
        }

        total
    }

    fn append(&mut self, samples: &[f32]) {
        if samples.len() >= self.size {
            // The batch alone fills the window; keep only its tail
            self.window.clear();
            self.window
                .extend_from_slice(&samples[samples.len() - self.size..]);
            return;
        }

        let overflow = (self.window.len() + samples.len()).saturating_sub(self.size);
        if overflow > 0 {
            self.window.drain(..overflow);
        }
        self.window.extend_from_slice(samples);
    }

    /// The current window contents, oldest sample first
    pub fn samples(&self) -> &[f32] {
        &self.window
    }

    /// Whether the window has filled up since the session started
    pub fn is_warm(&self) -> bool {
        self.window.len() == self.size
    }

    /// Configured window size in samples
    pub fn window_size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_fills_from_feed() {
        let (mut feed, mut window) = analysis_tap(8, 64);
        assert!(!window.is_warm());

        feed.push(&[1.0; 5]);
        assert_eq!(window.drain(), 5);
        assert_eq!(window.samples().len(), 5);
        assert!(!window.is_warm());

        feed.push(&[2.0; 5]);
        window.drain();
        assert!(window.is_warm());
        assert_eq!(window.samples().len(), 8);
    }

    #[test]
    fn test_window_keeps_most_recent() {
        let (mut feed, mut window) = analysis_tap(4, 64);

        let input: Vec<f32> = (0..10).map(|i| i as f32).collect();
        feed.push(&input);
        window.drain();

        assert_eq!(window.samples(), &[6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_oversized_batch_keeps_tail() {
        let (mut feed, mut window) = analysis_tap(4, 64);

        let input: Vec<f32> = (0..20).map(|i| i as f32).collect();
        feed.push(&input);
        window.drain();

        assert_eq!(window.samples(), &[16.0, 17.0, 18.0, 19.0]);
    }

    #[test]
    fn test_full_ring_drops_batch() {
        let (mut feed, mut window) = analysis_tap(4, 8);

        assert_eq!(feed.push(&[1.0; 8]), 8);
        assert_eq!(feed.available_space(), 0);
        // Ring is full; this push is dropped
        assert_eq!(feed.push(&[2.0; 4]), 0);

        window.drain();
        assert_eq!(window.samples(), &[1.0; 4]);
    }

    #[test]
    fn test_drain_empty_is_zero() {
        let (_feed, mut window) = analysis_tap(4, 8);
        assert_eq!(window.drain(), 0);
        assert!(window.samples().is_empty());
    }
}
