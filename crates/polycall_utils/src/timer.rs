use std::time::Instant;

/// Wall-clock timer for load and call phases, read in milliseconds so the
/// figures drop straight into log fields.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start_new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Milliseconds since the last lap (or start), restarting the watch.
    pub fn lap_ms(&mut self) -> f64 {
        let now = Instant::now();
        let lap = now.duration_since(self.started).as_secs_f64() * 1000.0;
        self.started = now;
        lap
    }
}
