/// Turns cumulative byte counts into integer percentages.
///
/// Values never decrease and `100` is withheld until [`complete`] is called,
/// so a PUT that sent every byte but has not been answered yet reads `99`.
///
/// [`complete`]: ProgressTracker::complete
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: Option<u64>,
    last: u8,
    completed: bool,
}

impl ProgressTracker {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            last: 0,
            completed: false,
        }
    }

    /// Record `bytes_sent` and return the new percentage if it increased.
    ///
    /// Always `None` when the total is unknown.
    pub fn update(&mut self, bytes_sent: u64) -> Option<u8> {
        let total = self.total?;
        if self.completed {
            return None;
        }

        let percent = (bytes_sent as u128 * 100 / total as u128).min(99) as u8;
        if percent > self.last {
            self.last = percent;
            Some(percent)
        } else {
            None
        }
    }

    /// Mark the transfer as done; yields `100` exactly once.
    pub fn complete(&mut self) -> Option<u8> {
        if self.completed {
            return None;
        }
        self.completed = true;
        self.last = 100;
        Some(100)
    }

    pub fn percent(&self) -> u8 {
        self.last
    }
}
