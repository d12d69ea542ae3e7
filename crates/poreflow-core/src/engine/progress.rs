#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    /// Overall completion of the run, in `0.0..=100.0`.
    Percent(f64),

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    #[inline]
    pub fn percent(&self, value: f64) {
        self.report(Progress::Percent(value.clamp(0.0, 100.0)));
    }
}

/// Maps a solver's local completion onto its slice of the overall percentage band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressBand {
    pub start: f64,
    pub end: f64,
}

impl ProgressBand {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Splits `self` into `parts` equal consecutive bands.
    pub fn split(self, parts: usize) -> Vec<ProgressBand> {
        let width = (self.end - self.start) / parts.max(1) as f64;
        (0..parts)
            .map(|i| {
                let start = self.start + width * i as f64;
                ProgressBand::new(start, start + width)
            })
            .collect()
    }

    /// The overall percentage at local completion `fraction` (clamped to `[0, 1]`).
    pub fn at(&self, fraction: f64) -> f64 {
        self.start + (self.end - self.start) * fraction.clamp(0.0, 1.0)
    }
}
