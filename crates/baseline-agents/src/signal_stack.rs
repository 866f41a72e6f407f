//! Weighted-signal accumulator shared by this crate's agents. Same shape as
//! the microstructure crate's helper: each rule contributes a name, a
//! weight, and a tilt, and the stack reduces those into a combined nudge
//! plus a confidence score.

pub struct SignalStack {
    entries: Vec<(&'static str, i32, f64)>,
}

impl SignalStack {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, name: &'static str, weight: i32, tilt: f64) {
        self.entries.push((name, weight, tilt));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn combined_tilt(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let total_weight: i32 = self.entries.iter().map(|(_, w, _)| w).sum();
        if total_weight == 0 {
            return 0.0;
        }
        let weighted: f64 = self.entries.iter().map(|(_, w, tilt)| *w as f64 * tilt).sum();
        (weighted / total_weight as f64).clamp(-0.15, 0.15)
    }

    pub fn confidence(&self, data_richness: f64) -> f64 {
        let total_weight: i32 = self.entries.iter().map(|(_, w, _)| w).sum();
        let breadth = (self.entries.len() as f64 / 4.0).min(1.0);
        let strength = (total_weight as f64 / 6.0).min(1.0);
        let richness = data_richness.clamp(0.0, 1.0);
        (0.3 + 0.3 * breadth + 0.25 * strength + 0.15 * richness).clamp(0.05, 0.99)
    }

    pub fn driver_names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _, _)| name.to_string()).collect()
    }
}
