//! Weighted-signal accumulator shared by the microstructure specialists.
//! Each triggered rule contributes a name, an integer weight (how much it
//! should count toward confidence), and a tilt (how far it nudges the fair
//! probability away from the last traded price).

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

    /// Weight-averaged tilt across all triggered signals, clamped to a
    /// sane per-agent range so no single specialist can swing the fused
    /// probability by more than a few points.
    pub fn combined_tilt(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let total_weight: i32 = self.entries.iter().map(|(_, w, _)| w).sum();
        if total_weight == 0 {
            return 0.0;
        }
        let weighted: f64 = self
            .entries
            .iter()
            .map(|(_, w, tilt)| *w as f64 * tilt)
            .sum();
        (weighted / total_weight as f64).clamp(-0.15, 0.15)
    }

    /// Confidence rises with how many signals fired and how much weight
    /// they carry, and is damped by how data-poor the market is (thin
    /// books, sparse history).
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
