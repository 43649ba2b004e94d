/// Controls overlay, one entry per line.
pub const HELP_LINES: &[&str] = &[
    "W / S: throttle / brake",
    "A / D: steer",
    "Space: handbrake",
    "Q / E or 1-8: change vehicle",
    "C: first / third person",
    "Drag: orbit camera, wheel: zoom",
    "0: lock camera, L: lock distance, R: reset camera",
    "H: toggle this help",
];

/// Everything the heads-up display shows, detached from game state.
#[derive(Debug, Clone, PartialEq)]
pub struct HudState {
    /// One-based for display.
    pub vehicle_number: usize,
    pub vehicle_count: usize,
    pub vehicle_name: String,
    pub coins: u32,
    pub coin_target: u32,
    pub race_time: f64,
    pub record: Option<f64>,
    /// Completion time while a win waits for acknowledgement.
    pub win_time: Option<f64>,
    pub help_visible: bool,
    pub first_person: bool,
}

impl HudState {
    pub fn info_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "Vehicle: {} / {} ({})",
                self.vehicle_number, self.vehicle_count, self.vehicle_name
            ),
            format!("Coins: {} / {}", self.coins, self.coin_target),
            format!("Time: {}", format_clock(self.race_time)),
        ];
        if let Some(record) = self.record {
            lines.push(format!("Record: {}", format_clock(record)));
        }
        lines
    }

    pub fn win_message(&self) -> Option<String> {
        self.win_time
            .map(|t| format!("YOU WIN!\nPress F to Continue\nYour Time: {}", format_clock(t)))
    }
}

/// Whole seconds as `mm:ss`. Minutes keep counting past 99.
pub fn format_clock(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hud() -> HudState {
        HudState {
            vehicle_number: 2,
            vehicle_count: 3,
            vehicle_name: "Blue".into(),
            coins: 1,
            coin_target: 5,
            race_time: 75.9,
            record: None,
            win_time: None,
            help_visible: false,
            first_person: false,
        }
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0.0), "00:00");
        assert_eq!(format_clock(59.99), "00:59");
        assert_eq!(format_clock(75.9), "01:15");
        assert_eq!(format_clock(6000.0), "100:00");
        assert_eq!(format_clock(f64::NAN), "00:00");
    }

    #[test]
    fn info_lines_include_record_when_known() {
        let mut h = hud();
        assert_eq!(h.info_lines().len(), 3);
        assert_eq!(h.info_lines()[0], "Vehicle: 2 / 3 (Blue)");
        h.record = Some(61.0);
        assert_eq!(h.info_lines()[3], "Record: 01:01");
    }

    #[test]
    fn win_message_only_when_won() {
        let mut h = hud();
        assert!(h.win_message().is_none());
        h.win_time = Some(42.0);
        let msg = h.win_message().unwrap();
        assert!(msg.starts_with("YOU WIN!"));
        assert!(msg.ends_with("00:42"));
    }
}
