use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Collectible field settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinConfig {
    /// Half-extent of the square play area on X and Z.
    pub bound: f32,
    /// Per-axis ground distance at which the vehicle picks the coin up.
    pub pickup_radius: f32,
    /// Coins needed to win a round.
    pub target: u32,
    /// Visual spin of the coin in degrees per second.
    pub spin_rate: f32,
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            bound: 95.0,
            pickup_radius: 4.5,
            target: 5,
            spin_rate: 130.0,
        }
    }
}

/// Outcome of a pickup check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinEvent {
    None,
    Collected { count: u32 },
    Won { count: u32 },
}

/// The single live coin, the collection count and the round state.
#[derive(Debug)]
pub struct CoinField {
    config: CoinConfig,
    rng: StdRng,
    position: Vec3,
    spin: f32,
    collected: u32,
    won: bool,
}

impl CoinField {
    pub fn new(config: CoinConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic placement, for tests and replays.
    pub fn seeded(config: CoinConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: CoinConfig, rng: StdRng) -> Self {
        let mut field = Self {
            config,
            rng,
            position: Vec3::ZERO,
            spin: 0.0,
            collected: 0,
            won: false,
        };
        field.respawn();
        field
    }

    pub fn config(&self) -> &CoinConfig {
        &self.config
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Current spin angle in degrees, in `[0, 360)`.
    pub fn spin_angle(&self) -> f32 {
        self.spin
    }

    pub fn collected(&self) -> u32 {
        self.collected
    }

    /// True from the winning pickup until the player acknowledges it.
    pub fn won(&self) -> bool {
        self.won
    }

    pub fn spin(&mut self, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.spin = (self.spin + self.config.spin_rate * delta).rem_euclid(360.0);
        }
    }

    /// Collect the coin if `vehicle` is within reach. Pickups are ignored
    /// while a win is pending acknowledgement.
    pub fn check_pickup(&mut self, vehicle: Vec3) -> CoinEvent {
        if self.won {
            return CoinEvent::None;
        }
        let r = self.config.pickup_radius;
        if (vehicle.x - self.position.x).abs() > r || (vehicle.z - self.position.z).abs() > r {
            return CoinEvent::None;
        }
        self.collected += 1;
        self.respawn();
        if self.collected >= self.config.target {
            self.won = true;
            tracing::info!(count = self.collected, "coin target reached");
            CoinEvent::Won {
                count: self.collected,
            }
        } else {
            tracing::info!(count = self.collected, "coin collected");
            CoinEvent::Collected {
                count: self.collected,
            }
        }
    }

    /// Whether a point has left the square play area.
    pub fn is_out_of_bounds(&self, point: Vec3) -> bool {
        point.x.abs() > self.config.bound || point.z.abs() > self.config.bound
    }

    /// Start a new round: zero the count and place a fresh coin.
    pub fn reset(&mut self) {
        self.collected = 0;
        self.won = false;
        self.respawn();
    }

    /// Dismiss the win message and start the next round.
    pub fn acknowledge(&mut self) {
        if self.won {
            self.reset();
        }
    }

    fn respawn(&mut self) {
        let b = self.config.bound;
        self.position = Vec3::new(
            self.rng.random_range(-b..=b),
            0.0,
            self.rng.random_range(-b..=b),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> CoinField {
        CoinField::seeded(CoinConfig::default(), 7)
    }

    #[test]
    fn spawns_inside_bounds() {
        let mut f = field();
        for _ in 0..200 {
            let p = f.position();
            assert!(!f.is_out_of_bounds(p));
            f.reset();
        }
    }

    #[test]
    fn pickup_relocates_inside_bounds() {
        let mut f = field();
        for i in 1..5 {
            let before = f.position();
            assert_eq!(f.check_pickup(before), CoinEvent::Collected { count: i });
            let after = f.position();
            assert_ne!(after, before);
            assert!(!f.is_out_of_bounds(after));
            assert!(after.x.abs() <= 95.0 && after.z.abs() <= 95.0);
        }
    }

    #[test]
    fn far_vehicle_collects_nothing() {
        let mut f = field();
        let far = f.position() + Vec3::new(10.0, 0.0, 0.0);
        assert_eq!(f.check_pickup(far), CoinEvent::None);
        assert_eq!(f.collected(), 0);
    }

    #[test]
    fn pickup_area_is_square() {
        let mut f = field();
        let corner = f.position() + Vec3::new(4.4, 0.0, -4.4);
        assert_eq!(f.check_pickup(corner), CoinEvent::Collected { count: 1 });
        let outside = f.position() + Vec3::new(4.6, 0.0, 0.0);
        assert_eq!(f.check_pickup(outside), CoinEvent::None);
    }

    #[test]
    fn height_does_not_matter() {
        let mut f = field();
        let above = f.position() + Vec3::new(1.0, 50.0, 1.0);
        assert_eq!(f.check_pickup(above), CoinEvent::Collected { count: 1 });
    }

    #[test]
    fn reaching_target_wins_and_blocks_pickups() {
        let mut f = field();
        for i in 1..5 {
            let p = f.position();
            assert_eq!(f.check_pickup(p), CoinEvent::Collected { count: i });
        }
        let p = f.position();
        assert_eq!(f.check_pickup(p), CoinEvent::Won { count: 5 });
        assert!(f.won());

        let p = f.position();
        assert_eq!(f.check_pickup(p), CoinEvent::None);
        assert_eq!(f.collected(), 5);

        f.acknowledge();
        assert!(!f.won());
        assert_eq!(f.collected(), 0);
    }

    #[test]
    fn acknowledge_without_win_keeps_count() {
        let mut f = field();
        let p = f.position();
        f.check_pickup(p);
        f.acknowledge();
        assert_eq!(f.collected(), 1);
    }

    #[test]
    fn bounds_are_square() {
        let f = field();
        assert!(!f.is_out_of_bounds(Vec3::new(95.0, 10.0, -95.0)));
        assert!(f.is_out_of_bounds(Vec3::new(95.1, 0.0, 0.0)));
        assert!(f.is_out_of_bounds(Vec3::new(0.0, 0.0, -96.0)));
    }

    #[test]
    fn spin_wraps() {
        let mut f = field();
        f.spin(3.0);
        assert!((f.spin_angle() - 30.0).abs() < 1e-3);
        f.spin(f32::NAN);
        f.spin(-1.0);
        assert!((f.spin_angle() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn seeded_fields_agree() {
        let a = CoinField::seeded(CoinConfig::default(), 42);
        let b = CoinField::seeded(CoinConfig::default(), 42);
        assert_eq!(a.position(), b.position());
    }
}
