use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cache partition tied to a physical subsystem of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Positions,
    Fans,
    Pwm,
    Gpio,
    Sensors,
    System,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Positions,
        Category::Fans,
        Category::Pwm,
        Category::Gpio,
        Category::Sensors,
        Category::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Positions => "positions",
            Category::Fans => "fans",
            Category::Pwm => "pwm",
            Category::Gpio => "gpio",
            Category::Sensors => "sensors",
            Category::System => "system",
        }
    }
}

/// Default per-category TTLs (spec §4.G), overridable via configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CategoryTtls {
    pub positions: Duration,
    pub fans: Duration,
    pub pwm: Duration,
    pub gpio: Duration,
    pub sensors: Duration,
    pub system: Duration,
}

impl Default for CategoryTtls {
    fn default() -> Self {
        Self {
            positions: Duration::from_millis(200),
            fans: Duration::from_millis(500),
            pwm: Duration::from_millis(500),
            gpio: Duration::from_millis(500),
            sensors: Duration::from_secs(1),
            system: Duration::from_secs(5),
        }
    }
}

impl CategoryTtls {
    pub fn ttl_for(&self, category: Category) -> Duration {
        match category {
            Category::Positions => self.positions,
            Category::Fans => self.fans,
            Category::Pwm => self.pwm,
            Category::Gpio => self.gpio,
            Category::Sensors => self.sensors,
            Category::System => self.system,
        }
    }
}
