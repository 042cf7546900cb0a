use std::collections::BTreeMap;
use std::fmt;

/// The closed vocabulary of high-level commands the gateway accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommandKind {
    Move,
    Home,
    Pick,
    Place,
    PickAndPlace,
    VacuumOn,
    VacuumOff,
    VacuumSet,
    PwmSet,
    PwmRamp,
    GpioRead,
    GpioWrite,
    ActuatorActuate,
    ActuatorOn,
    ActuatorOff,
    FeederAdvance,
    SensorRead,
    Status,
    SystemInfo,
    Version,
    Queue,
    QueueClear,
    BatchExecute,
    EmergencyStop,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Move => "move",
            CommandKind::Home => "home",
            CommandKind::Pick => "pick",
            CommandKind::Place => "place",
            CommandKind::PickAndPlace => "pick_and_place",
            CommandKind::VacuumOn => "vacuum_on",
            CommandKind::VacuumOff => "vacuum_off",
            CommandKind::VacuumSet => "vacuum_set",
            CommandKind::PwmSet => "pwm_set",
            CommandKind::PwmRamp => "pwm_ramp",
            CommandKind::GpioRead => "gpio_read",
            CommandKind::GpioWrite => "gpio_write",
            CommandKind::ActuatorActuate => "actuator_actuate",
            CommandKind::ActuatorOn => "actuator_on",
            CommandKind::ActuatorOff => "actuator_off",
            CommandKind::FeederAdvance => "feeder_advance",
            CommandKind::SensorRead => "sensor_read",
            CommandKind::Status => "status",
            CommandKind::SystemInfo => "system_info",
            CommandKind::Version => "version",
            CommandKind::Queue => "queue",
            CommandKind::QueueClear => "queue_clear",
            CommandKind::BatchExecute => "batch_execute",
            CommandKind::EmergencyStop => "emergency_stop",
        }
    }

    pub fn parse(kind: &str) -> Option<CommandKind> {
        Some(match kind {
            "move" => CommandKind::Move,
            "home" => CommandKind::Home,
            "pick" => CommandKind::Pick,
            "place" => CommandKind::Place,
            "pick_and_place" => CommandKind::PickAndPlace,
            "vacuum_on" => CommandKind::VacuumOn,
            "vacuum_off" => CommandKind::VacuumOff,
            "vacuum_set" => CommandKind::VacuumSet,
            "pwm_set" => CommandKind::PwmSet,
            "pwm_ramp" => CommandKind::PwmRamp,
            "gpio_read" => CommandKind::GpioRead,
            "gpio_write" => CommandKind::GpioWrite,
            "actuator_actuate" => CommandKind::ActuatorActuate,
            "actuator_on" => CommandKind::ActuatorOn,
            "actuator_off" => CommandKind::ActuatorOff,
            "feeder_advance" => CommandKind::FeederAdvance,
            "sensor_read" => CommandKind::SensorRead,
            "status" => CommandKind::Status,
            "system_info" => CommandKind::SystemInfo,
            "version" => CommandKind::Version,
            "queue" => CommandKind::Queue,
            "queue_clear" => CommandKind::QueueClear,
            "batch_execute" => CommandKind::BatchExecute,
            "emergency_stop" => CommandKind::EmergencyStop,
            _ => return None,
        })
    }

    /// True for commands that only read controller/cache state (capability `read`).
    pub fn is_query(self) -> bool {
        matches!(
            self,
            CommandKind::GpioRead
                | CommandKind::SensorRead
                | CommandKind::Status
                | CommandKind::SystemInfo
                | CommandKind::Version
                | CommandKind::Queue
        )
    }

    /// The cache categories a successful dispatch of this command invalidates,
    /// per the table in spec §4.G.
    pub fn invalidated_categories(self) -> &'static [&'static str] {
        match self {
            CommandKind::Move | CommandKind::Home => &["positions"],
            CommandKind::VacuumOn | CommandKind::VacuumOff | CommandKind::VacuumSet => &["fans"],
            CommandKind::PwmSet | CommandKind::PwmRamp | CommandKind::Pick | CommandKind::Place | CommandKind::PickAndPlace => {
                &["pwm", "positions"]
            }
            CommandKind::GpioWrite | CommandKind::ActuatorActuate | CommandKind::ActuatorOn | CommandKind::ActuatorOff => &["gpio"],
            CommandKind::EmergencyStop => &["positions", "fans", "pwm", "gpio", "sensors", "system"],
            _ => &[],
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named scalar parameter value, as carried in a `CommandRequest`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Integer(i64),
    Text(String),
    Bool(bool),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(v) => Some(*v),
            ParamValue::Number(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(v) => write!(f, "{v:.3}"),
            ParamValue::Integer(v) => write!(f, "{v}"),
            ParamValue::Text(s) => write!(f, "{s}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// An immutable, already-parsed request: the boundary the core pipeline
/// actually consumes (spec §1 — the REST front door is out of scope).
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub kind: CommandKind,
    pub parameters: BTreeMap<String, ParamValue>,
}

impl CommandRequest {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_as_str_and_parse() {
        for kind in [
            CommandKind::Move,
            CommandKind::PickAndPlace,
            CommandKind::EmergencyStop,
            CommandKind::GpioRead,
        ] {
            assert_eq!(CommandKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn unknown_kind_parses_to_none() {
        assert_eq!(CommandKind::parse("teleport"), None);
    }

    #[test]
    fn pwm_set_invalidates_pwm_and_positions() {
        assert_eq!(CommandKind::PwmSet.invalidated_categories(), &["pwm", "positions"]);
    }
}
