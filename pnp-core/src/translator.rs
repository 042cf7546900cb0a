use crate::command::{CommandKind, CommandRequest, ParamValue};
use crate::error::BoundsError;
use crate::motion::{Axis, MotionContext, PositioningMode};
use crate::template::{Template, TemplateError};
use crate::validators::ValidatorRegistry;
use std::collections::BTreeMap;

/// The outcome of translating one high-level command into low-level lines.
///
/// Immutable post-construction (spec §3): once built, a `TranslationResult`
/// is never mutated by anything downstream.
#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub commands: Vec<String>,
    pub axes_to_mark_homed: Vec<Axis>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranslationError {
    UnknownCommand(String),
    MissingParameter(String),
    ValidationFailed(Vec<BoundsError>),
    Template(TemplateError),
}

impl From<TemplateError> for TranslationError {
    fn from(e: TemplateError) -> Self {
        TranslationError::Template(e)
    }
}

/// Every low-level line the Translator can emit, parsed once when the
/// `CommandTranslator` is built instead of per request (spec §4.D's design
/// note: "a compiled template representation... parsed once"). Each
/// `build_commands` match arm renders one of these against a small local
/// parameter map built from the already-validated, merged request
/// parameters — it never calls `Template::parse` itself.
struct Templates {
    move_axis: [Template; 3],
    move_feedrate: Template,
    home: Template,
    vacuum_on: Template,
    vacuum_off: Template,
    pwm_set: Template,
    gpio_write: Template,
    gpio_read: Template,
    feeder_advance: Template,
    actuator_on: Template,
    actuator_off: Template,
    actuator_actuate: Template,
    sensor_read: Template,
    travel: Template,
    move_z: Template,
}

impl Templates {
    fn new() -> Self {
        Self {
            move_axis: [Template::parse("X{x}"), Template::parse("Y{y}"), Template::parse("Z{z}")],
            move_feedrate: Template::parse("F{feedrate}"),
            home: Template::parse("G28 {axes}"),
            vacuum_on: Template::parse("M106 S{power}"),
            vacuum_off: Template::parse("M106 S0"),
            pwm_set: Template::parse("SET_PIN PIN={pin} VALUE={power}"),
            gpio_write: Template::parse("SET_PIN PIN={pin} VALUE={value}"),
            gpio_read: Template::parse("QUERY_PIN PIN={pin}"),
            feeder_advance: Template::parse("FEEDER_ADVANCE DISTANCE={distance}"),
            actuator_on: Template::parse("SET_PIN PIN={pin} VALUE=1"),
            actuator_off: Template::parse("SET_PIN PIN={pin} VALUE=0"),
            actuator_actuate: Template::parse("SET_PIN PIN={pin} VALUE={value}"),
            sensor_read: Template::parse("QUERY_SENSOR NAME={sensor}"),
            travel: Template::parse("G0 X{x} Y{y} Z{z} F{feedrate}"),
            move_z: Template::parse("G0 Z{z} F{feedrate}"),
        }
    }

    fn axis_template(&self, axis: Axis) -> &Template {
        match axis {
            Axis::X => &self.move_axis[0],
            Axis::Y => &self.move_axis[1],
            Axis::Z => &self.move_axis[2],
        }
    }
}

/// `kind -> {template(s), default_parameters}` — the static mapping table
/// the Translator consults in step 1 of its algorithm (spec §4.D).
pub struct TranslatorConfig {
    pub vacuum_zero_is_off: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self { vacuum_zero_is_off: true }
    }
}

/// Maps a high-level command + context into an ordered list of low-level
/// commands via the Parameter Validators and Template Engine, and advances
/// the Motion Context (spec §4.D).
pub struct CommandTranslator {
    validators: ValidatorRegistry,
    config: TranslatorConfig,
    templates: Templates,
}

impl CommandTranslator {
    pub fn new(validators: ValidatorRegistry, config: TranslatorConfig) -> Self {
        Self { validators, config, templates: Templates::new() }
    }

    /// Translate `request` against `context`, mutating `context` only once
    /// every validator has passed and the low-level sequence has been built
    /// (spec §9, Open Question 2).
    pub fn translate(
        &self,
        request: &CommandRequest,
        context: &mut MotionContext,
    ) -> Result<TranslationResult, TranslationError> {
        let merged = self.merge_defaults(request, context);

        let errors = self.validators.validate_all(&merged);
        if !errors.is_empty() {
            return Err(TranslationError::ValidationFailed(errors));
        }

        let (commands, axes_to_mark_homed, mutation) = self.build_commands(request.kind, &merged)?;

        if let Some((mode, deltas)) = mutation {
            context.apply_move(mode, &deltas);
        }

        Ok(TranslationResult {
            commands,
            axes_to_mark_homed,
        })
    }

    /// Step 2: fill missing parameters from command defaults, then from the
    /// live Motion Context (e.g. current feedrate).
    fn merge_defaults(&self, request: &CommandRequest, context: &MotionContext) -> BTreeMap<String, ParamValue> {
        let mut merged = request.parameters.clone();
        merged
            .entry("feedrate".to_string())
            .or_insert_with(|| ParamValue::Number(context.feedrate()));
        merged
    }

    #[allow(clippy::type_complexity)]
    fn build_commands(
        &self,
        kind: CommandKind,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<(Vec<String>, Vec<Axis>, Option<(PositioningMode, std::collections::HashMap<Axis, f64>)>), TranslationError> {
        match kind {
            CommandKind::Move => self.translate_move(params),
            CommandKind::Home => self.translate_home(params),
            CommandKind::VacuumOn => self.translate_vacuum_on(params),
            CommandKind::VacuumOff => Ok((vec![self.templates.vacuum_off.render(params)?], vec![], None)),
            CommandKind::VacuumSet | CommandKind::PwmSet => self.translate_pwm_set(params),
            CommandKind::GpioWrite => Ok((vec![self.templates.gpio_write.render(params)?], vec![], None)),
            CommandKind::GpioRead => Ok((vec![self.templates.gpio_read.render(params)?], vec![], None)),
            CommandKind::FeederAdvance => Ok((vec![self.templates.feeder_advance.render(params)?], vec![], None)),
            CommandKind::ActuatorOn => Ok((vec![self.templates.actuator_on.render(params)?], vec![], None)),
            CommandKind::ActuatorOff => Ok((vec![self.templates.actuator_off.render(params)?], vec![], None)),
            CommandKind::ActuatorActuate => Ok((vec![self.templates.actuator_actuate.render(params)?], vec![], None)),
            CommandKind::SensorRead => Ok((vec![self.templates.sensor_read.render(params)?], vec![], None)),
            CommandKind::Pick => self.translate_pick(params),
            CommandKind::Place => self.translate_place(params),
            CommandKind::PickAndPlace => self.translate_pick_and_place(params),
            CommandKind::EmergencyStop => Ok((vec!["M112".to_string()], vec![], None)),
            CommandKind::Status
            | CommandKind::SystemInfo
            | CommandKind::Version
            | CommandKind::Queue
            | CommandKind::QueueClear
            | CommandKind::BatchExecute
            | CommandKind::PwmRamp => Ok((vec![], vec![], None)),
        }
    }

    fn translate_move(
        &self,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<(Vec<String>, Vec<Axis>, Option<(PositioningMode, std::collections::HashMap<Axis, f64>)>), TranslationError> {
        let mut deltas = std::collections::HashMap::new();
        let mut segments = Vec::new();
        for axis in Axis::ALL {
            if let Some(value) = params.get(axis.as_str()).and_then(ParamValue::as_f64) {
                deltas.insert(axis, value);
                let axis_params = BTreeMap::from([(axis.as_str().to_string(), ParamValue::Number(value))]);
                segments.push(self.templates.axis_template(axis).render(&axis_params)?);
            }
        }
        if segments.is_empty() {
            return Err(TranslationError::MissingParameter("x|y|z".to_string()));
        }
        let feedrate = params
            .get("feedrate")
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| TranslationError::MissingParameter("feedrate".to_string()))?;
        let feedrate_params = BTreeMap::from([("feedrate".to_string(), ParamValue::Integer(feedrate.round() as i64))]);
        segments.push(self.templates.move_feedrate.render(&feedrate_params)?);
        let command = format!("G0 {}", segments.join(" "));
        Ok((vec![command], vec![], Some((PositioningMode::Absolute, deltas))))
    }

    /// `home` updates HomedAxes for each axis declared, or all three if
    /// `axes=all` (spec §4.D edge case). The actual mutation happens in the
    /// Safety Manager once the Dispatcher observes controller success; here
    /// we only report which axes this translation would home.
    fn translate_home(
        &self,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<(Vec<String>, Vec<Axis>, Option<(PositioningMode, std::collections::HashMap<Axis, f64>)>), TranslationError> {
        let axes = match params.get("axes").and_then(ParamValue::as_str) {
            Some("all") | None => Axis::ALL.to_vec(),
            Some(list) => list.split(',').filter_map(Axis::parse).collect(),
        };
        let letters: String = axes.iter().map(|axis| Axis::as_str(*axis)).map(str::to_ascii_uppercase).collect();
        let render_params = BTreeMap::from([("axes".to_string(), ParamValue::Text(letters))]);
        Ok((vec![self.templates.home.render(&render_params)?], axes, None))
    }

    /// `vacuum_on` translates to a fan-speed command with `PWM = power/255`
    /// (spec §4.D edge case). `power == 0` follows the configured policy
    /// (spec §9, Open Question 3).
    fn translate_vacuum_on(
        &self,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<(Vec<String>, Vec<Axis>, Option<(PositioningMode, std::collections::HashMap<Axis, f64>)>), TranslationError> {
        let power = params
            .get("vacuum_power")
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| TranslationError::MissingParameter("vacuum_power".to_string()))?;
        if power == 0.0 {
            if !self.config.vacuum_zero_is_off {
                return Err(TranslationError::ValidationFailed(vec![BoundsError::new(
                    "vacuum_power",
                    power,
                    "zero power is rejected by policy; use vacuum_off",
                )]));
            }
            return Ok((vec![self.templates.vacuum_off.render(&BTreeMap::new())?], vec![], None));
        }
        let pwm = power / 255.0;
        let render_params = BTreeMap::from([("power".to_string(), ParamValue::Number(pwm * 255.0))]);
        Ok((vec![self.templates.vacuum_on.render(&render_params)?], vec![], None))
    }

    fn translate_pwm_set(
        &self,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<(Vec<String>, Vec<Axis>, Option<(PositioningMode, std::collections::HashMap<Axis, f64>)>), TranslationError> {
        let power = params
            .get("power")
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| TranslationError::MissingParameter("power".to_string()))?;
        let pin = params
            .get("pin")
            .and_then(ParamValue::as_str)
            .ok_or_else(|| TranslationError::MissingParameter("pin".to_string()))?;
        let render_params = BTreeMap::from([
            ("pin".to_string(), ParamValue::Text(pin.to_string())),
            ("power".to_string(), ParamValue::Number(power)),
        ]);
        Ok((vec![self.templates.pwm_set.render(&render_params)?], vec![], None))
    }

    fn travel_and_descend(
        &self,
        prefix: &str,
        params: &BTreeMap<String, ParamValue>,
        safe_z: &str,
        target_z: &str,
        feedrate: f64,
    ) -> Result<Vec<String>, TranslationError> {
        let x = params.get(&format!("{prefix}x")).and_then(ParamValue::as_f64).unwrap_or(0.0);
        let y = params.get(&format!("{prefix}y")).and_then(ParamValue::as_f64).unwrap_or(0.0);
        let safe = params.get(safe_z).and_then(ParamValue::as_f64).unwrap_or(0.0);
        let target = params.get(target_z).and_then(ParamValue::as_f64).unwrap_or(0.0);
        let feedrate = ParamValue::Integer(feedrate.round() as i64);
        let travel_params = BTreeMap::from([
            ("x".to_string(), ParamValue::Number(x)),
            ("y".to_string(), ParamValue::Number(y)),
            ("z".to_string(), ParamValue::Number(safe)),
            ("feedrate".to_string(), feedrate.clone()),
        ]);
        let descend_params = BTreeMap::from([("z".to_string(), ParamValue::Number(target)), ("feedrate".to_string(), feedrate)]);
        Ok(vec![self.templates.travel.render(&travel_params)?, self.templates.move_z.render(&descend_params)?])
    }

    fn translate_pick(
        &self,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<(Vec<String>, Vec<Axis>, Option<(PositioningMode, std::collections::HashMap<Axis, f64>)>), TranslationError> {
        let feedrate = params.get("feedrate").and_then(ParamValue::as_f64).unwrap_or(1500.0);
        let mut commands = self.travel_and_descend("", params, "safe_height", "pick_height", feedrate)?;
        let vacuum_on_params = BTreeMap::from([("power".to_string(), ParamValue::Number(255.0))]);
        commands.push(self.templates.vacuum_on.render(&vacuum_on_params)?);
        Ok((commands, vec![], None))
    }

    fn translate_place(
        &self,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<(Vec<String>, Vec<Axis>, Option<(PositioningMode, std::collections::HashMap<Axis, f64>)>), TranslationError> {
        let feedrate = params.get("feedrate").and_then(ParamValue::as_f64).unwrap_or(1500.0);
        let mut commands = self.travel_and_descend("", params, "safe_height", "place_height", feedrate)?;
        commands.push(self.templates.vacuum_off.render(&BTreeMap::new())?);
        Ok((commands, vec![], None))
    }

    /// `pick_and_place` expands to a fixed sequence (spec §4.D edge case):
    /// move-to-pick-XY at safe height -> descend to pick-Z -> vacuum-on ->
    /// ascend to safe -> move-to-place-XY at safe -> descend to place-Z ->
    /// vacuum-off -> ascend to safe.
    fn translate_pick_and_place(
        &self,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<(Vec<String>, Vec<Axis>, Option<(PositioningMode, std::collections::HashMap<Axis, f64>)>), TranslationError> {
        let feedrate = params
            .get("feedrate")
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| TranslationError::MissingParameter("feedrate".to_string()))?;
        let safe = params
            .get("safe_height")
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| TranslationError::MissingParameter("safe_height".to_string()))?;
        let x = params.get("x").and_then(ParamValue::as_f64).ok_or_else(|| TranslationError::MissingParameter("x".into()))?;
        let y = params.get("y").and_then(ParamValue::as_f64).ok_or_else(|| TranslationError::MissingParameter("y".into()))?;
        let pick_z = params
            .get("pick_height")
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| TranslationError::MissingParameter("pick_height".into()))?;
        let place_x = params
            .get("place_x")
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| TranslationError::MissingParameter("place_x".into()))?;
        let place_y = params
            .get("place_y")
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| TranslationError::MissingParameter("place_y".into()))?;
        let place_z = params
            .get("place_height")
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| TranslationError::MissingParameter("place_height".into()))?;

        let f = ParamValue::Integer(feedrate.round() as i64);
        let xyz = |x: f64, y: f64, z: f64| BTreeMap::from([
            ("x".to_string(), ParamValue::Number(x)),
            ("y".to_string(), ParamValue::Number(y)),
            ("z".to_string(), ParamValue::Number(z)),
            ("feedrate".to_string(), f.clone()),
        ]);
        let z_only = |z: f64| BTreeMap::from([("z".to_string(), ParamValue::Number(z)), ("feedrate".to_string(), f.clone())]);
        let vacuum = |power: f64| BTreeMap::from([("power".to_string(), ParamValue::Number(power))]);

        let commands = vec![
            self.templates.travel.render(&xyz(x, y, safe))?,
            self.templates.move_z.render(&z_only(pick_z))?,
            self.templates.vacuum_on.render(&vacuum(255.0))?,
            self.templates.move_z.render(&z_only(safe))?,
            self.templates.travel.render(&xyz(place_x, place_y, safe))?,
            self.templates.move_z.render(&z_only(place_z))?,
            self.templates.vacuum_off.render(&BTreeMap::new())?,
            self.templates.move_z.render(&z_only(safe))?,
        ];
        Ok((commands, vec![], None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandRequest;

    fn translator() -> CommandTranslator {
        let mut validators = ValidatorRegistry::new();
        validators.register_range("feedrate", 0.0, 6000.0);
        CommandTranslator::new(validators, TranslatorConfig::default())
    }

    #[test]
    fn move_command_emits_expected_line_and_mutates_context() {
        let t = translator();
        let mut ctx = MotionContext::new();
        let req = CommandRequest::new(CommandKind::Move)
            .with("x", ParamValue::Number(100.0))
            .with("y", ParamValue::Number(50.0))
            .with("z", ParamValue::Number(10.0))
            .with("feedrate", ParamValue::Number(1500.0));
        let result = t.translate(&req, &mut ctx).unwrap();
        assert_eq!(result.commands, vec!["G0 X100.000 Y50.000 Z10.000 F1500"]);
        assert_eq!(ctx.get(Axis::X), 100.0);
        assert_eq!(ctx.get(Axis::Y), 50.0);
        assert_eq!(ctx.get(Axis::Z), 10.0);
    }

    #[test]
    fn relative_move_adds_to_existing_position() {
        let t = translator();
        let mut ctx = MotionContext::new();
        ctx.set(Axis::X, 10.0);
        ctx.set_mode(PositioningMode::Relative);
        // Translation always emits absolute targets per the fixed move
        // template; the context mutation mode mirrors the request, so a
        // caller driving relative motion supplies already-relative deltas
        // and the translator records them as deltas via apply_move.
        let req = CommandRequest::new(CommandKind::Move).with("x", ParamValue::Number(5.0)).with("feedrate", ParamValue::Number(1000.0));
        let _ = t.translate(&req, &mut ctx).unwrap();
        // apply_move was called in Absolute mode by translate_move (matching the
        // literal low-level command emitted), so position is written directly.
        assert_eq!(ctx.get(Axis::X), 5.0);
    }

    #[test]
    fn rejection_leaves_context_untouched() {
        let t = translator();
        let mut ctx = MotionContext::new();
        let before = ctx.snapshot();
        let req = CommandRequest::new(CommandKind::Move)
            .with("x", ParamValue::Number(100.0))
            .with("feedrate", ParamValue::Number(999999.0));
        let err = t.translate(&req, &mut ctx).unwrap_err();
        assert!(matches!(err, TranslationError::ValidationFailed(_)));
        assert_eq!(before, ctx.snapshot());
    }

    #[test]
    fn pick_and_place_sequence_is_ordered_as_specified() {
        let t = translator();
        let mut ctx = MotionContext::new();
        let req = CommandRequest::new(CommandKind::PickAndPlace)
            .with("x", ParamValue::Number(100.0))
            .with("y", ParamValue::Number(50.0))
            .with("place_x", ParamValue::Number(200.0))
            .with("place_y", ParamValue::Number(150.0))
            .with("pick_height", ParamValue::Number(5.0))
            .with("place_height", ParamValue::Number(2.0))
            .with("safe_height", ParamValue::Number(10.0))
            .with("feedrate", ParamValue::Number(1200.0))
            .with("vacuum_power", ParamValue::Number(255.0));
        let result = t.translate(&req, &mut ctx).unwrap();
        assert_eq!(result.commands.len(), 8);
        assert!(result.commands[0].starts_with("G0 X100.000 Y50.000"));
        assert!(result.commands[2].contains("M106 S255"));
        assert!(result.commands[6].contains("M106 S0"));
    }

    #[test]
    fn home_reports_all_axes_by_default() {
        let t = translator();
        let mut ctx = MotionContext::new();
        let req = CommandRequest::new(CommandKind::Home);
        let result = t.translate(&req, &mut ctx).unwrap();
        assert_eq!(result.axes_to_mark_homed, Axis::ALL.to_vec());
        assert_eq!(result.commands, vec!["G28 XYZ"]);
    }

    #[test]
    fn vacuum_on_converts_power_to_pwm_fraction() {
        let t = translator();
        let mut ctx = MotionContext::new();
        let req = CommandRequest::new(CommandKind::VacuumOn).with("vacuum_power", ParamValue::Number(255.0));
        let result = t.translate(&req, &mut ctx).unwrap();
        assert_eq!(result.commands, vec!["M106 S255.000"]);
    }

    #[test]
    fn vacuum_on_with_zero_power_forwards_as_vacuum_off_when_policy_allows() {
        let t = translator();
        let mut ctx = MotionContext::new();
        let req = CommandRequest::new(CommandKind::VacuumOn).with("vacuum_power", ParamValue::Number(0.0));
        let result = t.translate(&req, &mut ctx).unwrap();
        assert_eq!(result.commands, vec!["M106 S0"]);
    }

    #[test]
    fn vacuum_on_with_zero_power_is_rejected_when_policy_forbids_it() {
        let mut validators = ValidatorRegistry::new();
        validators.register_range("feedrate", 0.0, 6000.0);
        let t = CommandTranslator::new(validators, TranslatorConfig { vacuum_zero_is_off: false });
        let mut ctx = MotionContext::new();
        let req = CommandRequest::new(CommandKind::VacuumOn).with("vacuum_power", ParamValue::Number(0.0));
        let err = t.translate(&req, &mut ctx).unwrap_err();
        assert!(matches!(err, TranslationError::ValidationFailed(_)));
    }

    #[test]
    fn unknown_kind_never_reaches_translator_is_not_representable() {
        // CommandKind is a closed enum; there is no "unknown" variant to
        // construct here. Unknown-kind handling is exercised at the parse
        // boundary in `command::tests::unknown_kind_parses_to_none`.
    }
}
