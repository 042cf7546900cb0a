//! Command translation, parameter validation, and safety enforcement for the
//! pick-and-place gateway's request-processing pipeline.

pub mod command;
pub mod error;
pub mod motion;
pub mod safety;
pub mod template;
pub mod translator;
pub mod validators;

pub use command::{CommandKind, CommandRequest, ParamValue};
pub use error::GatewayError;
pub use motion::{Axis, MotionContext, PositioningMode, Units};
pub use safety::{HomedAxes, SafetyLimits, SafetyManager};
pub use template::Template;
pub use translator::{CommandTranslator, TranslationError, TranslationResult, TranslatorConfig};
pub use validators::ValidatorRegistry;
