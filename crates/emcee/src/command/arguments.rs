pub mod argument;
pub mod runner;
pub mod types;

pub use self::argument::{
    Argument, ArgumentOptions, DefaultArgumentOptions, DefaultValue, FailureData,
    OtherwiseContent, PromptContent, PromptData, PromptOptions,
};
pub use self::runner::{
    ArgumentRunner, ArgumentSequence, DeclaredSequence, RunnerState, SequenceStep,
};
pub use self::types::{
    cast_type, compose, range, tagged, tagged_union, tagged_with_input, union, validate,
    with_input, ArgumentMatch, ArgumentType, Cast, CastContext, TypeCaster, TypeRegistry,
    Unordered,
};
