//! casegen Standard Library

mod helpers;
pub mod string;
pub mod math;

use casegen_plugin::FunctionRegistry;

/// Load standard library into registry
pub fn load_standard_library(registry: FunctionRegistry) -> FunctionRegistry {
    registry
        // str
        .with_function(string::Upper)
        .with_function(string::Lower)
        .with_function(string::Capitalize)
        .with_function(string::Trim)
        .with_function(string::Replace)
        .with_function(string::Repeat)
        .with_function(string::Len)
        .with_function(string::Concat)
        .with_function(string::Join)
        .with_function(string::PadLeft)
        .with_function(string::PadRight)
        // math
        .with_function(math::Abs)
        .with_function(math::Min)
        .with_function(math::Max)
        .with_function(math::Pow)
        .with_function(math::Floor)
        .with_function(math::Ceil)
        .with_function(math::Round)
}

/// Create registry with standard library
pub fn standard_registry() -> FunctionRegistry {
    load_standard_library(FunctionRegistry::new())
}
