/// File evaluated in every directory pulled in with `knit.subdir`.
pub const DEFINITIONS_FILE: &str = "knit.lua";

/// Oldest Ninja that understands everything the writer emits (implicit
/// outputs need 1.7).
pub const NINJA_REQUIRED_VERSION: &str = "1.7.0";

/// Default name of the generated file.
pub const NINJA_FILE: &str = "build.ninja";
