//! Factory patches bundled with the library.
//!
//! The TOML files under `presets/` are embedded at compile time, so these
//! patches are always available without touching the filesystem.

use crate::SynthConfig;

/// Factory patch identifiers, in listing order.
pub static FACTORY_PRESET_NAMES: &[&str] = &[
    "init",
    "glass_bells",
    "nineteen_drift",
    "burst_cloud",
    "just_pentatonic",
];

static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("init", include_str!("../presets/init.toml")),
    ("glass_bells", include_str!("../presets/glass_bells.toml")),
    ("nineteen_drift", include_str!("../presets/nineteen_drift.toml")),
    ("burst_cloud", include_str!("../presets/burst_cloud.toml")),
    ("just_pentatonic", include_str!("../presets/just_pentatonic.toml")),
];

/// Every factory patch, in listing order.
///
/// # Example
///
/// ```rust
/// use sinefield_config::factory_presets;
///
/// for patch in factory_presets() {
///     println!("{}: {}", patch.name, patch.description.as_deref().unwrap_or(""));
/// }
/// ```
pub fn factory_presets() -> Vec<SynthConfig> {
    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(_, toml)| SynthConfig::from_toml_str(toml).ok())
        .collect()
}

/// Look up a factory patch by identifier or display name, ignoring case.
pub fn get_factory_preset(name: &str) -> Option<SynthConfig> {
    let wanted = name.to_lowercase().replace(' ', "_");
    FACTORY_PRESETS_TOML
        .iter()
        .find(|(id, _)| *id == wanted)
        .and_then(|(_, toml)| SynthConfig::from_toml_str(toml).ok())
}

/// Whether `name` identifies a factory patch.
pub fn is_factory_preset(name: &str) -> bool {
    get_factory_preset(name).is_some()
}
