//! Command registry mapping wire command names to reference sources.
//!
//! Built once at startup and never mutated afterward, so concurrent
//! lookups from connection handlers need no locking.

use crate::spectrum::Source;
use std::collections::HashMap;

/// Immutable table of recognized commands.
pub struct CommandRegistry {
    entries: HashMap<&'static str, Source>,
}

impl CommandRegistry {
    /// Build the registry with the fixed command set. Names are matched
    /// exactly (case- and space-sensitive).
    pub fn new() -> Self {
        let entries = HashMap::from([
            ("Dark Reference", Source::DarkReference),
            ("White Reference", Source::WhiteReference),
            ("Attenuated White Reference", Source::AttenuatedWhiteReference),
            ("Mercury Reference", Source::MercuryReference),
            ("Neon Reference", Source::NeonReference),
            ("Aiming Beam", Source::AimingBeam),
        ]);
        CommandRegistry { entries }
    }

    /// Look up a command name, returning the source it maps to.
    pub fn lookup(&self, name: &str) -> Option<Source> {
        self.entries.get(name).copied()
    }

    /// Iterate over registered command names (for startup logging).
    pub fn commands(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
