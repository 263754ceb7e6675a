//! The replay buffer.
//!
//! When the `replay` overlay is set, the driver records a snapshot per
//! observed phase (token/C++ text for the text phases, a JSON tree dump for
//! the rest) and persists them to `replay.txt` after the run.

use std::io;
use std::path::Path;

use crate::Phase;

/// Ordered `(phase, payload)` snapshots of one compilation.
#[derive(Debug, Default)]
pub struct ReplayBuffer {
    entries: Vec<(Phase, String)>,
}

impl ReplayBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one phase snapshot.
    pub fn record(&mut self, phase: Phase, payload: impl Into<String>) {
        self.entries.push((phase, payload.into()));
    }

    /// The recorded snapshots, in order.
    pub fn entries(&self) -> &[(Phase, String)] {
        &self.entries
    }

    /// Render the buffer in `replay.txt` format: a phase header line, the
    /// payload, and a blank separator per entry.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (phase, payload) in &self.entries {
            out.push_str("=== ");
            out.push_str(phase.as_str());
            out.push_str(" ===\n");
            out.push_str(payload);
            if !payload.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    /// Write the rendered buffer to disk.
    pub fn persist(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.render())
    }
}
