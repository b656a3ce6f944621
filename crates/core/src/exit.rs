// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process exit contract between the host and the agent.

/// How the agent should leave the process on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitType {
    /// Exit immediately, skipping orderly teardown.
    Quick = 1,
    /// Unwind subsystems before exiting.
    Normal = 2,
}

impl ExitType {
    /// Decode the wire value; unknown values read as `None`.
    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Quick),
            2 => Some(Self::Normal),
            _ => None,
        }
    }
}

/// Host-visible exit codes, sequential from 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Disassociation = 100,
    OptoutActivationToAnonymous = 101,
    OptoutAnonymousToActivation = 102,
    WipeData = 103,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_type_decodes_known_values() {
        assert_eq!(ExitType::from_wire(1), Some(ExitType::Quick));
        assert_eq!(ExitType::from_wire(2), Some(ExitType::Normal));
        assert_eq!(ExitType::from_wire(3), None);
    }

    #[test]
    fn exit_codes_are_sequential_from_100() {
        assert_eq!(ExitCode::Disassociation.code(), 100);
        assert_eq!(ExitCode::OptoutActivationToAnonymous.code(), 101);
        assert_eq!(ExitCode::OptoutAnonymousToActivation.code(), 102);
        assert_eq!(ExitCode::WipeData.code(), 103);
    }
}
