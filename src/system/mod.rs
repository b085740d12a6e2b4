//! System requirements validation.
//!
//! This module provides functions to check that the host can actually run
//! tunnel namespaces before any kernel state is created.

mod requirements;

pub use requirements::{
    Escalation, SystemRequirements, check_all, check_escalation, check_netns, check_tool,
};
