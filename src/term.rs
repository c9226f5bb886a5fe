//! Terminal capability checks.

use std::io::IsTerminal;

fn env_flag(name: &str) -> bool {
    std::env::var_os(name).is_some_and(|v| !v.is_empty())
}

/// Honors `FORCE_COLOR` and `NO_COLOR`; otherwise color only on a terminal.
pub fn should_use_color<T: IsTerminal>(stream: &T) -> bool {
    env_flag("FORCE_COLOR") || (stream.is_terminal() && !env_flag("NO_COLOR"))
}
