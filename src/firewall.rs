//! Best-effort firewall disabling on test hosts.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use crate::host::{Host, RemoteCommand};

/// What it takes to open up a given platform's firewall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirewallAction {
    /// Flush all iptables rules.
    FlushIptables,
    /// Stop a firewall service through the configuration tool.
    StopService(&'static str),
}

impl FirewallAction {
    pub fn command(&self) -> RemoteCommand {
        match self {
            Self::FlushIptables => RemoteCommand::new("iptables", ["-F"]),
            Self::StopService(service) => RemoteCommand::new(
                "puppet",
                ["resource", "service", *service, "ensure=stopped"],
            ),
        }
    }
}

// Order matters: el-7 must be seen before the generic el rule.
static FIREWALL_RULES: LazyLock<Vec<(Regex, FirewallAction)>> = LazyLock::new(|| {
    [
        ("debian", FirewallAction::FlushIptables),
        ("fedora|el-7", FirewallAction::StopService("firewalld")),
        ("el|centos", FirewallAction::StopService("iptables")),
        ("ubuntu", FirewallAction::StopService("ufw")),
    ]
    .into_iter()
    .map(|(pattern, action)| {
        (Regex::new(pattern).expect("firewall patterns are valid"), action)
    })
    .collect()
});

/// Picks the firewall action for a platform string, if one is known.
pub fn firewall_action(platform: &str) -> Option<FirewallAction> {
    FIREWALL_RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(platform))
        .map(|(_, action)| action.clone())
}

/// Disables the firewall on `host`.
///
/// Unknown platforms are logged and skipped; a failing remote command is an error.
pub fn stop_firewall(host: &dyn Host) -> Result<()> {
    let Some(action) = firewall_action(host.platform()) else {
        info!("Not sure how to clear firewall on {}", host.platform());
        return Ok(());
    };
    let command = action.command();
    info!(host = host.name(), "disabling firewall: {}", command);
    host.exec(&command)
        .with_context(|| format!("failed to disable firewall on {}", host.name()))
}
