//! Host package manager detection.

use super::PackageManager;
use crate::util::process::find_executable;

const OS_RELEASE: &str = "/etc/os-release";

/// Distribution IDs from os-release text: `ID` first, then each `ID_LIKE` entry.
pub fn parse_os_release(text: &str) -> Vec<String> {
    let mut id = Vec::new();
    let mut like = Vec::new();

    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key {
            "ID" => id.push(value.to_ascii_lowercase()),
            "ID_LIKE" => like.extend(value.split_whitespace().map(|v| v.to_ascii_lowercase())),
            _ => {}
        }
    }

    id.extend(like);
    id
}

/// First manager in priority order that serves one of `ids`.
pub(super) fn manager_for_distribution(ids: &[String]) -> Option<PackageManager> {
    PackageManager::PRIORITY
        .into_iter()
        .find(|m| ids.iter().any(|id| m.distributions().contains(&id.as_str())))
}

pub(super) fn detect_host() -> Option<PackageManager> {
    if let Ok(text) = std::fs::read_to_string(OS_RELEASE) {
        let ids = parse_os_release(&text);
        if let Some(manager) = manager_for_distribution(&ids) {
            tracing::debug!("detected {} from {} ({})", manager, OS_RELEASE, ids.join(", "));
            return Some(manager);
        }
    }

    let found = PackageManager::PRIORITY
        .into_iter()
        .find(|m| find_executable(m.install_program()).is_some());
    if let Some(manager) = found {
        tracing::debug!("detected {} on PATH", manager);
    }
    found
}
