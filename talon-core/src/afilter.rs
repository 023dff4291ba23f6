//! # Audio Filter Chain
//!
//! Named filter instances in processing order, edited at runtime by the
//! `af_*` commands. The audio pipeline (out of scope) rebuilds its
//! processing graph whenever `needs_reinit` is raised.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfInstance {
    pub name: String,
    /// Raw argument string after `name=`, filter-specific syntax.
    pub args: Option<String>,
}

impl AfInstance {
    /// Parse one `name` or `name=args` spec.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }
        let (name, args) = match spec.split_once('=') {
            Some((name, args)) => (name, Some(args.to_string())),
            None => (spec, None),
        };
        Some(Self {
            name: name.to_string(),
            args,
        })
    }

    pub fn display(&self) -> String {
        match &self.args {
            Some(args) => format!("{}={}", self.name, args),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AfChain {
    filters: Vec<AfInstance>,
    /// Raised on every edit; the audio pipeline clears it after rebuilding.
    pub needs_reinit: bool,
}

impl AfChain {
    pub fn filters(&self) -> &[AfInstance] {
        &self.filters
    }

    pub fn get(&self, name: &str) -> Option<&AfInstance> {
        self.filters.iter().find(|f| f.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AfInstance> {
        self.filters.iter_mut().find(|f| f.name == name)
    }

    /// Append filters from a comma-separated spec list. Returns how many
    /// parsed; malformed pieces are skipped.
    pub fn add_spec(&mut self, specs: &str) -> usize {
        let mut added = 0;
        for spec in specs.split(',') {
            if let Some(instance) = AfInstance::parse(spec) {
                self.filters.push(instance);
                added += 1;
            }
        }
        if added > 0 {
            self.needs_reinit = true;
        }
        added
    }

    /// Remove every filter named in the comma-separated list.
    pub fn remove_spec(&mut self, specs: &str) {
        for spec in specs.split(',') {
            let name = spec.trim().split('=').next().unwrap_or("");
            if name.is_empty() {
                continue;
            }
            let before = self.filters.len();
            self.filters.retain(|f| f.name != name);
            if self.filters.len() != before {
                self.needs_reinit = true;
            }
        }
    }

    pub fn clear(&mut self) {
        if !self.filters.is_empty() {
            self.filters.clear();
        }
        self.needs_reinit = true;
    }

    /// Replace a running filter's argument string.
    pub fn command_line(&mut self, name: &str, args: &str) -> bool {
        match self.get_mut(name) {
            Some(filter) => {
                filter.args = Some(args.to_string());
                self.needs_reinit = true;
                true
            }
            None => false,
        }
    }

    pub fn display_chain(&self) -> String {
        self.filters
            .iter()
            .map(AfInstance::display)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_display() {
        let mut chain = AfChain::default();
        assert_eq!(chain.add_spec("volume=10,resample=48000"), 2);
        assert_eq!(chain.display_chain(), "volume=10,resample=48000");
        assert!(chain.needs_reinit);
    }

    #[test]
    fn test_remove_by_name() {
        let mut chain = AfChain::default();
        chain.add_spec("volume=10,resample=48000,pan");
        chain.remove_spec("resample");
        assert_eq!(chain.display_chain(), "volume=10,pan");
    }

    #[test]
    fn test_command_line_unknown_filter() {
        let mut chain = AfChain::default();
        chain.add_spec("volume");
        assert!(chain.command_line("volume", "20"));
        assert!(!chain.command_line("echo", "0.5"));
        assert_eq!(chain.get("volume").unwrap().args.as_deref(), Some("20"));
    }
}
