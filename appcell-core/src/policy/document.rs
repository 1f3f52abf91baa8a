/*
 * appcell-core
 *
 * Copyright (C) 2023-2024 Xavier Moffett <sapphirus@azorium.net>
 * SPDX-License-Identifier: GPL-3.0-only
 *
 * This library is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use indexmap::IndexMap;

/// A minimal key-value document reader/writer for the `[Group]` / `key=value` grammar used by
/// the policy metadata format (§6). This is deliberately not layered on `serde_yaml` or any
/// other general-purpose format; the shape is closer to a stripped-down desktop-entry/INI file
/// than to structured data.
#[derive(Debug, Default, Clone)]
pub struct Document {
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let mut doc = Self::new();
        let mut section = String::new();

        for line in text.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = name.to_string();
                doc.sections.entry(section.clone()).or_default();
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                doc.sections.entry(section.clone()).or_default().insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        doc
    }

    pub fn section(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.sections.get(name)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(|s| s.as_str())
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections.entry(section.to_string()).or_default().insert(key.to_string(), value.into());
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        for (section, entries) in &self.sections {
            if entries.is_empty() {
                continue;
            }

            out.push('[');
            out.push_str(section);
            out.push_str("]\n");

            for (key, value) in entries {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }

            out.push('\n');
        }

        out
    }
}

/// Splits a comma-separated list value, trimming whitespace and dropping empty entries.
pub fn split_list(value: &str) -> Vec<&str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// An entry from a comma-separated list, with its leading-`!` negation stripped off.
pub fn negated(entry: &str) -> (bool, &str) {
    match entry.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_groups_and_keys() {
        let doc = Document::parse("[Context]\nshared=network,!ipc\n\n[Environment]\nFOO=bar\n");

        assert_eq!(doc.get("Context", "shared"), Some("network,!ipc"));
        assert_eq!(doc.get("Environment", "FOO"), Some("bar"));
    }

    #[test]
    fn negation_and_list_splitting() {
        let items = split_list("network, !ipc ,dri");
        assert_eq!(items, vec!["network", "!ipc", "dri"]);
        assert_eq!(negated("!ipc"), (true, "ipc"));
        assert_eq!(negated("dri"), (false, "dri"));
    }

    #[test]
    fn render_round_trips_through_parse() {
        let mut doc = Document::new();
        doc.set("Context", "shared", "network");

        let rendered = doc.render();
        let reparsed = Document::parse(&rendered);

        assert_eq!(reparsed.get("Context", "shared"), Some("network"));
    }
}
