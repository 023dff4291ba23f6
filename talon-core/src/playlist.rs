//! # Playlist
//!
//! Ordered list of entries with one current position. Commands append,
//! replace, clear and step through it; the play loop reacts to the stop
//! reason the dispatcher sets.
//!
//! Supports loading M3U playlists (header + `#EXTINF` titles) and plain
//! one-path-per-line lists.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub path: String,
    pub title: Option<String>,
}

impl PlaylistEntry {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            title: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Playlist {
    pub entries: Vec<PlaylistEntry>,
    /// Index of the playing entry; None when nothing was started yet or the
    /// current entry was removed under us.
    pub current: Option<usize>,
    /// The current entry was replaced while playing; stepping "back to the
    /// current entry" must not resurrect it.
    pub current_was_replaced: bool,
}

impl Playlist {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, entry: PlaylistEntry) {
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
        self.current_was_replaced = false;
    }

    pub fn current_entry(&self) -> Option<&PlaylistEntry> {
        self.current.and_then(|i| self.entries.get(i))
    }

    /// Index of the neighbour in `direction` (+1/-1), if any.
    pub fn next_index(&self, direction: i64) -> Option<usize> {
        match self.current {
            Some(cur) => {
                let next = cur as i64 + direction.signum();
                if next < 0 || next as usize >= self.entries.len() {
                    None
                } else {
                    Some(next as usize)
                }
            }
            None if !self.entries.is_empty() => Some(0),
            None => None,
        }
    }

    /// Drop every entry except the one currently playing.
    pub fn clear_except_current(&mut self) {
        if self.current_was_replaced {
            self.current = None;
        }
        match self.current {
            Some(cur) if cur < self.entries.len() => {
                let kept = self.entries.swap_remove(cur);
                self.entries.clear();
                self.entries.push(kept);
                self.current = Some(0);
            }
            _ => {
                self.entries.clear();
                self.current = None;
            }
        }
    }

    /// Append entries parsed from a playlist file.
    pub fn load_file(&mut self, path: &str) -> Result<usize, String> {
        let entries = parse_file(path)?;
        let count = entries.len();
        self.entries.extend(entries);
        Ok(count)
    }
}

/// Parse a playlist file, M3U or plain list by sniffing.
pub fn parse_file(path: &str) -> Result<Vec<PlaylistEntry>, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read playlist: {}", e))?;
    if looks_like_m3u(path, &content) {
        parse_m3u(&content)
    } else {
        Ok(parse_plain(&content))
    }
}

fn looks_like_m3u(path: &str, content: &str) -> bool {
    let by_ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("m3u") || e.eq_ignore_ascii_case("m3u8"))
        .unwrap_or(false);
    by_ext || content.trim_start().starts_with("#EXTM3U")
}

// ============================================================================
// M3U Parser
// ============================================================================

pub fn parse_m3u(content: &str) -> Result<Vec<PlaylistEntry>, String> {
    let mut entries = Vec::new();
    let mut lines = content.lines();

    // Check for #EXTM3U header
    if let Some(first) = lines.next() {
        if !first.trim().starts_with("#EXTM3U") {
            return Err("Invalid M3U file: missing #EXTM3U header".to_string());
        }
    }

    let mut current_title: Option<String> = None;

    for line in lines {
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(extinf) = line.strip_prefix("#EXTINF:") {
            // Format: #EXTINF:duration[,Title]
            current_title = extinf
                .split_once(',')
                .map(|(_, title)| title.trim().to_string())
                .filter(|t| !t.is_empty());
        } else if !line.starts_with('#') {
            entries.push(PlaylistEntry {
                path: line.to_string(),
                title: current_title.take(),
            });
        }
    }

    Ok(entries)
}

fn parse_plain(content: &str) -> Vec<PlaylistEntry> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(PlaylistEntry::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_m3u_titles() {
        let content = "#EXTM3U\n#EXTINF:120,First Film\n/a/first.mkv\n/b/untitled.mp4\n";
        let entries = parse_m3u(content).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title.as_deref(), Some("First Film"));
        assert_eq!(entries[1].title, None);
        assert_eq!(entries[1].path, "/b/untitled.mp4");
    }

    #[test]
    fn test_parse_m3u_requires_header() {
        assert!(parse_m3u("/a/first.mkv\n").is_err());
    }

    #[test]
    fn test_next_index_bounds() {
        let mut pl = Playlist::default();
        pl.add(PlaylistEntry::new("a"));
        pl.add(PlaylistEntry::new("b"));
        assert_eq!(pl.next_index(1), Some(0));
        pl.current = Some(1);
        assert_eq!(pl.next_index(1), None);
        assert_eq!(pl.next_index(-1), Some(0));
    }

    #[test]
    fn test_clear_except_current() {
        let mut pl = Playlist::default();
        pl.add(PlaylistEntry::new("a"));
        pl.add(PlaylistEntry::new("b"));
        pl.add(PlaylistEntry::new("c"));
        pl.current = Some(1);
        pl.clear_except_current();
        assert_eq!(pl.len(), 1);
        assert_eq!(pl.entries[0].path, "b");
        assert_eq!(pl.current, Some(0));
    }
}
