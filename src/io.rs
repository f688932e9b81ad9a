use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::layout::MemoryLayout;
use crate::vm_manager::VmManager;

/// Initial state of a simulation, read from a setup file.
///
/// The file has three lines, ignoring blank lines and `#` comments:
///
/// ```text
/// 64 8              # virtual memory KB, page KB
/// 0 0 2 1 4 2 6 3   # present pages as (virtual page, frame) pairs
/// 0 2 4 6           # arrival order, oldest first
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SetupData {
    pub virtual_mem_kb: u32,
    pub page_kb: u32,
    pub mappings: Vec<(u64, u64)>,
    pub arrival_order: Vec<u64>,
}

impl SetupData {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let lines: Vec<(usize, &str)> = content
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.split('#').next().unwrap_or("").trim()))
            .filter(|(_, line)| !line.is_empty())
            .collect();

        if lines.is_empty() {
            return Err(Error::Parse {
                line: 0,
                reason: "Setup file is empty".to_string(),
            });
        }
        if lines.len() != 3 {
            return Err(Error::Parse {
                line: lines[lines.len() - 1].0,
                reason: format!(
                    "Expected 3 lines (sizes, mappings, arrival order), got {}",
                    lines.len()
                ),
            });
        }

        let (virtual_mem_kb, page_kb) = Self::parse_sizes_line(lines[0])?;
        let mappings = Self::parse_mapping_line(lines[1])?;
        let arrival_order = parse_numbers(lines[2], "page number")?;

        Ok(SetupData {
            virtual_mem_kb,
            page_kb,
            mappings,
            arrival_order,
        })
    }

    fn parse_sizes_line((line, text): (usize, &str)) -> Result<(u32, u32)> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() != 2 {
            return Err(Error::Parse {
                line,
                reason: format!("Sizes line has {} tokens, expected 2", tokens.len()),
            });
        }
        let virtual_mem_kb: u32 = tokens[0].parse().map_err(|_| Error::Parse {
            line,
            reason: format!("Invalid virtual memory size: {}", tokens[0]),
        })?;
        let page_kb: u32 = tokens[1].parse().map_err(|_| Error::Parse {
            line,
            reason: format!("Invalid page size: {}", tokens[1]),
        })?;
        Ok((virtual_mem_kb, page_kb))
    }

    fn parse_mapping_line(entry: (usize, &str)) -> Result<Vec<(u64, u64)>> {
        let numbers = parse_numbers(entry, "page or frame number")?;
        if numbers.len() % 2 != 0 {
            return Err(Error::Parse {
                line: entry.0,
                reason: format!("Mapping line has {} tokens, expected pairs", numbers.len()),
            });
        }
        Ok(numbers.chunks(2).map(|pair| (pair[0], pair[1])).collect())
    }

    /// Replay the setup through a session waiting for configuration, leaving
    /// it ready to convert addresses.
    pub fn apply(&self, vm: &mut VmManager) -> Result<MemoryLayout> {
        let layout = vm.configure(self.virtual_mem_kb, self.page_kb)?;

        for &(page, _) in &self.mappings {
            vm.set_present(page, true)?;
        }
        vm.commit_present()?;

        for &(page, frame) in &self.mappings {
            vm.set_physical_index(page, frame)?;
        }
        vm.commit_physical()?;

        for &page in &self.arrival_order {
            vm.enqueue(page)?;
        }
        vm.commit_queue()?;

        Ok(layout)
    }
}

fn parse_numbers((line, text): (usize, &str), what: &str) -> Result<Vec<u64>> {
    text.split_whitespace()
        .map(|token| {
            token.parse::<u64>().map_err(|_| Error::Parse {
                line,
                reason: format!("Invalid {}: {}", what, token),
            })
        })
        .collect()
}

/// Hex addresses to convert, separated by whitespace
pub fn read_addresses<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.split_whitespace().map(str::to_string).collect())
}

/// Write one result per line
pub fn write_results<P: AsRef<Path>>(path: P, results: &[String]) -> Result<()> {
    let mut content = results.join("\n");
    content.push('\n');
    fs::write(path.as_ref(), content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::vm_manager::Phase;

    const DEFAULT_SETUP: &str = "\
# 64 KB virtual memory with 8 KB pages
64 8
0 0  2 1  4 2  6 3
0 2 4 6
";

    #[test]
    fn test_parse_setup() {
        let setup = SetupData::parse(DEFAULT_SETUP).unwrap();
        assert_eq!(setup.virtual_mem_kb, 64);
        assert_eq!(setup.page_kb, 8);
        assert_eq!(setup.mappings, vec![(0, 0), (2, 1), (4, 2), (6, 3)]);
        assert_eq!(setup.arrival_order, vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_parse_inline_comments_and_blank_lines() {
        let content = "16 8   # two pages\n\n1 0\n\n1  # only page\n";
        let setup = SetupData::parse(content).unwrap();
        assert_eq!(setup.mappings, vec![(1, 0)]);
        assert_eq!(setup.arrival_order, vec![1]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(SetupData::parse(""), Err(Error::Parse { line: 0, .. })));
        assert!(matches!(
            SetupData::parse("64 8\n0 0 2 1 4 2 6 3\n"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            SetupData::parse("64\n0 0\n0\n"),
            Err(Error::Parse { line: 1, .. })
        ));
        // odd number of mapping tokens
        assert!(matches!(
            SetupData::parse("64 8\n0 0 2\n0\n"),
            Err(Error::Parse { line: 2, .. })
        ));
        assert!(matches!(
            SetupData::parse("64 8\n0 0\nzero\n"),
            Err(Error::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_apply_reaches_conversion() {
        let setup = SetupData::parse(DEFAULT_SETUP).unwrap();
        let mut vm = VmManager::new();
        let layout = setup.apply(&mut vm).unwrap();

        assert_eq!(layout.index_bits(), 3);
        assert_eq!(vm.phase(), Phase::Converting);
        assert_eq!(vm.queue().unwrap().to_vec(), vec![0, 2, 4, 6]);
        assert_eq!(vm.table().unwrap().find(4).unwrap().physical_index, 2);
    }

    #[test]
    fn test_apply_stops_at_invalid_step() {
        // three present pages for four frames
        let setup = SetupData::parse("64 8\n0 0 2 1 4 2\n0 2 4\n").unwrap();
        let mut vm = VmManager::new();
        assert!(matches!(
            setup.apply(&mut vm),
            Err(Error::Validation(ValidationError::PresentCountMismatch { .. }))
        ));
        assert_eq!(vm.phase(), Phase::PresentBitsSet);
    }

    #[test]
    fn test_read_missing_file() {
        let result = SetupData::from_file("/nonexistent/setup.txt");
        assert!(matches!(result, Err(Error::Read { .. })));
    }
}
