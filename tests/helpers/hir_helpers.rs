//! Helpers for setting up analysis hosts and locating positions in source.

use typefront::TextSize;
use typefront::hir::{SemanticChain, SymbolId};
use typefront::ide::AnalysisHost;

/// Path used for single-unit hosts.
pub const TEST_PATH: &str = "test.ts";

/// Creates an AnalysisHost with a single unit at [`TEST_PATH`].
pub fn host_from_source(source: &str) -> AnalysisHost {
    host_from_sources(&[(TEST_PATH, source)])
}

/// Creates an AnalysisHost with multiple units, added in order.
pub fn host_from_sources(files: &[(&str, &str)]) -> AnalysisHost {
    let mut host = AnalysisHost::new();
    for (path, content) in files {
        host.add_unit(path, content)
            .unwrap_or_else(|err| panic!("failed to add '{}': {}", path, err));
    }
    host
}

/// Offset of the first occurrence of `needle`.
pub fn offset_of(text: &str, needle: &str) -> TextSize {
    let index = text
        .find(needle)
        .unwrap_or_else(|| panic!("'{}' not found in source", needle));
    TextSize::from(index as u32)
}

/// Offset of the last occurrence of `needle`.
pub fn offset_of_last(text: &str, needle: &str) -> TextSize {
    let index = text
        .rfind(needle)
        .unwrap_or_else(|| panic!("'{}' not found in source", needle));
    TextSize::from(index as u32)
}

/// Symbol declared at global scope under `name`.
pub fn global_symbol(chain: &SemanticChain, name: &str) -> SymbolId {
    chain
        .symbols()
        .member(chain.global(), name)
        .unwrap_or_else(|| panic!("no global symbol '{}'", name))
}
