//! Mapping tables between a physical source file and one virtual code.
//!
//! A [`Mapping`] records parallel `(source offset, generated offset, length)`
//! triples sharing one set of [`CodeInformation`] flags. [`SourceMap`] indexes
//! every triple in both coordinate spaces so lookups do not scan the table.
//!
//! Span ends are inclusive for lookups: a cursor sitting right after the last
//! mapped byte still maps, and zero-length spans map their single offset.

use rust_lapper::{Interval, Lapper};
use serde::Serialize;

/// Capabilities a mapped span grants to tooling running on the virtual code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CodeInformation {
    pub verification: bool,
    pub completion: bool,
    pub semantic: bool,
    pub navigation: bool,
    pub structure: bool,
    pub format: bool,
}

impl CodeInformation {
    pub const fn all() -> Self {
        Self {
            verification: true,
            completion: true,
            semantic: true,
            navigation: true,
            structure: true,
            format: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            verification: false,
            completion: false,
            semantic: false,
            navigation: false,
            structure: false,
            format: false,
        }
    }

    /// Flags for literals copied into synthetic declarations.
    pub const fn navigation_and_semantic() -> Self {
        Self {
            semantic: true,
            navigation: true,
            ..Self::none()
        }
    }

    /// Flags granted by both `self` and `other`.
    pub fn intersect(self, other: CodeInformation) -> CodeInformation {
        CodeInformation {
            verification: self.verification && other.verification,
            completion: self.completion && other.completion,
            semantic: self.semantic && other.semantic,
            navigation: self.navigation && other.navigation,
            structure: self.structure && other.structure,
            format: self.format && other.format,
        }
    }

    /// Flags granted by either `self` or `other`.
    pub fn union(self, other: CodeInformation) -> CodeInformation {
        CodeInformation {
            verification: self.verification || other.verification,
            completion: self.completion || other.completion,
            semantic: self.semantic || other.semantic,
            navigation: self.navigation || other.navigation,
            structure: self.structure || other.structure,
            format: self.format || other.format,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::none()
    }
}

/// One mapping entry. All offset vectors have the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub source_offsets: Vec<usize>,
    pub generated_offsets: Vec<usize>,
    pub lengths: Vec<usize>,
    pub data: CodeInformation,
}

impl Mapping {
    /// A mapping entry with a single span.
    pub fn span(
        source_offset: usize,
        generated_offset: usize,
        length: usize,
        data: CodeInformation,
    ) -> Self {
        Self {
            source_offsets: vec![source_offset],
            generated_offsets: vec![generated_offset],
            lengths: vec![length],
            data,
        }
    }

    /// `(source offset, generated offset, length)` triples.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.source_offsets
            .iter()
            .zip(&self.generated_offsets)
            .zip(&self.lengths)
            .map(|((source, generated), length)| (*source, *generated, *length))
    }
}

/// `(mapping index, pair index)`
type Slot = (usize, usize);

/// Interval-indexed mapping table of one virtual code.
#[derive(Serialize)]
pub struct SourceMap {
    mappings: Vec<Mapping>,
    #[serde(skip)]
    by_source: Lapper<usize, Slot>,
    #[serde(skip)]
    by_generated: Lapper<usize, Slot>,
}

impl SourceMap {
    pub fn new(mappings: Vec<Mapping>) -> Self {
        let mut source_intervals = Vec::new();
        let mut generated_intervals = Vec::new();

        for (mapping_index, mapping) in mappings.iter().enumerate() {
            for (pair_index, (source, generated, length)) in mapping.pairs().enumerate() {
                let val = (mapping_index, pair_index);
                // stop is exclusive in the lapper; +1 makes our span ends inclusive
                source_intervals.push(Interval {
                    start: source,
                    stop: source + length + 1,
                    val,
                });
                generated_intervals.push(Interval {
                    start: generated,
                    stop: generated + length + 1,
                    val,
                });
            }
        }

        Self {
            mappings,
            by_source: Lapper::new(source_intervals),
            by_generated: Lapper::new(generated_intervals),
        }
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    fn pair(&self, (mapping_index, pair_index): Slot) -> (usize, usize, usize, &CodeInformation) {
        let mapping = &self.mappings[mapping_index];
        (
            mapping.source_offsets[pair_index],
            mapping.generated_offsets[pair_index],
            mapping.lengths[pair_index],
            &mapping.data,
        )
    }

    /// Slots covering `offset`, in table order.
    fn covering(lapper: &Lapper<usize, Slot>, offset: usize) -> Vec<Slot> {
        let mut slots: Vec<Slot> = lapper
            .find(offset, offset + 1)
            .map(|interval| interval.val)
            .collect();
        slots.sort_unstable();
        slots
    }

    /// Every generated offset for `source_offset` whose flags pass `filter`.
    pub fn to_generated_all(
        &self,
        source_offset: usize,
        filter: impl Fn(&CodeInformation) -> bool,
    ) -> Vec<(usize, &CodeInformation)> {
        Self::covering(&self.by_source, source_offset)
            .into_iter()
            .map(|slot| self.pair(slot))
            .filter(|(_, _, _, data)| filter(*data))
            .map(|(source, generated, _, data)| (generated + (source_offset - source), data))
            .collect()
    }

    /// First generated offset for `source_offset` whose flags pass `filter`.
    pub fn to_generated(
        &self,
        source_offset: usize,
        filter: impl Fn(&CodeInformation) -> bool,
    ) -> Option<(usize, &CodeInformation)> {
        self.to_generated_all(source_offset, filter).into_iter().next()
    }

    /// Every source offset for `generated_offset` whose flags pass `filter`.
    pub fn to_source_all(
        &self,
        generated_offset: usize,
        filter: impl Fn(&CodeInformation) -> bool,
    ) -> Vec<(usize, &CodeInformation)> {
        Self::covering(&self.by_generated, generated_offset)
            .into_iter()
            .map(|slot| self.pair(slot))
            .filter(|(_, _, _, data)| filter(*data))
            .map(|(source, generated, _, data)| (source + (generated_offset - generated), data))
            .collect()
    }

    /// First source offset for `generated_offset` whose flags pass `filter`.
    pub fn to_source(
        &self,
        generated_offset: usize,
        filter: impl Fn(&CodeInformation) -> bool,
    ) -> Option<(usize, &CodeInformation)> {
        self.to_source_all(generated_offset, filter).into_iter().next()
    }

    /// Translate a source range. Both ends must fall in the same span.
    pub fn to_generated_range(
        &self,
        start: usize,
        end: usize,
        filter: impl Fn(&CodeInformation) -> bool,
    ) -> Option<(usize, usize)> {
        Self::covering(&self.by_source, start)
            .into_iter()
            .map(|slot| self.pair(slot))
            .find(|(source, _, length, data)| end >= start && end <= source + length && filter(*data))
            .map(|(source, generated, _, _)| (generated + (start - source), generated + (end - source)))
    }

    /// Translate a generated range. Both ends must fall in the same span.
    pub fn to_source_range(
        &self,
        start: usize,
        end: usize,
        filter: impl Fn(&CodeInformation) -> bool,
    ) -> Option<(usize, usize)> {
        Self::covering(&self.by_generated, start)
            .into_iter()
            .map(|slot| self.pair(slot))
            .find(|(_, generated, length, data)| {
                end >= start && end <= generated + length && filter(*data)
            })
            .map(|(source, generated, _, _)| (source + (start - generated), source + (end - generated)))
    }

    /// Project a source offset onto the nearest generated offset.
    ///
    /// Covered offsets map exactly. Uncovered offsets map to the generated end
    /// of the closest span ending before them, or 0 when none does. Only
    /// mappings passing `filter` are considered.
    pub fn project_source_offset(
        &self,
        source_offset: usize,
        filter: impl Fn(&CodeInformation) -> bool,
    ) -> usize {
        if let Some((generated, _)) = self.to_generated(source_offset, &filter) {
            return generated;
        }
        self.mappings
            .iter()
            .filter(|mapping| filter(&mapping.data))
            .flat_map(Mapping::pairs)
            .filter(|(source, _, length)| source + length <= source_offset)
            .max_by_key(|(source, _, length)| source + length)
            .map(|(_, generated, length)| generated + length)
            .unwrap_or(0)
    }
}

impl Clone for SourceMap {
    fn clone(&self) -> Self {
        SourceMap::new(self.mappings.clone())
    }
}

impl std::fmt::Debug for SourceMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceMap")
            .field("mappings", &self.mappings)
            .finish()
    }
}

impl PartialEq for SourceMap {
    fn eq(&self, other: &Self) -> bool {
        self.mappings == other.mappings
    }
}

impl Eq for SourceMap {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SourceMap {
        // source "0123456789" -> generated "234" + "789"
        SourceMap::new(vec![
            Mapping::span(2, 0, 3, CodeInformation::all()),
            Mapping::span(7, 3, 3, CodeInformation::navigation_and_semantic()),
        ])
    }

    #[test]
    fn test_to_generated_inside_and_at_end() {
        let map = sample();
        assert_eq!(map.to_generated(3, |_| true).map(|(o, _)| o), Some(1));
        // inclusive end
        assert_eq!(map.to_generated(5, |_| true).map(|(o, _)| o), Some(3));
        assert_eq!(map.to_generated(6, |_| true), None);
    }

    #[test]
    fn test_boundary_offset_matches_both_spans_in_order() {
        let map = SourceMap::new(vec![
            Mapping::span(0, 0, 2, CodeInformation::all()),
            Mapping::span(2, 2, 2, CodeInformation::all()),
        ]);
        let all: Vec<usize> = map
            .to_generated_all(2, |_| true)
            .into_iter()
            .map(|(o, _)| o)
            .collect();
        assert_eq!(all, vec![2, 2]);
    }

    #[test]
    fn test_to_source_respects_filter() {
        let map = sample();
        assert_eq!(map.to_source(4, |_| true).map(|(o, _)| o), Some(8));
        assert_eq!(map.to_source(4, |info| info.verification), None);
        // offset 3 is the end of the first span and the start of the second
        assert_eq!(map.to_source(3, |info| info.verification).map(|(o, _)| o), Some(5));
        assert_eq!(map.to_source(3, |info| !info.verification).map(|(o, _)| o), Some(7));
    }

    #[test]
    fn test_zero_length_span_maps_its_offset() {
        let map = SourceMap::new(vec![Mapping::span(4, 0, 0, CodeInformation::all())]);
        assert_eq!(map.to_generated(4, |_| true).map(|(o, _)| o), Some(0));
        assert_eq!(map.to_generated(5, |_| true), None);
        assert_eq!(map.to_source(0, |_| true).map(|(o, _)| o), Some(4));
    }

    #[test]
    fn test_range_translation_requires_single_span() {
        let map = sample();
        assert_eq!(map.to_generated_range(2, 5, |_| true), Some((0, 3)));
        assert_eq!(map.to_generated_range(3, 8, |_| true), None);
        assert_eq!(map.to_source_range(3, 5, |_| true), Some((7, 9)));
    }

    #[test]
    fn test_project_source_offset() {
        let map = sample();
        assert_eq!(map.project_source_offset(0, |_| true), 0);
        assert_eq!(map.project_source_offset(3, |_| true), 1);
        assert_eq!(map.project_source_offset(6, |_| true), 3);
        assert_eq!(map.project_source_offset(9, |_| true), 5);
        // the second span lacks verification, so 9 falls back to the first span's end
        assert_eq!(map.project_source_offset(9, |info| info.verification), 3);
    }

    #[test]
    fn test_intersect_flags() {
        let combined = CodeInformation::all().intersect(CodeInformation::navigation_and_semantic());
        assert_eq!(combined, CodeInformation::navigation_and_semantic());
        assert!(CodeInformation::none().intersect(CodeInformation::all()).is_empty());
    }

    #[test]
    fn test_clone_rebuilds_index() {
        let map = sample();
        let cloned = map.clone();
        assert_eq!(cloned, map);
        assert_eq!(cloned.to_source(1, |_| true).map(|(o, _)| o), Some(3));
    }
}
