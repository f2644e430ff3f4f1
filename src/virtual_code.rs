//! Virtual codes and the tree they form for one physical file.
//!
//! Codes live in an arena indexed by [`CodeIndex`]; index 0 is the root. A
//! tree is immutable once built. Edits build a new tree which replaces the
//! published `Arc<VirtualCodeTree>`.

pub mod builder;
mod codegen;

pub use codegen::Codegen;

use serde::Serialize;

use crate::language::LanguageTag;
use crate::mapping::{CodeInformation, SourceMap};
use crate::template::TemplateDiagnostic;

/// Index of a code in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CodeIndex(pub usize);

impl CodeIndex {
    pub const ROOT: CodeIndex = CodeIndex(0);
}

/// Synthesized language-tagged text plus its mapping back to the physical file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualCode {
    pub id: String,
    pub language: LanguageTag,
    pub text: String,
    pub source_map: SourceMap,
    pub children: Vec<CodeIndex>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<TemplateDiagnostic>,
}

impl VirtualCode {
    pub fn new(id: impl Into<String>, language: LanguageTag, text: String, source_map: SourceMap) -> Self {
        Self {
            id: id.into(),
            language,
            text,
            source_map,
            children: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Arena of virtual codes for one physical file.
#[derive(Debug, Clone, Serialize)]
pub struct VirtualCodeTree {
    codes: Vec<VirtualCode>,
    #[serde(skip)]
    parents: Vec<Option<CodeIndex>>,
}

impl VirtualCodeTree {
    /// Build a tree whose root owns `embedded` in the given order.
    pub fn new(mut root: VirtualCode, embedded: Vec<VirtualCode>) -> Self {
        root.children = (1..=embedded.len()).map(CodeIndex).collect();
        let mut codes = Vec::with_capacity(embedded.len() + 1);
        codes.push(root);
        codes.extend(embedded);
        Self::from_codes(codes)
    }

    /// Build from a prepared arena. Index 0 must be the root; child links are kept.
    pub fn from_codes(codes: Vec<VirtualCode>) -> Self {
        let mut parents = vec![None; codes.len()];
        for (index, code) in codes.iter().enumerate() {
            for child in &code.children {
                if let Some(slot) = parents.get_mut(child.0) {
                    *slot = Some(CodeIndex(index));
                }
            }
        }
        Self { codes, parents }
    }

    pub fn root(&self) -> &VirtualCode {
        &self.codes[CodeIndex::ROOT.0]
    }

    pub fn get(&self, index: CodeIndex) -> Option<&VirtualCode> {
        self.codes.get(index.0)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn parent(&self, index: CodeIndex) -> Option<CodeIndex> {
        self.parents.get(index.0).copied().flatten()
    }

    /// Ancestors of `index`, nearest first.
    pub fn ancestors(&self, index: CodeIndex) -> impl Iterator<Item = CodeIndex> + '_ {
        std::iter::successors(self.parent(index), |current| self.parent(*current))
    }

    /// Embedded codes in depth-first pre-order, root excluded.
    pub fn iter_embedded(&self) -> impl Iterator<Item = (CodeIndex, &VirtualCode)> + '_ {
        let mut stack: Vec<CodeIndex> = self.root().children.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let index = stack.pop()?;
            let code = self.get(index)?;
            stack.extend(code.children.iter().rev().copied());
            Some((index, code))
        })
    }

    /// Find a code by id.
    pub fn find(&self, id: &str) -> Option<CodeIndex> {
        self.codes
            .iter()
            .position(|code| code.id == id)
            .map(CodeIndex)
    }

    /// Flags narrowed by every ancestor's mapping at `source_offset`.
    ///
    /// `None` when an ancestor does not cover the offset at all.
    fn narrow_by_ancestors(
        &self,
        index: CodeIndex,
        source_offset: usize,
        data: CodeInformation,
    ) -> Option<CodeInformation> {
        self.ancestors(index).try_fold(data, |effective, ancestor| {
            let ancestor = self.get(ancestor)?;
            let granted = ancestor
                .source_map
                .to_generated_all(source_offset, |_| true)
                .into_iter()
                .fold(CodeInformation::none(), |acc, (_, info)| acc.union(*info));
            (!granted.is_empty()).then(|| effective.intersect(granted))
        })
    }

    /// Map a generated offset of `index` to the physical file.
    ///
    /// `filter` sees the effective flags: the code's mapping AND every ancestor's.
    pub fn to_source(
        &self,
        index: CodeIndex,
        generated_offset: usize,
        filter: impl Fn(&CodeInformation) -> bool,
    ) -> Option<usize> {
        self.resolve(index, generated_offset)
            .into_iter()
            .find(|(_, info)| filter(info))
            .map(|(source, _)| source)
    }

    /// Every `(source offset, effective flags)` for a generated offset of `index`.
    pub fn resolve(&self, index: CodeIndex, generated_offset: usize) -> Vec<(usize, CodeInformation)> {
        let Some(code) = self.get(index) else {
            return Vec::new();
        };
        code.source_map
            .to_source_all(generated_offset, |_| true)
            .into_iter()
            .filter_map(|(source, data)| {
                self.narrow_by_ancestors(index, source, *data)
                    .map(|effective| (source, effective))
            })
            .collect()
    }

    /// Effective flags of `index` at `generated_offset`, if it maps at all.
    pub fn effective_capabilities(
        &self,
        index: CodeIndex,
        generated_offset: usize,
    ) -> Option<CodeInformation> {
        self.resolve(index, generated_offset)
            .into_iter()
            .map(|(_, info)| info)
            .reduce(CodeInformation::union)
    }

    /// Embedded codes covering `source_offset`, with the generated offset in each.
    ///
    /// Only mappings whose effective flags pass `filter` count.
    pub fn locate(
        &self,
        source_offset: usize,
        filter: impl Fn(&CodeInformation) -> bool,
    ) -> Vec<(CodeIndex, usize)> {
        self.iter_embedded()
            .filter_map(|(index, code)| {
                code.source_map
                    .to_generated_all(source_offset, |_| true)
                    .into_iter()
                    .find_map(|(generated, data)| {
                        self.narrow_by_ancestors(index, source_offset, *data)
                            .filter(|effective| filter(effective))
                            .map(|_| (index, generated))
                    })
            })
            .collect()
    }
}
