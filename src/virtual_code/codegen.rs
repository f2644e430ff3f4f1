//! Incremental construction of generated text together with its mappings.

use crate::mapping::{CodeInformation, Mapping};

/// Accumulates generated text and the mapping entries describing it.
///
/// Text pushed with [`Codegen::push`] is synthetic and stays unmapped.
#[derive(Debug, Default)]
pub struct Codegen {
    text: String,
    mappings: Vec<Mapping>,
}

impl Codegen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Append synthetic text.
    pub fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Append text copied from `source_offset` in the physical file.
    pub fn push_mapped(&mut self, text: &str, source_offset: usize, data: CodeInformation) {
        self.mappings
            .push(Mapping::span(source_offset, self.text.len(), text.len(), data));
        self.text.push_str(text);
    }

    pub fn finish(self) -> (String, Vec<Mapping>) {
        (self.text, self.mappings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_copied_text_is_mapped() {
        let mut codegen = Codegen::new();
        codegen.push("import ");
        codegen.push_mapped("'./a.html'", 40, CodeInformation::navigation_and_semantic());
        codegen.push(";\n");

        let (text, mappings) = codegen.finish();
        assert_eq!(text, "import './a.html';\n");
        assert_eq!(
            mappings,
            vec![Mapping::span(
                40,
                7,
                10,
                CodeInformation::navigation_and_semantic()
            )]
        );
    }
}
