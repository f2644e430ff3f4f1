//! Structural properties that must hold for every projected file.

use std::path::Path;
use std::sync::Arc;

use rstest::rstest;
use treaty_ls::declarations::SYNTHETIC_HEADER;
use treaty_ls::plugin::{LanguagePlugin, TreatyLanguagePlugin, VirtualFile};
use treaty_ls::region::{self, Region};
use treaty_ls::{CodeIndex, SourceSnapshot, WorkspaceSettings};

const COMPONENT_FILE: &str = "\
import { Component } from '@angular/core';
<style lang=\"scss\">.a { color: red; }</style>
<section><h1>{{ title }}</h1><input [value]=\"a > b\"></section>
@Component({ selector: 'app-root', templateUrl: './app.html', styleUrls: ['./a.css', \"./b.css\"] })
export class AppComponent { title = 'x'; }
<style></style>
<!-- a comment --><p>tail</p>
";

const SCRIPT_ONLY: &str = "export const answer = 42;\n";

const BROKEN: &str = "<style>a{}\n<div><p>unclosed\nlet x = `<b>`;\n</i>";

const MULTIBYTE: &str = "<p>こんにちは</p>\nconst s = 'é';\n<style>a::after{content:'→'}</style>";

fn project(source: &str) -> VirtualFile {
    TreatyLanguagePlugin::new(Arc::new(WorkspaceSettings::default()))
        .create_virtual_code(
            Path::new("/app/src/app.treaty"),
            "treaty",
            SourceSnapshot::new(source),
        )
        .expect("treaty files are recognized")
}

fn all_codes(file: &VirtualFile) -> Vec<CodeIndex> {
    std::iter::once(CodeIndex::ROOT)
        .chain(file.tree.iter_embedded().map(|(index, _)| index))
        .collect()
}

#[rstest]
#[case(COMPONENT_FILE)]
#[case(SCRIPT_ONLY)]
#[case(BROKEN)]
#[case(MULTIBYTE)]
#[case("")]
fn test_extraction_and_build_are_idempotent(#[case] source: &str) {
    let settings = WorkspaceSettings::default();
    assert_eq!(region::extract(source, &settings), region::extract(source, &settings));

    let first = serde_json::to_value(&*project(source).tree).unwrap();
    let second = serde_json::to_value(&*project(source).tree).unwrap();
    assert_eq!(first, second);
}

#[rstest]
#[case(COMPONENT_FILE)]
#[case(SCRIPT_ONLY)]
#[case(BROKEN)]
#[case(MULTIBYTE)]
fn test_every_pair_round_trips(#[case] source: &str) {
    let file = project(source);

    for index in all_codes(&file) {
        let code = file.tree.get(index).unwrap();
        for mapping in code.source_map.mappings() {
            for (src, generated, length) in mapping.pairs() {
                for k in 0..=length {
                    let sources: Vec<usize> = code
                        .source_map
                        .to_source_all(generated + k, |_| true)
                        .into_iter()
                        .map(|(offset, _)| offset)
                        .collect();
                    assert!(
                        sources.contains(&(src + k)),
                        "{}: generated {} should map to source {}",
                        code.id,
                        generated + k,
                        src + k
                    );

                    let generated_offsets: Vec<usize> = code
                        .source_map
                        .to_generated_all(src + k, |_| true)
                        .into_iter()
                        .map(|(offset, _)| offset)
                        .collect();
                    assert!(
                        generated_offsets.contains(&(generated + k)),
                        "{}: source {} should map to generated {}",
                        code.id,
                        src + k,
                        generated + k
                    );
                }

                assert_eq!(
                    &source.as_bytes()[src..src + length],
                    &code.text.as_bytes()[generated..generated + length],
                    "{}: mapped bytes must be copied verbatim",
                    code.id
                );
            }
        }
    }
}

fn assert_disjoint(regions: &[Region]) {
    for pair in regions.windows(2) {
        assert!(
            pair[0].end <= pair[1].start,
            "regions overlap: {:?} and {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[rstest]
#[case(COMPONENT_FILE)]
#[case(BROKEN)]
#[case(MULTIBYTE)]
fn test_regions_and_script_spans_are_disjoint(#[case] source: &str) {
    let regions = region::extract(source, &WorkspaceSettings::default());
    assert_disjoint(&regions);

    let file = project(source);
    let script = file.tree.get(file.tree.find("script_ts").unwrap()).unwrap();
    for mapping in script.source_map.mappings() {
        for (src, _, length) in mapping.pairs() {
            if !mapping.data.verification {
                continue;
            }
            for region in &regions {
                assert!(
                    !region.overlaps(src, src + length),
                    "script span {}..{} overlaps region {:?}",
                    src,
                    src + length,
                    region
                );
            }
        }
    }
}

#[test]
fn test_synthetic_scaffolding_is_unmapped() {
    let file = project(COMPONENT_FILE);
    let script = file.tree.get(file.tree.find("script_ts").unwrap()).unwrap();
    let synthetic_start = script
        .text
        .find(SYNTHETIC_HEADER)
        .expect("component declarations are emitted");

    // the end of the last verbatim span touches the header, so start one past it
    let mut mapped_literals = Vec::new();
    for offset in synthetic_start + 1..script.text.len() {
        let mapped = script.source_map.to_source_all(offset, |_| true);
        for (src, data) in mapped {
            assert!(!data.verification, "synthetic text must not be verified");
            assert!(data.navigation && data.semantic);
            mapped_literals.push(src);
        }
    }
    assert!(!mapped_literals.is_empty(), "copied literals should map back");

    for mapping in script.source_map.mappings() {
        for (src, generated, length) in mapping.pairs() {
            if generated < synthetic_start {
                continue;
            }
            let literal = &script.text[generated..generated + length];
            assert!(
                literal.starts_with('\'') || literal.starts_with('"'),
                "only string literals map: {literal}"
            );
            assert_eq!(&COMPONENT_FILE[src..src + length], literal);
        }
    }
}
