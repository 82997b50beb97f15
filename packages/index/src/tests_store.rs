use crate::diagnostics::IndexDiagnostic;
use crate::entry::{EntrySubtype, EntryType};
use crate::generator::StoryIndexGenerator;
use crate::options::{Autodocs, DocsOptions, IndexOptions};
use crate::specifier::StoriesEntry;
use crate::store::IndexStore;
use std::path::Path;
use std::sync::Arc;
use storyloom_common::MockFileSystem;
use storyloom_sort::{OrderItem, StorySortOptions};

const BUTTON: &str = r#"
export default { title: 'Components/Button', tags: ['autodocs'] };
export const Primary = {};
export const Secondary = {};
"#;

const BUTTON_DOCS: &str = r#"import { Meta } from '@storybook/blocks';
import * as ButtonStories from './Button.stories';

<Meta of={ButtonStories} />
"#;

const INTRO: &str = r#"import { Meta } from '@storybook/blocks';

<Meta title="Intro" />
"#;

fn project(files: &[(&str, &str)], options: IndexOptions) -> (Arc<MockFileSystem>, StoryIndexGenerator) {
    let fs = Arc::new(MockFileSystem::new());
    for (path, contents) in files {
        fs.add_file(Path::new("/project").join(path), *contents);
    }
    let generator = StoryIndexGenerator::new(
        "/project",
        &[StoriesEntry::Glob("./src/**/*.@(mdx|stories.@(ts|tsx))".to_string())],
        options,
        fs.clone(),
    )
    .unwrap();
    (fs, generator)
}

fn apply(generator: &StoryIndexGenerator, store: &mut IndexStore, import_path: &str) {
    match generator.index_file(import_path) {
        Ok(file) => {
            store.upsert(import_path, file);
        }
        Err(diagnostic) => store.record_failure(import_path, diagnostic),
    }
}

#[test]
fn test_full_build_with_autodocs() {
    let (_fs, generator) = project(&[("src/Button.stories.ts", BUTTON)], IndexOptions::default());
    let report = generator.build().unwrap();

    assert_eq!(
        report.index.ids(),
        vec![
            "components-button--docs",
            "components-button--primary",
            "components-button--secondary"
        ]
    );
    let docs = report.index.get("components-button--docs").unwrap();
    assert_eq!(docs.entry_type, EntryType::Docs);
    assert_eq!(docs.tags, vec!["dev", "test", "autodocs"]);
    assert_eq!(docs.name, "Docs");

    let primary = report.index.get("components-button--primary").unwrap();
    assert_eq!(primary.export_name.as_deref(), Some("Primary"));
    assert_eq!(primary.import_path, "./src/Button.stories.ts");
    assert!(!report.degraded);
}

#[test]
fn test_attached_mdx_replaces_autodocs_without_collision() {
    let (_fs, generator) = project(
        &[
            ("src/Button.stories.ts", BUTTON),
            ("src/Button.mdx", BUTTON_DOCS),
        ],
        IndexOptions::default(),
    );
    let report = generator.build().unwrap();

    let docs = report.index.get("components-button--docs").unwrap();
    assert_eq!(docs.import_path, "./src/Button.mdx");
    assert_eq!(docs.tags, vec!["dev", "test", "autodocs", "attached-mdx"]);
    assert_eq!(
        docs.stories_imports.as_deref(),
        Some(&["./src/Button.stories.ts".to_string()][..])
    );
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_unattached_docs_and_project_tags() {
    let options = IndexOptions {
        tags: vec!["!test".to_string(), "beta".to_string()],
        ..Default::default()
    };
    let (_fs, generator) = project(&[("src/Intro.mdx", INTRO)], options);
    let report = generator.build().unwrap();

    let intro = report.index.get("intro--docs").unwrap();
    assert_eq!(intro.tags, vec!["dev", "beta", "unattached-mdx"]);
    assert_eq!(intro.stories_imports.as_deref(), Some(&[][..]));
}

#[test]
fn test_collision_keeps_first_file() {
    let (_fs, generator) = project(
        &[
            ("src/a/Button.stories.ts", "export default { title: 'Button' };\nexport const Primary = {};"),
            ("src/b/Button.stories.ts", "export default { title: 'Button' };\nexport const Primary = {};"),
        ],
        IndexOptions::default(),
    );
    let report = generator.build().unwrap();

    assert_eq!(report.index.len(), 1);
    assert_eq!(
        report.index.get("button--primary").unwrap().import_path,
        "./src/a/Button.stories.ts"
    );
    assert_eq!(
        report.diagnostics,
        vec![IndexDiagnostic::Collision {
            id: "button--primary".to_string(),
            first: "./src/a/Button.stories.ts".to_string(),
            second: "./src/b/Button.stories.ts".to_string(),
        }]
    );
    assert!(report.degraded);
}

#[test]
fn test_parse_failure_excludes_file_but_build_continues() {
    let (_fs, generator) = project(
        &[
            ("src/Broken.stories.ts", "export default { title: 'Broken' ;"),
            ("src/Button.stories.ts", BUTTON),
        ],
        IndexOptions::default(),
    );
    let report = generator.build().unwrap();

    assert!(report.index.entries_for("./src/Broken.stories.ts").next().is_none());
    assert!(report.index.get("components-button--primary").is_some());
    assert!(matches!(
        &report.diagnostics[0],
        IndexDiagnostic::Parse { file, location: Some(_), .. } if file == "./src/Broken.stories.ts"
    ));
    assert!(report.degraded);
}

#[test]
fn test_broken_reference_is_not_fatal() {
    let docs = "import * as Missing from './Missing.stories';\n\n<Meta title=\"Guide\" />\n";
    let (_fs, generator) = project(&[("src/Guide.mdx", docs)], IndexOptions::default());
    let report = generator.build().unwrap();

    assert!(report.index.get("guide--docs").is_some());
    assert_eq!(
        report.diagnostics,
        vec![IndexDiagnostic::BrokenReference {
            docs_file: "./src/Guide.mdx".to_string(),
            reference: "./Missing.stories".to_string(),
        }]
    );
    assert!(!report.degraded);
}

#[test]
fn test_removing_story_file_breaks_dependent_docs() {
    let (fs, generator) = project(
        &[
            ("src/Button.stories.ts", BUTTON),
            ("src/Button.mdx", BUTTON_DOCS),
        ],
        IndexOptions::default(),
    );
    let mut store = generator.build_store().unwrap();
    assert_eq!(store.dependents("./src/Button.stories.ts"), vec!["./src/Button.mdx"]);

    fs.remove_file(Path::new("/project/src/Button.stories.ts"));
    let touched = store.remove("./src/Button.stories.ts");
    assert_eq!(touched, vec!["./src/Button.mdx"]);

    let report = store.build().unwrap();
    assert!(report.index.entries_for("./src/Button.stories.ts").next().is_none());
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, IndexDiagnostic::BrokenReference { docs_file, .. } if docs_file == "./src/Button.mdx")));
}

#[test]
fn test_edit_replaces_only_that_files_entries() {
    let (fs, generator) = project(
        &[
            ("src/Button.stories.ts", BUTTON),
            ("src/Card.stories.ts", "export default { title: 'Card' };\nexport const Basic = {};"),
        ],
        IndexOptions::default(),
    );
    let mut store = generator.build_store().unwrap();
    let before = store.build().unwrap().index;

    fs.add_file(
        "/project/src/Button.stories.ts",
        "export default { title: 'Components/Button' };\nexport const Primary = {};",
    );
    apply(&generator, &mut store, "./src/Button.stories.ts");
    let after = store.build().unwrap().index;

    let button: Vec<&str> = after
        .entries_for("./src/Button.stories.ts")
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(button, vec!["components-button--primary"]);
    assert_eq!(after.get("card--basic"), before.get("card--basic"));
}

#[test]
fn test_failed_edit_keeps_last_known_good_entries() {
    let (fs, generator) = project(&[("src/Button.stories.ts", BUTTON)], IndexOptions::default());
    let mut store = generator.build_store().unwrap();

    fs.add_file("/project/src/Button.stories.ts", "export const = ;");
    apply(&generator, &mut store, "./src/Button.stories.ts");

    let report = store.build().unwrap();
    assert!(report.index.get("components-button--primary").is_some());
    assert!(store.failure("./src/Button.stories.ts").is_some());
    assert!(report.degraded);

    fs.add_file("/project/src/Button.stories.ts", BUTTON);
    apply(&generator, &mut store, "./src/Button.stories.ts");
    assert!(store.failure("./src/Button.stories.ts").is_none());
    assert!(store.build().unwrap().diagnostics.is_empty());
}

#[test]
fn test_incremental_updates_match_full_rebuild() {
    let (fs, generator) = project(
        &[
            ("src/Button.stories.ts", BUTTON),
            ("src/Intro.mdx", INTRO),
        ],
        IndexOptions::default(),
    );
    let mut store = generator.build_store().unwrap();

    // docs page arrives before the stories it references
    fs.add_file("/project/src/Card.mdx", "import * as Card from './Card.stories';\n\n<Meta of={Card} />\n");
    apply(&generator, &mut store, "./src/Card.mdx");
    fs.add_file(
        "/project/src/Card.stories.ts",
        "export default { title: 'Layout/Card' };\nexport const Basic = {};\nBasic.test('has a border', () => {});",
    );
    apply(&generator, &mut store, "./src/Card.stories.ts");
    fs.add_file(
        "/project/src/Button.stories.ts",
        "export default { title: 'Components/Button' };\nexport const Primary = {};",
    );
    apply(&generator, &mut store, "./src/Button.stories.ts");
    fs.remove_file(Path::new("/project/src/Intro.mdx"));
    store.remove("./src/Intro.mdx");

    let incremental = store.build().unwrap();
    let full = generator.build().unwrap();

    assert_eq!(incremental.index, full.index);
    assert_eq!(incremental.index.ids(), full.index.ids());
    assert_eq!(incremental.diagnostics, full.diagnostics);
    assert_eq!(
        full.index.get("layout-card--docs").unwrap().import_path,
        "./src/Card.mdx"
    );
}

#[test]
fn test_test_entries_follow_their_story() {
    let source = r#"
export default { title: 'Form' };
export const Filled = { play: async () => {} };
Filled.test('submits', async () => {});
"#;
    let (_fs, generator) = project(&[("src/Form.stories.tsx", source)], IndexOptions::default());
    let report = generator.build().unwrap();

    assert_eq!(report.index.ids(), vec!["form--filled", "form--filled:submits"]);
    let test = report.index.get("form--filled:submits").unwrap();
    assert_eq!(test.subtype, Some(EntrySubtype::Test));
    assert_eq!(test.parent.as_deref(), Some("form--filled"));
    assert_eq!(test.tags, vec!["dev", "test", "play-fn", "test-fn"]);
}

#[test]
fn test_autodocs_modes() {
    let plain = "export default { title: 'Plain' };\nexport const A = {};";

    let always = IndexOptions {
        docs: DocsOptions {
            autodocs: Autodocs::Always,
            default_name: "Overview".to_string(),
        },
        ..Default::default()
    };
    let (_fs, generator) = project(&[("src/Plain.stories.ts", plain)], always);
    assert!(generator.build().unwrap().index.get("plain--overview").is_some());

    let never = IndexOptions {
        docs: DocsOptions {
            autodocs: Autodocs::Never,
            ..Default::default()
        },
        ..Default::default()
    };
    let (_fs, generator) = project(&[("src/Button.stories.ts", BUTTON)], never);
    assert!(generator.build().unwrap().index.get("components-button--docs").is_none());
}

#[test]
fn test_display_order_follows_story_sort() {
    let options = IndexOptions {
        story_sort: StorySortOptions::alphabetical()
            .with_order(vec![OrderItem::from("Intro"), OrderItem::from("Layout")]),
        ..Default::default()
    };
    let (_fs, generator) = project(
        &[
            ("src/Button.stories.ts", "export default { title: 'Components/Button' };\nexport const A = {};"),
            ("src/Card.stories.ts", "export default { title: 'Layout/Card' };\nexport const A = {};"),
            ("src/Intro.mdx", INTRO),
        ],
        options,
    );
    let report = generator.build().unwrap();
    assert_eq!(
        report.index.ids(),
        vec!["intro--docs", "layout-card--a", "components-button--a"]
    );
}

#[test]
fn test_template_docs_are_not_indexed() {
    let (_fs, generator) = project(
        &[("src/Template.mdx", "<Meta isTemplate />\n")],
        IndexOptions::default(),
    );
    let report = generator.build().unwrap();
    assert!(report.index.is_empty());
    assert!(report.diagnostics.is_empty());
}
