use crate::cache::{FileStatus, IndexCache};
use crate::channel::{ServerChannel, SET_INDEX, STORY_INDEX_INVALIDATED};
use crate::watcher::WatchEvent;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storyloom_common::MockFileSystem;
use storyloom_index::{IndexDiagnostic, IndexOptions, StoriesEntry, StoryIndexGenerator};

const BUTTON: &str = r#"
export default { title: 'Components/Button', tags: ['autodocs'] };
export const Primary = {};
export const Secondary = {};
"#;

const BUTTON_PRIMARY_ONLY: &str = r#"
export default { title: 'Components/Button', tags: ['autodocs'] };
export const Primary = {};
"#;

const BUTTON_DOCS: &str = r#"import { Meta } from '@storybook/blocks';
import * as ButtonStories from './Button.stories';

<Meta of={ButtonStories} />
"#;

const CARD: &str = r#"
export default { title: 'Layout/Card' };
export const Basic = { args: { elevated: true } };
"#;

fn absolute(path: &str) -> PathBuf {
    Path::new("/project").join(path)
}

fn generator(fs: &Arc<MockFileSystem>) -> StoryIndexGenerator {
    StoryIndexGenerator::new(
        "/project",
        &[StoriesEntry::Glob("./src/**/*.@(mdx|stories.@(ts|tsx))".to_string())],
        IndexOptions::default(),
        fs.clone(),
    )
    .unwrap()
}

fn project(files: &[(&str, &str)]) -> (Arc<MockFileSystem>, IndexCache) {
    let fs = Arc::new(MockFileSystem::new());
    for (path, contents) in files {
        fs.add_file(absolute(path), *contents);
    }
    let cache = IndexCache::new(Arc::new(generator(&fs)));
    (fs, cache)
}

fn changed(path: &str) -> WatchEvent {
    WatchEvent::Changed(absolute(path))
}

fn removed(path: &str) -> WatchEvent {
    WatchEvent::Removed(absolute(path))
}

#[tokio::test]
async fn test_initialize_matches_full_build() {
    let (fs, cache) = project(&[("src/Button.stories.ts", BUTTON), ("src/Card.stories.ts", CARD)]);
    let snapshot = cache.initialize().await.unwrap();

    let full = generator(&fs).build().unwrap();
    assert_eq!(*snapshot.index, full.index);
    assert_eq!(snapshot.index.ids(), full.index.ids());
    assert_eq!(snapshot.version, 1);
    assert_eq!(
        cache.status("./src/Card.stories.ts").await.unwrap().status,
        FileStatus::Parsed
    );
}

#[tokio::test]
async fn test_edit_touches_only_that_file() {
    let (fs, cache) = project(&[("src/Button.stories.ts", BUTTON), ("src/Card.stories.ts", CARD)]);
    cache.initialize().await.unwrap();
    let card_before = cache.get().get("layout-card--basic").cloned().unwrap();

    fs.add_file(absolute("src/Button.stories.ts"), BUTTON_PRIMARY_ONLY);
    assert!(cache.apply(vec![changed("src/Button.stories.ts")]).await.unwrap());

    let index = cache.get();
    assert!(index.get("components-button--primary").is_some());
    assert!(index.get("components-button--secondary").is_none());
    assert_eq!(index.get("layout-card--basic"), Some(&card_before));
    assert_eq!(
        index.ids(),
        vec![
            "components-button--docs",
            "components-button--primary",
            "layout-card--basic"
        ]
    );
}

#[tokio::test]
async fn test_readers_keep_their_snapshot() {
    let (fs, cache) = project(&[("src/Button.stories.ts", BUTTON)]);
    cache.initialize().await.unwrap();
    let before = cache.get();

    fs.add_file(absolute("src/Button.stories.ts"), BUTTON_PRIMARY_ONLY);
    cache.invalidate(&absolute("src/Button.stories.ts")).await.unwrap();

    assert_eq!(before.len(), 3);
    assert_eq!(cache.get().len(), 2);
}

#[tokio::test]
async fn test_unchanged_content_is_skipped() {
    let (_fs, cache) = project(&[("src/Button.stories.ts", BUTTON)]);
    cache.initialize().await.unwrap();

    assert!(!cache.apply(vec![changed("src/Button.stories.ts")]).await.unwrap());
    assert_eq!(cache.snapshot().version, 1);
    assert_eq!(
        cache.status("./src/Button.stories.ts").await.unwrap().status,
        FileStatus::Parsed
    );
}

#[tokio::test]
async fn test_unrelated_files_are_ignored() {
    let (fs, cache) = project(&[("src/Button.stories.ts", BUTTON)]);
    cache.initialize().await.unwrap();

    fs.add_file(absolute("src/Button.tsx"), "export const Button = () => null;");
    assert!(!cache.apply(vec![changed("src/Button.tsx")]).await.unwrap());
    assert!(cache.status("./src/Button.tsx").await.is_none());
}

#[tokio::test]
async fn test_new_file_is_picked_up() {
    let (fs, cache) = project(&[("src/Button.stories.ts", BUTTON)]);
    cache.initialize().await.unwrap();

    fs.add_file(absolute("src/Card.stories.ts"), CARD);
    assert!(cache.apply(vec![changed("src/Card.stories.ts")]).await.unwrap());
    assert!(cache.get().get("layout-card--basic").is_some());
}

#[tokio::test]
async fn test_removal_recomputes_docs_references() {
    let (fs, cache) = project(&[
        ("src/Button.stories.ts", BUTTON),
        ("src/Button.mdx", BUTTON_DOCS),
        ("src/Card.stories.ts", CARD),
    ]);
    let snapshot = cache.initialize().await.unwrap();
    assert!(snapshot.diagnostics.is_empty());

    fs.remove_file(&absolute("src/Button.stories.ts"));
    assert!(cache.apply(vec![removed("src/Button.stories.ts")]).await.unwrap());

    let snapshot = cache.snapshot();
    assert!(snapshot.index.entries_for("./src/Button.stories.ts").next().is_none());
    assert!(snapshot.index.get("layout-card--basic").is_some());
    assert!(snapshot.diagnostics.iter().any(|diagnostic| matches!(
        diagnostic,
        IndexDiagnostic::BrokenReference { docs_file, .. } if docs_file == "./src/Button.mdx"
    )));
    assert_eq!(
        cache.status("./src/Button.stories.ts").await.unwrap().status,
        FileStatus::Removed
    );
}

#[tokio::test]
async fn test_change_to_missing_file_is_a_removal() {
    let (fs, cache) = project(&[("src/Button.stories.ts", BUTTON), ("src/Card.stories.ts", CARD)]);
    cache.initialize().await.unwrap();

    fs.remove_file(&absolute("src/Card.stories.ts"));
    assert!(cache.apply(vec![changed("src/Card.stories.ts")]).await.unwrap());
    assert!(cache.get().get("layout-card--basic").is_none());
    assert_eq!(
        cache.status("./src/Card.stories.ts").await.unwrap().status,
        FileStatus::Removed
    );
}

#[tokio::test]
async fn test_directory_removal_drops_nested_files() {
    let (fs, cache) = project(&[
        ("src/layout/Card.stories.ts", CARD),
        ("src/Button.stories.ts", BUTTON),
    ]);
    cache.initialize().await.unwrap();

    fs.remove_file(&absolute("src/layout/Card.stories.ts"));
    assert!(cache.apply(vec![removed("src/layout")]).await.unwrap());
    assert!(cache.get().entries_for("./src/layout/Card.stories.ts").next().is_none());
    assert!(cache.get().get("components-button--primary").is_some());
}

#[tokio::test]
async fn test_failed_parse_keeps_last_known_good() {
    let (fs, cache) = project(&[("src/Button.stories.ts", BUTTON)]);
    cache.initialize().await.unwrap();

    fs.add_file(absolute("src/Button.stories.ts"), "export default { title: 'Button' ;");
    assert!(cache.apply(vec![changed("src/Button.stories.ts")]).await.unwrap());

    let snapshot = cache.snapshot();
    assert_eq!(snapshot.index.len(), 3);
    assert!(snapshot.diagnostics.iter().any(|diagnostic| matches!(
        diagnostic,
        IndexDiagnostic::Parse { file, .. } if file == "./src/Button.stories.ts"
    )));
    assert_eq!(
        cache.status("./src/Button.stories.ts").await.unwrap().status,
        FileStatus::Failed
    );

    // Fixing the file clears the diagnostic
    fs.add_file(absolute("src/Button.stories.ts"), BUTTON_PRIMARY_ONLY);
    cache.apply(vec![changed("src/Button.stories.ts")]).await.unwrap();
    let snapshot = cache.snapshot();
    assert!(snapshot.diagnostics.is_empty());
    assert_eq!(snapshot.index.len(), 2);
}

#[tokio::test]
async fn test_superseded_parse_is_dropped() {
    let (fs, cache) = project(&[("src/Button.stories.ts", BUTTON)]);
    cache.initialize().await.unwrap();

    fs.add_file(absolute("src/Button.stories.ts"), BUTTON_PRIMARY_ONLY);
    let older = cache.schedule(vec![changed("src/Button.stories.ts")]).await;
    let older = cache.prepare_all(older).await.unwrap();

    fs.add_file(absolute("src/Button.stories.ts"), CARD);
    let newer = cache.schedule(vec![changed("src/Button.stories.ts")]).await;
    assert_eq!(
        cache.status("./src/Button.stories.ts").await.unwrap().status,
        FileStatus::Stale
    );
    let newer = cache.prepare_all(newer).await.unwrap();

    // The older result arrives last and must not win
    assert!(cache.commit(newer, false).await.unwrap());
    assert!(!cache.commit(older, false).await.unwrap());

    let index = cache.get();
    assert!(index.get("layout-card--basic").is_some());
    assert!(index.get("components-button--primary").is_none());
}

#[tokio::test]
async fn test_incremental_updates_match_full_rebuild() {
    let (fs, cache) = project(&[("src/Button.stories.ts", BUTTON)]);
    cache.initialize().await.unwrap();

    fs.add_file(absolute("src/Button.mdx"), BUTTON_DOCS);
    cache.apply(vec![changed("src/Button.mdx")]).await.unwrap();

    fs.add_file(absolute("src/Card.stories.ts"), CARD);
    fs.add_file(absolute("src/Button.stories.ts"), BUTTON_PRIMARY_ONLY);
    cache
        .apply(vec![changed("src/Card.stories.ts"), changed("src/Button.stories.ts")])
        .await
        .unwrap();

    fs.remove_file(&absolute("src/Button.mdx"));
    cache.apply(vec![removed("src/Button.mdx")]).await.unwrap();

    let full = generator(&fs).build().unwrap();
    let snapshot = cache.snapshot();
    assert_eq!(*snapshot.index, full.index);
    assert_eq!(snapshot.index.ids(), full.index.ids());
    assert_eq!(snapshot.diagnostics, full.diagnostics);
}

#[tokio::test]
async fn test_updates_are_announced_on_the_channel() {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file(absolute("src/Button.stories.ts"), BUTTON);
    let channel = ServerChannel::new();
    let cache = IndexCache::new(Arc::new(generator(&fs))).with_channel(channel.clone());

    let mut connection = channel.connect();
    cache.initialize().await.unwrap();

    assert_eq!(connection.next_event().await.unwrap().event_type, STORY_INDEX_INVALIDATED);
    let set_index = connection.next_event().await.unwrap();
    assert_eq!(set_index.event_type, SET_INDEX);
    assert!(set_index.payload["entries"]["components-button--primary"].is_object());

    fs.add_file(absolute("src/Button.stories.ts"), BUTTON_PRIMARY_ONLY);
    cache.apply(vec![changed("src/Button.stories.ts")]).await.unwrap();
    assert_eq!(connection.next_event().await.unwrap().event_type, STORY_INDEX_INVALIDATED);

    // A page reload gets the latest snapshot first
    let mut reloaded = channel.connect();
    let replay = reloaded.next_event().await.unwrap();
    assert_eq!(replay.event_type, SET_INDEX);
    assert!(replay.payload["entries"]["components-button--secondary"].is_null());
}
