/// Story extraction tests across CSF versions
use crate::csf::{CsfFile, StoryKind, PLAY_FN_TAG, TEST_FN_TAG};
use crate::error::{CsfError, Location};
use serde_json::json;

fn auto_title(user_title: Option<&str>) -> Option<String> {
    Some(user_title.unwrap_or("Auto/Title").to_string())
}

fn parse(source: &str) -> CsfFile {
    CsfFile::parse(source, "Button.stories.tsx", &auto_title).expect("Failed to parse stories")
}

fn export_names(csf: &CsfFile) -> Vec<&str> {
    csf.stories.iter().map(|s| s.export_name.as_str()).collect()
}

#[test]
fn test_csf3_objects() {
    let csf = parse(
        r#"
import type { Meta, StoryObj } from '@storybook/react';
import { Button } from './Button';

const meta = {
  title: 'Example/Button',
  component: Button,
  tags: ['autodocs'],
  parameters: { layout: 'centered' },
} satisfies Meta<typeof Button>;
export default meta;

export const Primary: StoryObj<typeof meta> = {
  args: { primary: true, label: 'Button' },
  tags: ['!test'],
};

export const Clicked: StoryObj<typeof meta> = {
  play: async ({ canvasElement }) => {},
};
"#,
    );

    assert_eq!(csf.title, "Example/Button");
    assert_eq!(csf.meta.component.as_deref(), Some("Button"));
    assert_eq!(csf.meta.tags, vec!["autodocs"]);
    assert_eq!(csf.meta.parameters, Some(json!({"layout": "centered"})));
    assert_eq!(csf.imports, vec!["./Button"]);

    let primary = csf.story("Primary").unwrap();
    assert_eq!(primary.id, "example-button--primary");
    assert_eq!(primary.name, "Primary");
    assert_eq!(primary.kind, StoryKind::Object);
    assert_eq!(primary.tags, vec!["!test"]);
    assert_eq!(primary.args, Some(json!({"primary": true, "label": "Button"})));
    assert_eq!(primary.location, Location { line: 13, column: 14 });

    let clicked = csf.story("Clicked").unwrap();
    assert_eq!(clicked.tags, vec![PLAY_FN_TAG]);
}

#[test]
fn test_csf2_template_bind_with_assignments() {
    let csf = parse(
        r#"
export default { title: 'Legacy/Button' };

const Template = (args) => <Button {...args} />;

export const Primary = Template.bind({});
Primary.args = { label: 'Primary' };
Primary.storyName = 'The Primary';
Primary.play = async () => {};
"#,
    );

    let primary = csf.story("Primary").unwrap();
    assert_eq!(primary.kind, StoryKind::Function);
    assert_eq!(primary.id, "legacy-button--primary");
    assert_eq!(primary.name, "The Primary");
    assert_eq!(primary.args, Some(json!({"label": "Primary"})));
    assert_eq!(primary.tags, vec![PLAY_FN_TAG]);
}

#[test]
fn test_csf1_functions() {
    let csf = parse(
        r#"
export default { title: 'Legacy/Functions' };
export const Basic = () => <Button />;
export function WithArgs(args) { return <Button {...args} />; }
Basic.story = { name: 'Very Basic' };
"#,
    );

    assert_eq!(export_names(&csf), vec!["Basic", "WithArgs"]);
    assert_eq!(csf.stories[0].name, "Very Basic");
    assert_eq!(csf.stories[1].id, "legacy-functions--with-args");
    assert_eq!(csf.stories[1].name, "With Args");
    assert!(csf.stories.iter().all(|s| s.kind == StoryKind::Function));
}

#[test]
fn test_name_precedence() {
    let csf = parse(
        r#"
export default { title: 'Names' };
export const A = { name: 'Object Name' };
A.storyName = 'Assigned Name';
export const B = {};
B.storyName = 'Assigned B';
export const someLongExport = {};
"#,
    );

    assert_eq!(csf.stories[0].name, "Object Name");
    assert_eq!(csf.stories[0].id, "names--a");
    assert_eq!(csf.stories[1].name, "Assigned B");
    assert_eq!(csf.stories[2].name, "Some Long Export");
    assert_eq!(csf.stories[2].id, "names--some-long-export");
}

#[test]
fn test_include_and_exclude_stories() {
    let csf = parse(
        r#"
export default {
  title: 'Filtered',
  includeStories: ['Primary', 'mockData', 'Secondary'],
  excludeStories: /.*Data$/,
};
export const Primary = {};
export const Secondary = {};
export const mockData = { items: [] };
export const Hidden = {};
"#,
    );

    assert_eq!(export_names(&csf), vec!["Primary", "Secondary"]);
}

#[test]
fn test_named_exports_order() {
    let csf = parse(
        r#"
export default { title: 'Ordered' };
export const A = {};
export const B = {};
export const C = {};
export const __namedExportsOrder = ['C', 'A', 'B'];
"#,
    );
    assert_eq!(export_names(&csf), vec!["C", "A", "B"]);

    let err = CsfFile::parse(
        r#"
export default { title: 'Ordered' };
export const A = {};
export const B = {};
export const __namedExportsOrder = ['A'];
"#,
        "Ordered.stories.ts",
        &auto_title,
    )
    .unwrap_err();
    assert!(err.to_string().contains("Missing exports after sort: B"));
}

#[test]
fn test_factory_meta_and_tests() {
    let csf = parse(
        r#"
import preview from '#.storybook/preview';
import { Button } from './Button';

const meta = preview.meta({ component: Button, tags: ['autodocs'] });

export const Primary = meta.story({ args: { label: 'Hi' }, play: async () => {} });

Primary.test('renders the label', async () => {});
Primary.test('is accessible', { tags: ['a11y'] }, async () => {});
"#,
    );

    assert_eq!(csf.title, "Auto/Title");
    assert_eq!(csf.meta.tags, vec!["autodocs"]);

    let primary = csf.story("Primary").unwrap();
    assert_eq!(primary.kind, StoryKind::Factory);
    assert_eq!(primary.id, "auto-title--primary");
    assert_eq!(primary.args, Some(json!({"label": "Hi"})));
    assert_eq!(primary.tags, vec![PLAY_FN_TAG]);

    assert_eq!(primary.tests.len(), 2);
    assert_eq!(primary.tests[0].id, "auto-title--primary:renders-the-label");
    assert_eq!(primary.tests[0].name, "renders the label");
    assert_eq!(primary.tests[0].tags, vec![TEST_FN_TAG]);
    assert_eq!(primary.tests[1].id, "auto-title--primary:is-accessible");
    assert_eq!(primary.tests[1].tags, vec!["a11y", TEST_FN_TAG]);
}

#[test]
fn test_export_list_with_default_alias() {
    let csf = parse(
        r#"
const meta = { title: 'Reexport' };
const Base = { args: { a: 1 } };
function Fn() { return null; }
export { meta as default, Base as Primary, Fn };
"#,
    );

    assert_eq!(export_names(&csf), vec!["Primary", "Fn"]);
    assert_eq!(csf.stories[0].id, "reexport--primary");
    assert_eq!(csf.stories[0].args, Some(json!({"a": 1})));
    assert_eq!(csf.stories[1].kind, StoryKind::Function);
}

#[test]
fn test_meta_id_overrides_title_in_ids() {
    let csf = parse(
        r#"
export default { title: 'Components/Button', id: 'custom-button' };
export const Primary = {};
export const Pinned = { parameters: { __id: 'pinned-story' } };
"#,
    );

    assert_eq!(csf.title, "Components/Button");
    assert_eq!(csf.stories[0].id, "custom-button--primary");
    assert_eq!(csf.stories[1].id, "pinned-story");
}

#[test]
fn test_missing_meta() {
    let err = CsfFile::parse("export const A = {};", "A.stories.ts", &auto_title).unwrap_err();
    assert_eq!(err, CsfError::missing_meta("A.stories.ts"));
}

#[test]
fn test_dynamic_title_is_rejected() {
    let err = CsfFile::parse(
        "export default { title: getTitle() };\nexport const A = {};",
        "A.stories.ts",
        &auto_title,
    )
    .unwrap_err();
    assert!(matches!(err, CsfError::InvalidMeta { .. }));
}

#[test]
fn test_missing_title() {
    let no_title = |_: Option<&str>| -> Option<String> { None };
    let err = CsfFile::parse(
        "export default {};\nexport const A = {};",
        "A.stories.ts",
        &no_title,
    )
    .unwrap_err();
    assert_eq!(err, CsfError::missing_title("A.stories.ts"));
}

#[test]
fn test_syntax_error_has_file_and_location() {
    let err = CsfFile::parse(
        "export default {\n  title: 'Broken'\n  component: Button,\n};",
        "Broken.stories.tsx",
        &auto_title,
    )
    .unwrap_err();

    assert_eq!(err.location(), Some(Location { line: 3, column: 3 }));
    assert!(err.to_string().starts_with("Broken.stories.tsx:3:3"));
}

#[test]
fn test_parsing_is_idempotent() {
    let source = r#"
export default { title: 'Stable', tags: ['a'] };
export const One = { tags: ['b'] };
export const Two = () => null;
Two.storyName = 'Second';
"#;
    let first = parse(source);
    let second = parse(source);
    assert_eq!(first, second);
}
