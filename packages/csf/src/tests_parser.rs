/// Parser tests over realistic story module shapes
use crate::ast::*;
use crate::error::ParseError;
use crate::parser::{parse, MAX_NESTING};

fn export_decl<'a>(module: &'a Module, name: &str) -> Option<&'a Declarator> {
    module.items.iter().find_map(|item| match item {
        Item::ExportDecl(Declaration::Variable { declarators, .. }) => declarators
            .iter()
            .find(|d| d.name.as_deref() == Some(name)),
        _ => None,
    })
}

#[test]
fn test_typescript_meta_and_story() {
    let source = r#"
import type { Meta, StoryObj } from '@storybook/react';
import { Button } from './Button';

const meta: Meta<typeof Button> = {
  title: 'Example/Button',
  component: Button,
  tags: ['autodocs'],
  argTypes: { backgroundColor: { control: 'color' } },
} satisfies Meta<typeof Button>;

export default meta;
type Story = StoryObj<typeof meta>;

export const Primary: Story = {
  args: { primary: true, label: 'Button' },
};
"#;
    let module = parse(source).expect("Failed to parse");
    assert_eq!(module.items.len(), 6);

    match &module.items[0] {
        Item::Import(import) => {
            assert!(import.type_only);
            assert_eq!(import.source, "@storybook/react");
            assert_eq!(import.specifiers.len(), 2);
        }
        other => panic!("Expected import, got {:?}", other),
    }

    match &module.items[3] {
        Item::ExportDefault(export) => assert_eq!(export.expr.as_ident(), Some("meta")),
        other => panic!("Expected default export, got {:?}", other),
    }
    assert!(matches!(module.items[4], Item::Other(_)));

    let primary = export_decl(&module, "Primary").expect("Primary not found");
    let args = primary
        .init
        .as_ref()
        .and_then(|init| init.get("args"))
        .and_then(Expr::to_json)
        .expect("args should be static");
    assert_eq!(args, serde_json::json!({"primary": true, "label": "Button"}));
}

#[test]
fn test_template_bind_and_member_assignments() {
    let source = r#"
import React from 'react';
import { Button } from './Button';

export default {
  title: 'Legacy/Button',
  decorators: [(Story) => <div style={{ margin: '3em' }}><Story /></div>],
};

const Template = (args) => <Button {...args} />;

export const Primary = Template.bind({});
Primary.args = { label: 'Primary' };
Primary.storyName = 'The Primary';
"#;
    let module = parse(source).expect("Failed to parse");

    let assignments: Vec<&Assignment> = module
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Assignment(a) => Some(a),
            _ => None,
        })
        .collect();
    assert_eq!(assignments.len(), 2);
    assert_eq!(assignments[0].target, vec!["Primary", "args"]);
    assert_eq!(assignments[1].value.as_str(), Some("The Primary"));

    let primary = export_decl(&module, "Primary").expect("Primary not found");
    match &primary.init.as_ref().map(|e| &e.kind) {
        Some(ExprKind::Call { callee, args }) => {
            assert_eq!(
                callee.member_path(),
                Some(vec!["Template".to_string(), "bind".to_string()])
            );
            assert_eq!(args.len(), 1);
        }
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_factory_story_and_test_call() {
    let source = r#"
import preview from '#.storybook/preview';
import { Button } from './Button';

const meta = preview.meta({ component: Button, title: 'Factory/Button' });

export const Primary = meta.story({ args: { label: 'Hi' } });

Primary.test('renders the label', async ({ canvas }) => {
  await expect(canvas.getByText('Hi')).toBeVisible();
});
"#;
    let module = parse(source).expect("Failed to parse");

    let test_call = module
        .items
        .iter()
        .find_map(|item| match item {
            Item::Expression(expr) => Some(expr),
            _ => None,
        })
        .expect("test call not found");
    match &test_call.kind {
        ExprKind::Call { callee, args } => {
            assert_eq!(
                callee.member_path(),
                Some(vec!["Primary".to_string(), "test".to_string()])
            );
            assert_eq!(args[0].as_str(), Some("renders the label"));
            assert!(args[1].is_function());
        }
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_regex_and_template_literals() {
    let source = r#"
export default {
  title: `Templates/Literal`,
  excludeStories: /.*Data$/,
  includeStories: ['A'],
};
export const mockData = { items: [1, 2, 3] };
const ratio = a / b / c;
"#;
    let module = parse(source).expect("Failed to parse");
    let Item::ExportDefault(export) = &module.items[0] else {
        panic!("Expected default export");
    };
    assert_eq!(
        export.expr.get("title").and_then(Expr::as_str),
        Some("Templates/Literal")
    );
    match &export.expr.get("excludeStories").map(|e| &e.kind) {
        Some(ExprKind::Regex { pattern, flags }) => {
            assert_eq!(pattern, ".*Data$");
            assert!(flags.is_empty());
        }
        other => panic!("Expected regex, got {:?}", other),
    }
}

#[test]
fn test_type_declarations_are_skipped() {
    let source = r#"
interface Props {
  label: string;
  onClick?: () => void;
}
enum Size { Small, Large }
export type { Props };
export interface Other { a: number }
declare const foo: string;
export const A = {};
"#;
    let module = parse(source).expect("Failed to parse");
    assert_eq!(module.items.len(), 6);
    assert!(module.items[..5]
        .iter()
        .all(|item| matches!(item, Item::Other(_))));
    assert!(export_decl(&module, "A").is_some());
}

#[test]
fn test_functions_and_export_lists() {
    let source = r#"
function Helper() { return <div />; }
export function Legacy(args) { return Helper(args); }
export { Helper as Renamed, Legacy as Alias };
export * from './other';
export async function AsyncStory() {}
"#;
    let module = parse(source).expect("Failed to parse");
    assert_eq!(module.items.len(), 5);

    match &module.items[2] {
        Item::ExportNamed(named) => {
            assert_eq!(named.specifiers.len(), 2);
            assert_eq!(named.specifiers[0].local, "Helper");
            assert_eq!(named.specifiers[0].exported, "Renamed");
            assert!(named.source.is_none());
        }
        other => panic!("Expected export list, got {:?}", other),
    }
    assert!(matches!(&module.items[3], Item::ExportAll { source, .. } if source == "./other"));
    assert!(matches!(
        &module.items[4],
        Item::ExportDecl(Declaration::Function { is_async: true, .. })
    ));
}

#[test]
fn test_asi_and_comments() {
    let source = r#"
// leading comment
/* block */
export const A = { name: 'Alpha' } // trailing
export const B = {
  render: function () { return null },
  play: async ({ canvasElement }) => {},
}
"#;
    let module = parse(source).expect("Failed to parse");
    assert_eq!(module.items.len(), 2);

    let b = export_decl(&module, "B").and_then(|d| d.init.as_ref()).unwrap();
    assert!(b.get("render").map_or(false, Expr::is_function));
    assert!(b.get("play").map_or(false, Expr::is_function));
}

#[test]
fn test_jsx_text_and_fragments() {
    let source = r#"
export const WithText = {
  render: () => (
    <>
      <p>Don't panic, it's fine</p>
      <span>{'<'}</span>
    </>
  ),
};
export const After = {};
"#;
    let module = parse(source).expect("Failed to parse");
    assert!(export_decl(&module, "WithText").is_some());
    assert!(export_decl(&module, "After").is_some());
}

#[test]
fn test_jsx_text_is_not_javascript() {
    let renders = [
        "<div>don't</div>",
        "<p>It's {name}</p>",
        "<Button>Don't click</Button>",
        "<p>50% off // not a comment</p>",
        "<p>a /* b</p>",
        "<p>it's <b>bold</b> and 'quoted</p>",
    ];
    for render in renders {
        let source = format!(
            "export const A = {{\n  render: () => {},\n}};\nexport const B = {{ args: {{ n: 1 }} }};\n",
            render
        );
        let module = parse(&source).unwrap_or_else(|e| panic!("{:?} failed: {}", render, e));
        let b = export_decl(&module, "B").and_then(|d| d.init.as_ref()).unwrap();
        assert!(b.get("args").is_some(), "lost story after {:?}", render);
    }
}

#[test]
fn test_deep_nesting_is_an_error() {
    let nested = |depth: usize| format!("export const A = {}1{};", "[".repeat(depth), "]".repeat(depth));

    assert!(parse(&nested(MAX_NESTING / 2)).is_ok());
    let err = parse(&nested(MAX_NESTING * 4)).unwrap_err();
    assert!(matches!(err, ParseError::InvalidSyntax { .. }));

    let unary = format!("export const A = {}1;", "!".repeat(MAX_NESTING * 4));
    assert!(parse(&unary).is_err());
}

#[test]
fn test_unicode_binding_names() {
    let module = parse("export const 𝒜 = {};\nexport const Ünïcode = {};").expect("Failed to parse");
    assert!(export_decl(&module, "𝒜").is_some());
    assert!(export_decl(&module, "Ünïcode").is_some());
}

#[test]
fn test_generic_arrow_function() {
    let source = "const identity = <T,>(value: T): T => value;\nexport const A = {};";
    let module = parse(source).expect("Failed to parse");
    match &module.items[0] {
        Item::Declaration(Declaration::Variable { declarators, .. }) => {
            assert!(declarators[0].init.as_ref().unwrap().is_function());
        }
        other => panic!("Expected declaration, got {:?}", other),
    }
}

#[test]
fn test_object_key_forms() {
    let source = r#"
export const Complex = {
  ...Base,
  [key]: 1,
  42: 'answer',
  'quoted-key': true,
  get computed() { return 1; },
  async loader() { return {}; },
  render(args) { return null; },
  args: { min: -5, total: 1 + 2, ratio: .5 },
};
"#;
    let module = parse(source).expect("Failed to parse");
    let complex = export_decl(&module, "Complex")
        .and_then(|d| d.init.as_ref())
        .unwrap();

    assert_eq!(
        complex.to_json(),
        Some(serde_json::json!({
            "42": "answer",
            "quoted-key": true,
            "args": { "min": -5, "ratio": 0.5 }
        }))
    );
    assert!(complex.get("loader").map_or(false, Expr::is_function));
}

#[test]
fn test_missing_binding_name_is_error() {
    let err = parse("export const = 1;").unwrap_err();
    match err {
        ParseError::UnexpectedToken { span, expected, .. } => {
            assert_eq!(span, 13..14);
            assert_eq!(expected, "binding name");
        }
        other => panic!("Expected unexpected token, got {:?}", other),
    }
}

#[test]
fn test_unterminated_object_is_error() {
    let err = parse("export default {\n  title: 'x',\n").unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEof { .. }));
}

#[test]
fn test_missing_comma_reports_location() {
    let source = "export const A = {\n  a: 1\n  b: 2\n};";
    let err = parse(source).unwrap_err();
    let location = err.location(source);
    assert_eq!(location.line, 3);
    assert_eq!(location.column, 3);
}

#[test]
fn test_directive_and_control_flow() {
    let source = r#"'use client';
if (typeof window !== 'undefined') {
  window.__flag = true;
} else {
  console.log('server');
}
export default { title: 'Directive' };
"#;
    let module = parse(source).expect("Failed to parse");
    assert!(module
        .items
        .iter()
        .any(|item| matches!(item, Item::ExportDefault(_))));
}
