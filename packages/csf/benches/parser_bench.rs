use criterion::{black_box, criterion_group, criterion_main, Criterion};
use storyloom_csf::{parse, tokenize, CsfFile};

const BUTTON_STORIES: &str = r#"
import type { Meta, StoryObj } from '@storybook/react';
import { fn } from '@storybook/test';
import { Button } from './Button';

const meta = {
  title: 'Example/Button',
  component: Button,
  parameters: { layout: 'centered' },
  tags: ['autodocs'],
  argTypes: { backgroundColor: { control: 'color' } },
  args: { onClick: fn() },
} satisfies Meta<typeof Button>;

export default meta;
type Story = StoryObj<typeof meta>;

export const Primary: Story = {
  args: { primary: true, label: 'Button' },
};

export const Secondary: Story = {
  args: { label: 'Button' },
};

export const Large: Story = {
  args: { size: 'large', label: 'Button' },
  render: (args) => <Button {...args} />,
};
"#;

fn title(user_title: Option<&str>) -> Option<String> {
    Some(user_title.unwrap_or("Bench").to_string())
}

fn parse_button_stories(c: &mut Criterion) {
    c.bench_function("parse_button_stories", |b| {
        b.iter(|| parse(black_box(BUTTON_STORIES)))
    });
}

fn analyze_button_stories(c: &mut Criterion) {
    c.bench_function("analyze_button_stories", |b| {
        b.iter(|| CsfFile::parse(black_box(BUTTON_STORIES), "Button.stories.tsx", &title))
    });
}

fn analyze_large_file(c: &mut Criterion) {
    let mut source = String::from("export default { title: 'Large/File' };\n");
    for i in 0..200 {
        source.push_str(&format!(
            r#"
const Template{i} = (args) => <Component{i} {{...args}} />;
export const Story{i} = Template{i}.bind({{}});
Story{i}.args = {{ index: {i}, label: 'Story {i}', nested: {{ flag: true }} }};
Story{i}.storyName = 'Story number {i}';
"#,
        ));
    }

    c.bench_function("analyze_large_file_1000_lines", |b| {
        b.iter(|| CsfFile::parse(black_box(&source), "Large.stories.jsx", &title))
    });
}

fn tokenize_only(c: &mut Criterion) {
    c.bench_function("tokenize_only", |b| {
        b.iter(|| tokenize(black_box(BUTTON_STORIES)))
    });
}

criterion_group!(
    benches,
    parse_button_stories,
    analyze_button_stories,
    analyze_large_file,
    tokenize_only
);
criterion_main!(benches);
