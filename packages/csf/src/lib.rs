pub mod ast;
pub mod csf;
pub mod docs;
pub mod error;
pub mod ids;
pub mod lexer;
pub mod parser;

#[cfg(test)]
mod tests_csf;
#[cfg(test)]
mod tests_parser;

pub use csf::{CsfFile, CsfMeta, CsfStory, CsfTest, MakeTitle, StoryKind, PLAY_FN_TAG, TEST_FN_TAG};
pub use docs::DocsFile;
#[cfg(feature = "pretty-errors")]
pub use error::format_error;
pub use error::{CsfError, CsfResult, Location, ParseError, ParseResult};
pub use ids::{
    is_export_story, sanitize, story_name_from_export, to_id, to_test_id, ExportMatcher, IdError,
};
pub use lexer::{tokenize, Token};
pub use parser::{parse, Parser};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer_basic() {
        let source = "export default { title: 'Button' };";
        let tokens = tokenize(source);
        assert_eq!(tokens.len(), 8);
    }
}
