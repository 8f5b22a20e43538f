//! Helpers to parse module source into a script AST.
use swc_common::{sync::Lrc, BytePos, FileName, SourceFile, SourceMap};
use swc_ecma_ast::{EsVersion, Script};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax};

use crate::error::TraceError;

/// A parsed script together with the source file it was parsed from,
/// so byte offsets can be recovered from AST spans.
pub struct ParsedScript {
    /// Source file registered with the source map.
    pub fm: Lrc<SourceFile>,
    /// The parsed AST.
    pub script: Script,
}

impl ParsedScript {
    /// Translate a span position into a byte offset in the source text.
    pub fn offset_of(&self, pos: BytePos) -> usize {
        (pos.0 - self.fm.start_pos.0) as usize
    }
}

/// Parse module contents as a script.
///
/// AMD and CommonJS modules are scripts, not ES modules; sources using
/// `import`/`export` syntax are rejected with a parse error.
pub fn parse_script(id: &str, contents: &str) -> Result<ParsedScript, TraceError> {
    let sm: Lrc<SourceMap> = Default::default();
    let fm = sm
        .new_source_file(FileName::Custom(id.to_string()), contents.to_string());

    let lexer = Lexer::new(
        Syntax::Es(Default::default()),
        EsVersion::Es2022,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let script = parser.parse_script().map_err(|e| TraceError::Parse {
        id: id.to_string(),
        reason: e.into_kind().msg().to_string(),
    })?;

    Ok(ParsedScript { fm, script })
}
