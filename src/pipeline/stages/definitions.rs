use crate::error::StreamPipeResult;
use crate::logger::LogLevel;
use crate::pipeline::adapter::{text_stage, TextFn, TextStage};
use crate::pipeline::{Mode, PipeValue, Stage, StageOptions, TextBuffer};

/// Keyword used when no `keyword` option is given
pub const DEFAULT_KEYWORD: &str = "def";

/// Name defined on `line`, if the line opens a definition
///
/// `"  def foo(a, b):"` yields `foo`. The keyword must be followed by
/// whitespace, so `define = 1` is not a definition.
pub fn definition_name<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.trim().strip_prefix(keyword)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let name = rest.split('(').next().unwrap_or_default().trim();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Write the name of every definition in the input, one per line
pub fn definitions(
    out: &mut TextBuffer,
    input: &mut PipeValue,
    options: &StageOptions,
) -> StreamPipeResult<()> {
    let keyword = if options.has("keyword") {
        options.get_string("keyword")?
    } else {
        DEFAULT_KEYWORD.to_string()
    };

    let text = input.read_text()?;
    let mut found = 0usize;
    for name in text.lines().filter_map(|line| definition_name(line, &keyword)) {
        out.push_str(name);
        out.push_str("\n");
        found += 1;
    }

    crate::app_log!(
        LogLevel::Debug,
        "pipeline::definitions",
        "Found {} '{}' definitions",
        found,
        keyword
    );
    Ok(())
}

/// Text stage running [`definitions`]
///
/// # Options
/// - `keyword` (string, default `"def"`)
pub struct DefinitionsStage {
    inner: TextStage<TextFn>,
}

impl DefinitionsStage {
    /// Create a new definitions stage
    pub fn new() -> Self {
        Self {
            inner: text_stage("definitions", definitions as TextFn),
        }
    }
}

impl Default for DefinitionsStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for DefinitionsStage {
    fn apply(&self, input: &mut PipeValue, options: &StageOptions) -> StreamPipeResult<PipeValue> {
        self.inner.apply(input, options)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn output_mode(&self) -> Option<Mode> {
        Some(Mode::Text)
    }
}
