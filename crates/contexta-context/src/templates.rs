/// Prompt used by [`crate::LlmSummarizer`].
///
/// `<previous_summary>` is replaced with the summary the refined prefix
/// starts from, or "None".
pub const DEFAULT_SUMMARIZATION_PROMPT: &str = "\
You maintain a running summary of a conversation so it can continue after \
older turns are dropped from the context window.

Current summary:
<previous_summary>

Extend the current summary with the new lines of conversation below. Keep \
facts, decisions, names, numbers and open questions. Drop pleasantries. \
Write in the third person, as plain prose, with no preamble.";
