/// Resource limits applied while parsing.
///
/// ```
/// use sdevice_syntax::ParseOptions;
///
/// let opts = ParseOptions::new().max_depth(64).max_input_len(1 << 20);
/// assert_eq!(opts.depth_limit(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    max_input_len: usize,
    max_depth: usize,
}

impl ParseOptions {
    /// 64 MiB of input.
    pub const DEFAULT_MAX_INPUT_LEN: usize = 64 * 1024 * 1024;
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_input_len: Self::DEFAULT_MAX_INPUT_LEN,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }

    /// Reject inputs longer than `bytes`.
    #[must_use]
    pub const fn max_input_len(mut self, bytes: usize) -> Self {
        self.max_input_len = bytes;
        self
    }

    /// Reject inputs nesting deeper than `depth` constructs.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub const fn input_len_limit(&self) -> usize {
        self.max_input_len
    }

    #[must_use]
    pub const fn depth_limit(&self) -> usize {
        self.max_depth
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new()
    }
}
