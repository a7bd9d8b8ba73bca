/// Options controlling how a [`TagFile`](crate::TagFile) is loaded and rewritten
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct TagOptions {
    pub(crate) padding: u32,
    pub(crate) ape_search_chunk: usize,
    pub(crate) open_retries: u8,
    pub(crate) read_ape: bool,
}

impl TagOptions {
    /// Padding written after the frames when the tag outgrows its old space
    pub const DEFAULT_PADDING: u32 = 2048;

    /// Window size of the backward APEv2 search
    pub const DEFAULT_APE_SEARCH_CHUNK: usize = 4096;

    /// Creates a new `TagOptions`, alias for `Default` implementation
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mp3tags::TagOptions;
    ///
    /// let options = TagOptions::new();
    /// ```
    pub const fn new() -> Self {
        Self {
            padding: Self::DEFAULT_PADDING,
            ape_search_chunk: Self::DEFAULT_APE_SEARCH_CHUNK,
            open_retries: 1,
            read_ape: true,
        }
    }

    /// Set the padding size in bytes
    ///
    /// Only used when the rewritten frames no longer fit in the space the old
    /// tag occupied, which forces the audio data to move. A larger value makes
    /// the next growth cheaper.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mp3tags::TagOptions;
    ///
    /// let options = TagOptions::new().padding(8192);
    /// ```
    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Set the window size of the backward APEv2 search
    ///
    /// A zero value falls back to the default.
    pub fn ape_search_chunk(mut self, chunk: usize) -> Self {
        self.ape_search_chunk = match chunk {
            0 => Self::DEFAULT_APE_SEARCH_CHUNK,
            n => n,
        };
        self
    }

    /// Extra attempts at opening the file for writing
    ///
    /// Virus scanners and indexers briefly hold freshly written files open.
    pub fn open_retries(mut self, retries: u8) -> Self {
        self.open_retries = retries;
        self
    }

    /// Whether loading looks for an APEv2 tag
    pub fn read_ape(mut self, read_ape: bool) -> Self {
        self.read_ape = read_ape;
        self
    }
}

impl Default for TagOptions {
    /// The defaults are as follows:
    ///
    /// ```rust,ignore
    /// TagOptions {
    ///     padding: 2048,
    ///     ape_search_chunk: 4096,
    ///     open_retries: 1,
    ///     read_ape: true,
    /// }
    /// ```
    fn default() -> Self {
        Self::new()
    }
}
