//! Assembling a model prompt from rendered instructions and source material
//!
//! Stage prompts are always shaped the same way: the rendered template, a
//! lead-in sentence, then the material, usually as `【label】` blocks.

/// Fluent builder for stage prompts
///
/// ```
/// use esg_prompt::PromptBuilder;
///
/// let prompt = PromptBuilder::new()
///     .paragraph("请根据以下内容撰写热点聚焦。")
///     .labeled_blocks([("环境（E）章节", "欧盟通过新规"), ("社会（S）章节", "")])
///     .build_trimmed();
///
/// assert!(prompt.starts_with("请根据以下内容撰写热点聚焦。\n\n【环境（E）章节】\n欧盟通过新规"));
/// assert!(prompt.ends_with("【社会（S）章节】"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    buf: String,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text verbatim
    pub fn text(mut self, content: impl AsRef<str>) -> Self {
        self.buf.push_str(content.as_ref());
        self
    }

    pub fn blank_line(self) -> Self {
        self.text("\n\n")
    }

    /// Append trimmed text followed by a blank line; empty text is skipped
    pub fn paragraph(self, content: impl AsRef<str>) -> Self {
        let content = content.as_ref().trim();
        if content.is_empty() {
            return self;
        }
        self.text(content).blank_line()
    }

    /// Append a `【label】` heading, its trimmed content and a blank line
    pub fn labeled_block(self, label: impl AsRef<str>, content: impl AsRef<str>) -> Self {
        let block = format!("【{}】\n{}\n\n", label.as_ref(), content.as_ref().trim());
        self.text(block)
    }

    pub fn labeled_blocks<I, L, C>(self, blocks: I) -> Self
    where
        I: IntoIterator<Item = (L, C)>,
        L: AsRef<str>,
        C: AsRef<str>,
    {
        blocks
            .into_iter()
            .fold(self, |builder, (label, content)| builder.labeled_block(label, content))
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn build(self) -> String {
        self.buf
    }

    /// The prompt without leading or trailing whitespace
    pub fn build_trimmed(self) -> String {
        self.buf.trim().to_string()
    }
}
