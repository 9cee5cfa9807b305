//! Prompt templates.
//!
//! Each template is a plain function over a parameter struct. The negative
//! constraints and the JSON schema are appended by the builder, never by the
//! templates themselves.

/// Word and phrase ban list included in every prompt.
pub const NEGATIVE_CONSTRAINTS: &str = r#"NEGATIVE CONSTRAINTS (CRITICAL):
1.  **FORBIDDEN VOCABULARY**: Strictly do NOT use the following words or phrases. They make the text sound robotic and AI-generated:
    - "Delve", "Dive in", "In this article", "In the realm of", "Landscape", "Tapestry", "Testament", "Underscore", "Showcase"
    - "Pivotal", "Nuanced", "Resonate", "It is important to note", "Furthermore", "Moreover", "In conclusion"
    - "Breathtaking", "Stunning", "Seamless", "Immersive" (unless describing VR).
2.  **NO FLUFF**: Do not use generic openers like "In the fast-paced world of..." or "Let's explore...".
3.  **NO HEDGING**: Be confident. Don't say "It remains to be seen." Say "We are waiting to see."
4.  **HUMAN VARIANCE**: Do not start every sentence with "The [Noun]..." or "With [Noun]...". Vary your sentence structure."#;

/// Output contract the normalizer expects.
pub const JSON_SCHEMA: &str = r#"{
  "htmlContent": "<p>...</p>",
  "seo": {
    "focusKeyphrase": "Main keyword",
    "longTailKeyword": "Specific search phrase",
    "seoTitle": "Optimized Title",
    "metaDescription": "Summary",
    "slug": "url-slug",
    "imageAlt": "Alt text",
    "synonyms": "keyword1, keyword2"
  }
}"#;

/// Style lines computed from the campaign and the source analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleFragments {
    pub tone: String,
    /// Empty when no brand voice applies.
    pub voice: String,
    pub audience: String,
    pub length: String,
    pub headings: String,
    pub summary: String,
}

impl StyleFragments {
    fn tone_block(&self) -> String {
        let mut block = format!("TONE & STYLE:\n- {}\n- {}", self.tone, self.audience);
        if !self.voice.is_empty() {
            block.push_str("\n- ");
            block.push_str(&self.voice);
        }
        block
    }

    fn shape_block(&self) -> String {
        format!("{}\n{}\n{}", self.length, self.headings, self.summary)
    }
}

#[derive(Debug, Clone)]
pub struct RewriteParams<'a> {
    pub category: &'a str,
    pub language: &'a str,
    pub source_title: &'a str,
    /// Source body as HTML.
    pub source_content: &'a str,
    /// Numbered `PARAGRAPH k:` block, only used by the strict template.
    pub paragraphs: &'a str,
    pub paragraph_count: usize,
    pub style: &'a StyleFragments,
    pub existing_context: &'a str,
}

#[derive(Debug, Clone)]
pub struct DirectParams<'a> {
    pub category: &'a str,
    pub language: &'a str,
    pub source_url: &'a str,
    pub tone: &'a str,
    pub audience: &'a str,
    pub brand_voice: &'a str,
    pub min_words: usize,
    pub max_words: usize,
}

const HTML_RULES: &str = "FORMATTING:\n\
- Output valid HTML for 'htmlContent' using <p>, <h2>, <h3>, <ul> and <li>.\n\
- Never use <h1>, <html> or <body> tags.\n\
- Drop external links, \"Read More\" prompts and calls to action found in the source.";

const JSON_ONLY: &str = "OUTPUT FORMAT:\nReturn ONLY a JSON object, without markdown fences.";

/// One-to-one paragraph rewrite at low temperature.
pub fn strict(p: &RewriteParams<'_>) -> String {
    let n = p.paragraph_count;
    format!(
        r#"You are an experienced human editor for a "{category}" blog.
Rewrite the source text PARAGRAPH BY PARAGRAPH.

LANGUAGE: Write entirely in {language}.

STRICT REWRITE RULES:
1. **One-to-one mapping**: The source has {n} paragraphs. 'htmlContent' must contain exactly {n} paragraphs.
   - Source paragraph 1 becomes your paragraph 1
   - Source paragraph 2 becomes your paragraph 2
   - and so on, in order.
2. **Facts only**: Add no opinions, outside facts or predictions. Rewrite only what is there.
3. **Same flow**: Topics appear in the same order as in the source.

{tone_block}

SEO INSTRUCTIONS:
- Derive the focus keyphrase from the main entity of the text.
- SEO title: under 60 characters, includes the keyphrase, worth clicking.
- Meta description: under 160 characters, written as a hook.

SOURCE TITLE: "{title}"
SOURCE PARAGRAPHS (plain text):
{paragraphs}
EXISTING POSTS (link internally only when relevant):
{context}

{html_rules}

{json_only}"#,
        category = p.category,
        language = p.language,
        tone_block = p.style.tone_block(),
        title = p.source_title,
        paragraphs = p.paragraphs,
        context = p.existing_context,
        html_rules = HTML_RULES,
        json_only = JSON_ONLY,
    )
}

/// Faithful paraphrase in fresh wording.
pub fn normal(p: &RewriteParams<'_>) -> String {
    format!(
        r#"You are a professional journalist for a "{category}" website.
Rewrite the source article so it is unique and free of plagiarism while keeping its meaning.

LANGUAGE: Write entirely in {language}.

REWRITE GUIDELINES:
1. **Own words**: Understand the core message, then write it yourself.
2. **Plain speech**: Follow the forbidden vocabulary list strictly.
3. **Keep the facts**: Names, dates and numbers stay exactly as they are. Analysis and description may be rephrased.
4. **Short paragraphs**: Two or three sentences per paragraph at most.

{tone_block}

{shape_block}

SOURCE TITLE: "{title}"
SOURCE CONTENT:
{content}

EXISTING POSTS:
{context}

{html_rules}

{json_only}"#,
        category = p.category,
        language = p.language,
        tone_block = p.style.tone_block(),
        shape_block = p.style.shape_block(),
        title = p.source_title,
        content = p.source_content,
        context = p.existing_context,
        html_rules = HTML_RULES,
        json_only = JSON_ONLY,
    )
}

/// Free restructuring for engagement, facts still fixed.
pub fn loose(p: &RewriteParams<'_>) -> String {
    format!(
        r#"You are a creative senior columnist for a "{category}" blog.
Retell the source story so it is more engaging.

LANGUAGE: Write entirely in {language}.

CREATIVE RULES:
1. **Hook**: Open with the most interesting angle instead of repeating the news.
2. **Talk to the reader**: A rhetorical question or direct address is welcome.
3. **Freedom**: Merge paragraphs, reorder points and add context where it helps the reader.
4. **Accuracy**: Never invent quotes or numbers.

{tone_block}
- Keep it punchy: mix short sentences with longer ones.

{shape_block}

SOURCE TITLE: "{title}"
SOURCE CONTENT:
{content}

EXISTING POSTS:
{context}

{html_rules}

{json_only}"#,
        category = p.category,
        language = p.language,
        tone_block = p.style.tone_block(),
        shape_block = p.style.shape_block(),
        title = p.source_title,
        content = p.source_content,
        context = p.existing_context,
        html_rules = HTML_RULES,
        json_only = JSON_ONLY,
    )
}

/// Single-shot prompt asking the provider to read the URL itself.
pub fn direct_url(p: &DirectParams<'_>) -> String {
    let voice = if p.brand_voice.is_empty() {
        String::new()
    } else {
        format!("\nBRAND VOICE: {}", p.brand_voice)
    };
    format!(
        r#"You are a professional web editor for a "{category}" blog.
Read the page at the URL below, understand it, and write a fresh, original article based on it.

LANGUAGE: Write entirely in {language}.

INPUT URL: {url}

WRITING RULES:
1. **Fresh perspective**: Explain why this matters to the reader instead of summarising.
2. **Structure**: Hook, then a body with <h2> headings, then a conclusion.
3. **No copying**: Paraphrase everything; never reuse source sentences.
4. **Formatting**: Clean HTML (<p>, <h2>, <ul>, <strong>). No <h1>.

TONE: {tone}
TARGET AUDIENCE: {audience}{voice}

LENGTH: {min} - {max} words.

Do not wrap the JSON in markdown code blocks."#,
        category = p.category,
        language = p.language,
        url = p.source_url,
        tone = p.tone,
        audience = p.audience,
        voice = voice,
        min = p.min_words,
        max = p.max_words,
    )
}
