//! The instruction contract sent to the model.
//!
//! The whole document text is embedded in one user prompt together with the
//! record shape the table stage expects. Callers can override the template
//! via [`crate::config::ExtractionConfig::prompt_template`]; the override
//! must keep the [`PDF_TEXT_PLACEHOLDER`] so the text has somewhere to go.

/// Placeholder replaced by the extracted document text.
pub const PDF_TEXT_PLACEHOLDER: &str = "{pdf_text}";

/// Default product-extraction prompt.
///
/// The field list mirrors [`crate::output::ProductRecord`]. Rules 3 and 4
/// exist because models otherwise quote customer reviews verbatim and wrap
/// the array in explanations; the reply parser tolerates the latter anyway.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"Extract details for each product mentioned in the given text and structure them into **valid JSON** format.

Each product should be stored in a **list**, where each entry represents a unique product with:
- 'product_name' (string)
- 'product_attributes' (dictionary with key features like type, operating system, RAM, storage, etc.)
- 'features' (list of strings)
- 'specifications' (dictionary with display details, battery life, dimensions, charging methods, and rating)
- 'review_summary' (a brief summary of overall product reviews, highlighting strengths and weaknesses, but **NOT including individual customer reviews**)

Given pdf_text:
{pdf_text}

**Important Instructions:**
1. Multiple products must be **stored in a list**, ensuring each product appears in a separate JSON entry.
2. Ensure the response is a **valid JSON array** starting with '[' and ending with ']'.
3. The 'review_summary' field must provide an overall sentiment analysis of the product's reviews, **excluding individual customer reviews**.
4. **Do NOT include explanations, comments, or any extra text** outside of the JSON structure."#;

/// Render the prompt for `pdf_text`, using `template` when given.
///
/// The text is inserted literally; only the first placeholder is replaced so
/// a document that happens to contain `{pdf_text}` is left untouched.
pub fn build_extraction_prompt(pdf_text: &str, template: Option<&str>) -> String {
    let template = template.unwrap_or(DEFAULT_EXTRACTION_PROMPT);
    template.replacen(PDF_TEXT_PLACEHOLDER, pdf_text, 1)
}
