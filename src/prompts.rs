//! Prompts sent to the language model.
//!
//! Every instruction the pipeline gives the model lives here so prompt changes
//! never touch the call or parsing code, and tests can inspect the exact text.

/// Instructions for turning a template into a list of fields to fill.
///
/// The worked example anchors the output format: one short label per line,
/// nothing else.
pub const EXTRACT_FIELDS_PROMPT: &str = r#"You are an AI assistant specialized in analyzing legal documents. Your task is to extract
the required information fields that a user needs to fill in a given legal document.

**Instructions:**
1. Read the provided legal document.
2. Identify all the placeholders, underscores, or missing information that a user must fill.
3. Return only a list of required fields, without explaining anything else.
4. Each extracted field should be a short, clear phrase (e.g., "Full Name", "Father's Name", "NIC Number").
5. If the document does not require any user input, return an empty list.

**Example Input Document:**
```
A F F I D A V I T
I, _______________ S/o _________________ resident of
__________________________________________________________ do hereby solemnly
affirm and declare as under: -
1. That I am residing in district Rawalpindi since _____________ .
2. That I never migrated to India on or after 1st March 1947.
3. That the particulars furnished by me in the application forms for the grant of
domicile certificate are correct.
4. That I neither obtained nor shall obtain the same from any other district of
Pakistan after having been granted this one.
Deponent.  __________________________
NIC NO.  __________________________
```

**Expected Output:**
```
Full Name of Deponent
Father's Name
Residential Address
Duration of residence in District Rawalpindi
NIC Number
```

**Now process the following document and extract required fields:**
```
{{document}}
```"#;

/// Instructions for filling a template with the user's answers.
pub const FILL_DOCUMENT_PROMPT: &str = r#"You are an AI assistant tasked with helping users create legal documents.
Your job is to take a template of a legal document (which contains placeholders for certain pieces of information)
and then fill in the placeholders with the information provided by the user.

Inputs:
1. Template document: {{document}}
2. User Information: {{information}}

Please fill in the placeholders and return a neatly formatted document.
Also keep the indentation and formatting consistent with the original document."#;

/// Appended to [`FILL_DOCUMENT_PROMPT`] when a LaTeX skeleton is available.
pub const LATEX_SKELETON_SUFFIX: &str = r#"

3. LaTeX skeleton: {{skeleton}}

The LaTeX skeleton reproduces the layout of the original document. Fill the
placeholders inside the skeleton and return the complete LaTeX source, from
\documentclass to \end{document}. Output ONLY the LaTeX source, with no
commentary and no Markdown fences."#;

/// Appended when LaTeX output is wanted but no skeleton exists.
pub const LATEX_OUTPUT_SUFFIX: &str = r#"

Return the filled document as a complete, compilable LaTeX source, from
\documentclass to \end{document}. Output ONLY the LaTeX source, with no
commentary and no Markdown fences."#;

/// Instruction sent with each rasterised template page during ingestion.
pub const IMAGE_TO_LATEX_PROMPT: &str = "Convert this image to LaTeX code.";

/// Build the field-extraction prompt for `document`.
pub fn extract_fields_prompt(document: &str) -> String {
    substitute(EXTRACT_FIELDS_PROMPT, &[("{{document}}", document)])
}

/// Build the fill prompt.
///
/// `latex` selects LaTeX output; `skeleton` is the stored LaTeX rendition of
/// the template, if any.
pub fn fill_document_prompt(
    document: &str,
    information: &str,
    skeleton: Option<&str>,
    latex: bool,
) -> String {
    let mut prompt = FILL_DOCUMENT_PROMPT.to_string();
    match (latex, skeleton) {
        (true, Some(_)) => prompt.push_str(LATEX_SKELETON_SUFFIX),
        (true, None) => prompt.push_str(LATEX_OUTPUT_SUFFIX),
        (false, _) => {}
    }
    substitute(
        &prompt,
        &[
            ("{{document}}", document),
            ("{{information}}", information),
            ("{{skeleton}}", skeleton.unwrap_or_default()),
        ],
    )
}

/// Single-pass placeholder substitution: inserted text is never rescanned,
/// so a template containing `{{information}}` stays literal.
fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match vars.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
