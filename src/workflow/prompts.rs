//! Prompt text used by the stages.

use super::query::{CodeLanguage, DocumentFormat};

pub const QUERY_TYPE: &str = concat!(
    "You are a query classification agent.\n",
    "Classify if this query requires generation (code/document) or can be answered directly.\n",
    "Analyze the query and determine:\n",
    "1. If it's a simple query (no code or document generation requested): set 'type' to 'simple'\n",
    "2. If it's a complex query (needs code/doc generation): set 'type' to 'complex'\n",
    "3. Determine if it needs web search (needs recent info, past cutoff date): set 'needs_web_search' boolean\n",
    "4. Determine if it needs document processing (has additional context): set 'needs_document_processing' boolean\n",
    r#"Return JSON: {"type": "simple" or "complex", "needs_web_search": boolean, "needs_document_processing": boolean}"#,
);

pub const UPDATE_DETECTION: &str = concat!(
    "You decide whether a request asks to change an artifact (code or document) that was generated earlier, ",
    "as opposed to creating something new or asking a question.\n",
    "If it is an update, extract the name of the artifact being changed, exactly as the user refers to it.\n",
    r#"Return JSON: {"is_update": boolean, "file_identifier": string or null}"#,
);

pub const IDENTIFIER_EXTRACTION: &str = concat!(
    "The request below asks to update a previously generated file or document.\n",
    "Extract only the name or identifier of the file being updated. ",
    "Prefer one of the recently used identifiers when the request refers to it.\n",
    r#"Return JSON: {"file_identifier": string or null}"#,
);

pub const FILE_NAME: &str = concat!(
    "Generate a short, descriptive file name for the artifact requested below.\n",
    "Use lowercase snake_case, at most five words, no file extension, no punctuation.\n",
    "Reply with the file name only.",
);

pub const GENERATOR_TYPE: &str = concat!(
    "You are a classification agent determining the type of generation required.\n",
    "Analyze this query and determine if it needs code or document generation.\n",
    "Code generation is needed for:\n",
    "- Writing functions, classes, or programs\n",
    "- Implementing algorithms or data structures\n",
    "- Creating scripts or applications\n\n",
    "Document generation is needed for:\n",
    "- Creating documentation or reports\n",
    "- Generating formatted text content\n",
    "- Producing structured documents\n\n",
    r#"Return JSON: {"generator_type": "code" or "document"}"#,
);

pub const LANGUAGE: &str = concat!(
    "You are a programming language classifier.\n",
    "Analyze this query and determine the best language for the task.\n",
    "If the user names a language, use that.\n",
    "Consider the following languages:\n",
    "- Python (py): for data, AI, scripting\n",
    "- TypeScript (ts): for web, Node.js\n",
    "- JavaScript (js): for web, basic scripting\n",
    "- C++ (cpp): for systems, performance\n",
    "- Java (java): for enterprise, Android\n\n",
    r#"Return JSON: {"language": "py" or "ts" or "js" or "cpp" or "java"}"#,
);

pub const FORMAT: &str = concat!(
    "You are a document format classification agent.\n",
    "Analyze this query and determine the required document format for the task.\n",
    "If user has specified a particular format, use that. Otherwise, classify based on the task.\n",
    "Text (txt):\n",
    "- Simple, unformatted content\n",
    "- Simple readme files and notes\n",
    "- Configuration files\n\n",
    "Markdown (md):\n",
    "- Documentation with formatting\n",
    "- README files with links\n",
    "- Blogs and articles\n\n",
    "Word Document (doc):\n",
    "- Formatted text with styles\n",
    "- Documents needing revision\n",
    "- Collaborative editing\n\n",
    "PDF (pdf):\n",
    "- Final documentation\n",
    "- Formal reports\n",
    "- Print-ready documents\n\n",
    r#"Return JSON: {"format": "txt" or "md" or "doc" or "pdf"}"#,
);

pub const UPDATE_INSTRUCTIONS: &str = concat!(
    "\nYou are updating an existing artifact.\n",
    "1. Return the entire revised artifact, not only the changed parts\n",
    "2. Preserve the existing structure, naming and style\n",
    "3. Apply only the requested change\n",
    "4. Put the artifact in a single fenced block and keep any explanation outside it\n",
);

pub const CODE_EXPLAINER: &str = concat!(
    "You are a programming assistant providing context for generated code.\n",
    "For the code you're describing:\n",
    "1. Explain the key components and their purpose\n",
    "2. Highlight any important design patterns or techniques used\n",
    "3. Note any assumptions or requirements\n",
    "4. Suggest potential improvements or alternatives\n",
    "5. Include any relevant usage examples\n",
);

pub const DOCUMENT_EXPLAINER: &str = concat!(
    "You are a documentation assistant providing context for generated content.\n",
    "For the document you're describing:\n",
    "1. Summarize the main sections and their purpose\n",
    "2. Explain the document structure and organization\n",
    "3. Highlight key information or takeaways\n",
    "4. Note any formatting or style conventions used\n",
    "5. Suggest how to best use or navigate the document\n",
);

pub const GENERAL_ANSWER: &str = concat!(
    "You are a helpful assistant providing information based on:\n",
    "1. Direct knowledge when available\n",
    "2. Web search results if performed\n",
    "3. Processed documents if analyzed\n",
    "Synthesize the information into a clear, concise response.\n",
);

/// Guidelines for generating code in a language.
pub fn language_guidelines(language: CodeLanguage) -> &'static str {
    match language {
        CodeLanguage::Python => concat!(
            "Generate Python code following these guidelines:\n",
            "1. Follow PEP 8 style guide\n",
            "2. Include detailed docstrings (Google style)\n",
            "3. Add type hints for function parameters and return values\n",
            "4. Include error handling where appropriate\n",
            "5. Add comments for complex logic\n",
        ),
        CodeLanguage::TypeScript => concat!(
            "Generate TypeScript code following these guidelines:\n",
            "1. Use strict type checking\n",
            "2. Follow Airbnb TypeScript style guide\n",
            "3. Include JSDoc comments\n",
            "4. Use async/await for asynchronous code\n",
            "5. Include error handling with try/catch\n",
        ),
        CodeLanguage::JavaScript => concat!(
            "Generate JavaScript code following these guidelines:\n",
            "1. Use modern ES6+ syntax\n",
            "2. Follow Airbnb JavaScript style guide\n",
            "3. Include JSDoc comments\n",
            "4. Use async/await for asynchronous code\n",
            "5. Include error handling\n",
        ),
        CodeLanguage::Cpp => concat!(
            "Generate C++ code following these guidelines:\n",
            "1. Use modern C++17/20 features\n",
            "2. Follow Google C++ style guide\n",
            "3. Include doxygen comments\n",
            "4. Use RAII principles\n",
            "5. Use smart pointers over raw pointers\n",
        ),
        CodeLanguage::Java => concat!(
            "Generate Java code following these guidelines:\n",
            "1. Use latest Java features\n",
            "2. Follow Google Java style guide\n",
            "3. Include Javadoc comments\n",
            "4. Use try-with-resources for AutoCloseable\n",
            "5. Follow SOLID principles\n",
        ),
    }
}

/// Guidelines for generating a document in a format.
pub fn format_guidelines(format: DocumentFormat) -> &'static str {
    match format {
        DocumentFormat::Text => concat!(
            "Generate plain text content following these guidelines:\n",
            "1. Use clear headings and sections\n",
            "2. Include proper paragraph breaks\n",
            "3. Use consistent indentation for lists\n",
            "4. Keep line lengths reasonable\n",
            "5. Use ASCII characters only\n",
        ),
        DocumentFormat::Markdown => concat!(
            "Generate Markdown content following these guidelines:\n",
            "1. Use proper Markdown syntax for headings\n",
            "2. Include links and images with proper syntax\n",
            "3. Use code blocks for code snippets\n",
            "4. Include lists and tables with proper formatting\n",
            "5. Use blockquotes for citations\n",
        ),
        DocumentFormat::Doc => concat!(
            "Generate Word-compatible content following these guidelines:\n",
            "1. Use proper heading levels (H1, H2, etc.)\n",
            "2. Include a table of contents structure\n",
            "3. Use consistent font styles\n",
            "4. Include page break hints where appropriate\n",
            "5. Structure content for easy formatting\n",
        ),
        DocumentFormat::Pdf => concat!(
            "Generate PDF-suitable content following these guidelines:\n",
            "1. Include a clear document structure\n",
            "2. Use formal section numbering\n",
            "3. Include proper citations if needed\n",
            "4. Format tables and figures appropriately\n",
            "5. Include metadata hints (title, author, etc.)\n",
        ),
    }
}
