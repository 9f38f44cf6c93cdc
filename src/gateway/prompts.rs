//! Prompt templates for the gateway tasks.

use serde::Deserialize;

pub const SUMMARY_INSTRUCTION: &str = "\
You are an expert document summarizer. Produce a concise, coherent summary of the given text that captures its key points and main ideas.

Guidelines:
1. Keep the original meaning and intent
2. Focus on the most important information
3. Aim for roughly 20-30% of the original length
4. Preserve critical facts, figures and names
5. Keep technical terms where they matter
6. Drop redundant information and examples

Output only the summary text, with no commentary or labels.";

pub const QUESTION_REFUSAL: &str = "The answer is not available in the provided document.";

pub const INSIGHT_INSTRUCTION: &str = r#"You are a document intelligence engine. Analyze the document and return your analysis as a single JSON object with this shape:

{
  "documentType": "resume|cover-letter|article|report|legal|academic|other",
  "documentOverview": { "mainPurpose": "string", "keyThemes": [], "qualityScore": 0-100, "effectivenessScore": 0-100 },
  "contentAnalysis": { "strengths": [], "weaknesses": [], "keyInsights": [], "contentGaps": [] },
  "styleAnalysis": { "clarityScore": 0-100, "concisenessScore": 0-100, "readabilityLevel": "basic|intermediate|advanced", "tone": "formal|informal|persuasive|technical" },
  "sentimentAnalysis": { "positiveSentiment": 0-100, "negativeSentiment": 0-100, "neutralSentiment": 0-100, "emotionalTone": { "confidence": 0-100, "professionalism": 0-100, "enthusiasm": 0-100 } },
  "entities": { "people": [], "organizations": [], "locations": [], "keyTerms": [] },
  "recommendations": { "content": [], "structure": [], "style": [] },
  "visualizationData": {
    "chart1": { "title": "string", "labels": [], "data": [] },
    "chart2": { "title": "string", "labels": [], "data": [] }
  }
}

Tailor the analysis to the document type: skill presentation for resumes, argument flow and evidence for articles, data presentation for reports, clause consistency and risk for legal documents, methodology and citations for academic papers.

All scores are 0-100. Give concrete, actionable recommendations. Return valid JSON only."#;

/// Analysis style for the explain task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptType {
    ExplainSelection,
    LegalTranslation,
    ScientificExplanation,
    Summary,
    Custom,
}

impl PromptType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "EXPLAIN_SELECTION" => Some(PromptType::ExplainSelection),
            "LEGAL_TRANSLATION" => Some(PromptType::LegalTranslation),
            "SCIENTIFIC_EXPLANATION" => Some(PromptType::ScientificExplanation),
            "SUMMARY" => Some(PromptType::Summary),
            "CUSTOM" => Some(PromptType::Custom),
            _ => None,
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            PromptType::ExplainSelection => "\
You explain complex information in clear, accessible language.
- Simplify the concepts
- Use analogies and examples
- Write at an 8th grade reading level
- 100-200 words, clear markdown paragraphs",
            PromptType::LegalTranslation => "\
You translate legal language into plain English.
- Replace legal jargon with everyday words
- Spell out the implications
- Structure: Original -> Translation -> Implications
- 150-250 words",
            PromptType::ScientificExplanation => "\
You make technical and scientific concepts accessible.
- Break down complex terms
- Explain processes step by step
- Include real-world applications
- 150-250 words",
            PromptType::Summary => "\
You extract the key information from a text.
- Main points only, concise but complete
- Bullet points where helpful
- Structure: Overview -> Key Points -> Conclusion
- 50-150 words",
            PromptType::Custom => "\
You answer a specific question about the provided content.
- Address the question directly
- Reference the provided text
- Stay precise and relevant",
        }
    }
}

pub fn answer_prompt(document_text: &str, question: &str) -> String {
    format!(
        "You are an expert document analyzer. Answer the question using ONLY the document text below. \
If the answer is not in the document, reply with \"{}\"\n\n\
DOCUMENT TEXT:\n{}\n\nQUESTION:\n{}\n\nGive a concise, accurate answer based on the document.",
        QUESTION_REFUSAL, document_text, question
    )
}

pub fn questions_prompt(document_text: &str, count: usize) -> String {
    format!(
        "You are an expert question generator. Write {} insightful questions that can be answered from the document text below. \
Cover different aspects of the document and vary the difficulty. \
Return ONLY the questions as a numbered list, one per line.\n\n\
DOCUMENT TEXT:\n{}",
        count, document_text
    )
}

/// A custom prompt leads; otherwise the instruction leads.
pub fn explain_prompt(full_text: &str, prompt_type: PromptType, custom_prompt: Option<&str>) -> String {
    let instruction = prompt_type.instruction();
    match custom_prompt {
        Some(custom) => format!(
            "{}\n\nDocument content:\n\n{}\n\n{}",
            custom, full_text, instruction
        ),
        None => format!(
            "{}\n\nDocument content to analyze:\n\n{}",
            instruction, full_text
        ),
    }
}

pub fn insight_prompt(text: &str) -> String {
    format!("{}\n\nAnalyze this text:\n{}", INSIGHT_INSTRUCTION, text)
}
