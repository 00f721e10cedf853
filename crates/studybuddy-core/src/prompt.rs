//! Prompt rendering for the course-instructor persona.

use std::fmt::Write;

use studybuddy_index::SearchResult;

const INSTRUCTIONS: &str = "You're a friendly course instructor helping students to understand topics in the Azure Fundamentals AZ-900 course. Answer the QUESTION based on the CONTEXT in a user-friendly way.\nUse only the information from the CONTEXT to answer the QUESTION.";

/// One `Topic / Sub-topic / Notes` block per result, in retrieval order.
#[must_use]
pub fn build_context(results: &[SearchResult]) -> String {
    let mut context = String::new();
    for doc in results {
        let _ = write!(
            context,
            "Topic: {}\nSub-topic: {}\nNotes: {}\n\n",
            doc.header, doc.subheader, doc.doc_text
        );
    }
    context
}

/// Render the final prompt. Pure: identical inputs give identical output.
#[must_use]
pub fn augment(question: &str, results: &[SearchResult]) -> String {
    let context = build_context(results);
    format!("{INSTRUCTIONS}\n\nQUESTION: {question}\n\nCONTEXT:\n{context}")
        .trim()
        .to_owned()
}
