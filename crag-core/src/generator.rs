//! Answer composition: turns retrieval output into the text shown to the
//! user.
//!
//! Composition is split from rendering so the narrative answer and the
//! source listing are two views of one structured [`Answer`] instead of two
//! independently formatted strings that can drift apart.

use serde::{Deserialize, Serialize};

use crate::retriever::RetrievedChunk;

const ANSWER_HEADER: &str = "Based on the complaints, here are the key points:";
const ANSWER_NOTE: &str = "Note: This summary is based only on the retrieved complaints.";

/// One enumerated complaint in a composed answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerItem {
    /// 1-based rank in the retrieval order.
    pub ordinal: usize,
    pub product: String,
    pub complaint_id: String,
    pub text: String,
}

/// A structured answer: the question plus its retrieved complaints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub query: String,
    pub items: Vec<AnswerItem>,
}

/// Build a structured answer from retrieval output, preserving order.
pub fn compose(query: &str, chunks: &[RetrievedChunk]) -> Answer {
    Answer {
        query: query.to_string(),
        items: chunks
            .iter()
            .enumerate()
            .map(|(i, retrieved)| AnswerItem {
                ordinal: i + 1,
                product: retrieved.chunk.product.clone(),
                complaint_id: retrieved.chunk.complaint_id.clone(),
                text: retrieved.chunk.text.clone(),
            })
            .collect(),
    }
}

impl Answer {
    /// Render the combined narrative view: question echo, fixed header, one
    /// enumerated line per complaint, fixed trailing note. With zero items
    /// the enumeration section is simply absent.
    pub fn render_text(&self) -> String {
        let mut out = format!("Question: {}\n\n", self.query);
        out.push_str(ANSWER_HEADER);
        out.push('\n');
        for item in &self.items {
            out.push_str(&format!(
                "{}. [{}] {}\n",
                item.ordinal, item.product, item.text
            ));
        }
        out.push('\n');
        out.push_str(ANSWER_NOTE);
        out
    }

    /// Render the source listing: one line per complaint, empty string for
    /// zero items.
    pub fn render_sources(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            out.push_str(&format!(
                "{}. Product: {}, Complaint ID: {}\n",
                item.ordinal, item.product, item.complaint_id
            ));
        }
        out
    }
}
