// Document plumbing around the evaluation engine: where resumes are stored,
// how their text is extracted and how the feature vector is computed.

pub mod embedding;
pub mod extract;
pub mod handlers;
pub mod store;
