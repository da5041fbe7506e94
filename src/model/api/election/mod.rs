mod desc;
mod results;
mod spec;

pub use desc::{CandidateDescription, ElectionDescription};
pub use results::{CandidateResultDescription, ElectionResults, TallySummary};
pub use spec::{CandidateOrder, CandidateSpec, StatusChange};
