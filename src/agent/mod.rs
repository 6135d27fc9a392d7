//! Agent module: prompt composition, the model round trip, and directive
//! extraction from replies.

pub mod directive;
pub mod prompts;
pub mod wellness;

pub use directive::{DirectiveOutcome, ToolDirective, extract_directive};
pub use prompts::QuickQuery;
pub use wellness::WellnessAgent;
