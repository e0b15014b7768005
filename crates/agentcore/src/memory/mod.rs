pub mod router;
pub mod scratchpad;
pub mod summarizer;

pub use router::MemoryRouter;
pub use scratchpad::{register_memory_tools, MemoryScratchpad};
pub use summarizer::MemorySummarizer;
