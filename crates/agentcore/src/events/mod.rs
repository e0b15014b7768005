pub mod router;

pub use router::EventRouter;
